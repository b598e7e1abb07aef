/// Configuration, types, and shared structures for echosense.
///
/// This crate contains all shared types, traits, and configuration logic
/// used across the echosense workspace.

pub mod config;
pub mod error;
pub mod gesture;
pub mod spectrum;
pub mod traits;

pub use config::SensingConfig;
pub use error::CoreError;
pub use gesture::{GestureLabel, PeakObservation, PeakPair};
pub use spectrum::Spectrum;
pub use traits::GestureObserver;
