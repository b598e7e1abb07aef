// Audio capture, spectral analysis and gesture classification for echosense.

pub mod bands;
pub mod capture;
pub mod error;
pub mod fft;
pub mod gesture;
pub mod oscillator;
pub mod peaks;
pub mod pipeline;
pub mod playback;
pub mod ring;
pub mod smoothing;
pub mod state;
