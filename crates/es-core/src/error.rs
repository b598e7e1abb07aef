use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Analysis window is not a power of two.
    #[error("Taille de buffer invalide : {size} (puissance de deux requise)")]
    InvalidBufferSize {
        /// The rejected buffer size.
        size: usize,
    },

    /// Tone range is empty (`min_frequency >= max_frequency`).
    #[error("Plage de fréquence invalide : {min} Hz – {max} Hz")]
    InvalidToneRange {
        /// Lower bound in Hz.
        min: f32,
        /// Upper bound in Hz.
        max: f32,
    },
}
