use std::fmt;

/// Geste reporté par le classifieur.
///
/// # Example
/// ```
/// use es_core::gesture::GestureLabel;
/// assert_eq!(GestureLabel::Toward.to_string(), "Gesture Toward Detected");
/// assert_eq!(GestureLabel::default(), GestureLabel::None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    /// Reflector moving toward the microphone (echo shifted up).
    Toward,
    /// Reflector moving away (echo shifted down).
    Away,
    /// No qualifying shift within the timeout.
    #[default]
    None,
}

impl GestureLabel {
    /// Human-readable label handed to the UI collaborator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Toward => "Gesture Toward Detected",
            Self::Away => "Gesture Away Detected",
            Self::None => "No Gesture",
        }
    }

    /// `true` for `Toward` and `Away`.
    #[must_use]
    pub fn is_gesture(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pic dominant observé à un tick d'analyse.
///
/// `timestamp` is seconds since the session started.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PeakObservation {
    /// Peak frequency in Hz.
    pub frequency_hz: f32,
    /// Peak magnitude in dB.
    pub magnitude_db: f32,
    /// Seconds since session start.
    pub timestamp: f64,
}

/// Deux fréquences dominantes, séparées d'au moins `min_separation_hz`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PeakPair {
    /// Loudest frequency in Hz.
    pub first_hz: f32,
    /// Second loudest, separated frequency in Hz.
    pub second_hz: f32,
}
