use es_core::config::{GestureConfig, GestureStrategyKind};
use es_core::gesture::{GestureLabel, PeakObservation};
use es_core::spectrum::Spectrum;

use crate::peaks::single_peak;
use crate::smoothing::ema;

/// État persistant du classifieur de gestes.
///
/// The only long-lived mutable state of the analysis core. Mutated once per
/// tick by [`step`]; everything else is recomputed from the current spectrum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GestureState {
    /// Dominant peak of the previous tick (peak-shift strategy).
    pub previous_peak: Option<PeakObservation>,
    /// EMA of the dominant peak frequency in Hz.
    pub smoothed_frequency_hz: f32,
    /// Label currently reported.
    pub last_gesture_label: GestureLabel,
    /// When the last gesture was emitted, in session seconds.
    pub last_gesture_timestamp: Option<f64>,
}

/// Test de décalage qualifiant, interchangeable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureStrategy {
    /// Tick-to-tick shift of the dominant spectral peak.
    PeakShift {
        /// Minimum |Δf| of the smoothed frequency, Hz.
        frequency_threshold: f32,
        /// Minimum |Δm| of the peak magnitude, dB.
        magnitude_threshold: f32,
        /// EMA coefficient; 1.0 disables smoothing.
        smoothing_factor: f32,
    },
    /// Energy imbalance on either side of the emitted tone.
    BandAsymmetry {
        /// Minimum |left − right| of the half-window means, dB.
        gesture_threshold: f32,
        /// Bins on each side of the emitted bin.
        half_window_bins: usize,
    },
}

/// Hystérésis et anti-rebond.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureTiming {
    /// Seconds after the last gesture before reverting to `None`.
    pub no_gesture_timeout: f64,
    /// Seconds after a gesture during which new events are ignored.
    pub gesture_buffer_time: f64,
}

/// One tick worth of classifier input.
#[derive(Clone, Copy, Debug)]
pub struct GestureInput<'a> {
    /// Spectrum of the current analysis window.
    pub spectrum: &'a Spectrum,
    /// Frequency of the emitted probe tone, Hz.
    pub emitted_hz: f32,
    /// Session seconds at this tick.
    pub timestamp: f64,
}

impl GestureStrategy {
    /// Build the strategy selected in `config`.
    #[must_use]
    pub fn from_config(config: &GestureConfig) -> Self {
        match config.strategy {
            GestureStrategyKind::PeakShift => Self::PeakShift {
                frequency_threshold: config.frequency_threshold,
                magnitude_threshold: config.magnitude_threshold,
                smoothing_factor: config.smoothing_factor,
            },
            GestureStrategyKind::BandAsymmetry => Self::BandAsymmetry {
                gesture_threshold: config.gesture_threshold,
                half_window_bins: config.half_window_bins,
            },
        }
    }

    /// Config enum for this strategy.
    #[must_use]
    pub fn kind(&self) -> GestureStrategyKind {
        match self {
            Self::PeakShift { .. } => GestureStrategyKind::PeakShift,
            Self::BandAsymmetry { .. } => GestureStrategyKind::BandAsymmetry,
        }
    }

    /// Run the qualifying-shift test for one tick.
    ///
    /// Returns the direction of a qualifying shift, or `None` when this tick
    /// carries no new event (including inconclusive windows).
    pub fn qualify(&self, state: &mut GestureState, input: &GestureInput<'_>) -> Option<GestureLabel> {
        match *self {
            Self::PeakShift {
                frequency_threshold,
                magnitude_threshold,
                smoothing_factor,
            } => {
                let spectrum = input.spectrum;
                let (index, magnitude_db) = single_peak(spectrum.magnitudes())?;
                let observation = PeakObservation {
                    frequency_hz: spectrum.frequency_of(index),
                    magnitude_db,
                    timestamp: input.timestamp,
                };
                peak_shift_event(
                    state,
                    observation,
                    frequency_threshold,
                    magnitude_threshold,
                    smoothing_factor,
                )
            }
            Self::BandAsymmetry {
                gesture_threshold,
                half_window_bins,
            } => {
                let center = input.spectrum.nearest_bin(input.emitted_hz)?;
                band_asymmetry_event(
                    input.spectrum.magnitudes(),
                    center,
                    half_window_bins,
                    gesture_threshold,
                )
            }
        }
    }
}

impl GestureTiming {
    /// Timings from the `[gesture]` config section.
    #[must_use]
    pub fn from_config(config: &GestureConfig) -> Self {
        Self {
            no_gesture_timeout: config.no_gesture_timeout,
            gesture_buffer_time: config.gesture_buffer_time,
        }
    }
}

/// Décalage Doppler du pic dominant entre deux ticks.
///
/// The first observation only seeds `state`. Afterwards the frequency is
/// smoothed (`smoothed = smoothed·(1−α) + f·α`), `Δf` is the change of the
/// smoothed frequency and `Δm` the absolute change of the peak magnitude.
/// Both must exceed their thresholds; the sign of `Δf` gives the direction.
///
/// # Example
/// ```
/// use es_audio::gesture::{peak_shift_event, GestureState};
/// use es_core::gesture::{GestureLabel, PeakObservation};
///
/// let mut state = GestureState::default();
/// let at = |f, m, t| PeakObservation { frequency_hz: f, magnitude_db: m, timestamp: t };
/// assert_eq!(peak_shift_event(&mut state, at(18_000.0, -10.0, 0.0), 5.0, 2.0, 1.0), None);
/// let event = peak_shift_event(&mut state, at(18_020.0, -7.0, 0.05), 5.0, 2.0, 1.0);
/// assert_eq!(event, Some(GestureLabel::Toward));
/// ```
pub fn peak_shift_event(
    state: &mut GestureState,
    observation: PeakObservation,
    frequency_threshold: f32,
    magnitude_threshold: f32,
    smoothing_factor: f32,
) -> Option<GestureLabel> {
    let Some(previous) = state.previous_peak else {
        state.smoothed_frequency_hz = observation.frequency_hz;
        state.previous_peak = Some(observation);
        return None;
    };

    let smoothed = ema(
        state.smoothed_frequency_hz,
        observation.frequency_hz,
        smoothing_factor,
    );
    let delta_f = smoothed - state.smoothed_frequency_hz;
    let delta_m = (observation.magnitude_db - previous.magnitude_db).abs();

    state.smoothed_frequency_hz = smoothed;
    state.previous_peak = Some(observation);

    if delta_f.abs() > frequency_threshold && delta_m > magnitude_threshold {
        if delta_f > 0.0 {
            return Some(GestureLabel::Toward);
        }
        if delta_f < 0.0 {
            return Some(GestureLabel::Away);
        }
    }
    None
}

/// Asymétrie d'énergie autour du bin émis.
///
/// Compares the mean dB level of the `half_window` bins left of `center`
/// with the `half_window` bins right of it (centre excluded, window clipped
/// at the spectrum edges). An echo shifted up raises the right side
/// (`Toward`), shifted down the left side (`Away`). Either half empty is
/// inconclusive.
///
/// # Example
/// ```
/// use es_audio::gesture::band_asymmetry_event;
/// use es_core::gesture::GestureLabel;
///
/// let mut spectrum = vec![-80.0f32; 64];
/// spectrum[32] = 0.0;
/// spectrum[34] = -10.0;
/// assert_eq!(band_asymmetry_event(&spectrum, 32, 4, 3.0), Some(GestureLabel::Toward));
/// assert_eq!(band_asymmetry_event(&spectrum, 0, 4, 3.0), None);
/// ```
#[must_use]
pub fn band_asymmetry_event(
    magnitudes: &[f32],
    center: usize,
    half_window: usize,
    threshold: f32,
) -> Option<GestureLabel> {
    let len = magnitudes.len();
    if center >= len {
        return None;
    }
    let left = &magnitudes[center.saturating_sub(half_window)..center];
    let right = &magnitudes[center + 1..(center + 1 + half_window).min(len)];

    let left_avg = mean(left)?;
    let right_avg = mean(right)?;

    if (left_avg - right_avg).abs() <= threshold {
        return None;
    }
    if left_avg < right_avg {
        Some(GestureLabel::Toward)
    } else {
        Some(GestureLabel::Away)
    }
}

/// Moyenne, `None` pour une fenêtre vide.
fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

/// Hystérésis : applique un éventuel événement et l'expiration du geste.
///
/// A qualifying event becomes the reported label unless it arrives within
/// `gesture_buffer_time` of the last emitted gesture. Without a new event
/// the label holds until more than `no_gesture_timeout` seconds have passed
/// since the last gesture, then reverts to `None`.
pub fn apply_hysteresis(
    state: &mut GestureState,
    timing: &GestureTiming,
    event: Option<GestureLabel>,
    now: f64,
) -> GestureLabel {
    let since_last = state.last_gesture_timestamp.map(|t| now - t);

    if let Some(label) = event.filter(|l| l.is_gesture()) {
        let debounced = since_last.is_some_and(|dt| dt < timing.gesture_buffer_time);
        if debounced {
            log::trace!("Geste {label} ignoré (anti-rebond)");
        } else {
            if label != state.last_gesture_label {
                log::debug!("{} → {label} @ {now:.3}s", state.last_gesture_label);
            }
            state.last_gesture_label = label;
            state.last_gesture_timestamp = Some(now);
            return label;
        }
    }

    if state.last_gesture_label.is_gesture()
        && since_last.is_some_and(|dt| dt > timing.no_gesture_timeout)
    {
        log::debug!("{} → {} @ {now:.3}s", state.last_gesture_label, GestureLabel::None);
        state.last_gesture_label = GestureLabel::None;
    }
    state.last_gesture_label
}

/// Tick pur : test qualifiant puis hystérésis.
///
/// All persistent state lives in `state`, so a classifier can be driven
/// deterministically from synthetic spectra without an audio device.
pub fn step(
    state: &mut GestureState,
    strategy: &GestureStrategy,
    timing: &GestureTiming,
    input: &GestureInput<'_>,
) -> GestureLabel {
    let event = strategy.qualify(state, input);
    apply_hysteresis(state, timing, event, input.timestamp)
}

/// Classifieur de gestes : stratégie + temporisation + état.
///
/// # Example
/// ```
/// use es_audio::gesture::GestureClassifier;
/// use es_core::config::GestureConfig;
/// use es_core::gesture::GestureLabel;
/// use es_core::spectrum::Spectrum;
///
/// let mut classifier = GestureClassifier::from_config(&GestureConfig::default());
/// let silence = Spectrum::silent(4096, 48_000);
/// assert_eq!(classifier.update(&silence, 18_000.0, 0.0), GestureLabel::None);
/// ```
#[derive(Clone, Debug)]
pub struct GestureClassifier {
    strategy: GestureStrategy,
    timing: GestureTiming,
    state: GestureState,
}

impl GestureClassifier {
    /// Create a classifier with fresh state.
    #[must_use]
    pub fn new(strategy: GestureStrategy, timing: GestureTiming) -> Self {
        Self {
            strategy,
            timing,
            state: GestureState::default(),
        }
    }

    /// Build from the `[gesture]` config section.
    #[must_use]
    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(
            GestureStrategy::from_config(config),
            GestureTiming::from_config(config),
        )
    }

    /// Classify one tick.
    pub fn update(&mut self, spectrum: &Spectrum, emitted_hz: f32, timestamp: f64) -> GestureLabel {
        let input = GestureInput {
            spectrum,
            emitted_hz,
            timestamp,
        };
        step(&mut self.state, &self.strategy, &self.timing, &input)
    }

    /// Apply new thresholds. Switching strategy resets the state.
    pub fn reconfigure(&mut self, config: &GestureConfig) {
        let strategy = GestureStrategy::from_config(config);
        if strategy.kind() != self.strategy.kind() {
            self.state = GestureState::default();
        }
        self.strategy = strategy;
        self.timing = GestureTiming::from_config(config);
    }

    /// Active strategy.
    #[must_use]
    pub fn strategy(&self) -> &GestureStrategy {
        &self.strategy
    }

    /// Current state, for inspection.
    #[must_use]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Label reported by the last tick.
    #[must_use]
    pub fn label(&self) -> GestureLabel {
        self.state.last_gesture_label
    }
}
