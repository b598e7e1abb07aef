use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use es_core::config::ToneConfig;

/// Commandes partagées du générateur, lisibles depuis le callback audio.
///
/// Frequency and amplitude are stored as `f32` bits in atomics so the UI or
/// analysis thread can change them while the output callback is running.
/// The oscillator picks changes up at the start of its next `fill`; at most
/// one buffer uses the stale value.
///
/// # Example
/// ```
/// use es_audio::oscillator::ToneControl;
/// use es_core::config::ToneConfig;
/// let control = ToneControl::new(&ToneConfig::default());
/// assert_eq!(control.set_frequency(25_000.0), 20_000.0);
/// assert_eq!(control.frequency(), 20_000.0);
/// ```
#[derive(Debug)]
pub struct ToneControl {
    frequency: AtomicU32,
    amplitude: AtomicU32,
    muted: AtomicBool,
    min_frequency: f32,
    max_frequency: f32,
}

impl ToneControl {
    /// Controls initialised from the `[tone]` section. A disabled tone starts muted.
    #[must_use]
    pub fn new(config: &ToneConfig) -> Self {
        let control = Self {
            frequency: AtomicU32::new(config.min_frequency.to_bits()),
            amplitude: AtomicU32::new(config.amplitude.clamp(0.0, 1.0).to_bits()),
            muted: AtomicBool::new(!config.enabled),
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency.max(config.min_frequency),
        };
        control.set_frequency(config.frequency);
        control
    }

    /// Set the emitted frequency, clamped to the configured probe range.
    ///
    /// Returns the frequency actually applied. A non-finite request is
    /// ignored and the current frequency returned. Safe to call from any
    /// thread while the oscillator is filling buffers.
    pub fn set_frequency(&self, frequency: f32) -> f32 {
        if !frequency.is_finite() {
            log::warn!("Fréquence de sonde invalide ignorée : {frequency}");
            return self.frequency();
        }
        let f = frequency.clamp(self.min_frequency, self.max_frequency);
        self.frequency.store(f.to_bits(), Ordering::Relaxed);
        f
    }

    /// Emitted frequency in Hz.
    #[inline]
    #[must_use]
    pub fn frequency(&self) -> f32 {
        f32::from_bits(self.frequency.load(Ordering::Relaxed))
    }

    /// Set peak amplitude, clamped to `[0.0, 1.0]`.
    pub fn set_amplitude(&self, amplitude: f32) {
        self.amplitude
            .store(amplitude.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// Peak amplitude.
    #[inline]
    #[must_use]
    pub fn amplitude(&self) -> f32 {
        f32::from_bits(self.amplitude.load(Ordering::Relaxed))
    }

    /// Silence the output without stopping the stream.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// `true` while the output is silenced.
    #[inline]
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Selectable frequency range in Hz.
    #[must_use]
    pub fn range(&self) -> (f32, f32) {
        (self.min_frequency, self.max_frequency)
    }

    /// `true` when `config` carries the range this control was built with.
    /// The range is fixed for the control's lifetime.
    #[must_use]
    pub fn range_matches(&self, config: &ToneConfig) -> bool {
        let expected = config.max_frequency.max(config.min_frequency);
        (self.min_frequency - config.min_frequency).abs() < f32::EPSILON
            && (self.max_frequency - expected).abs() < f32::EPSILON
    }
}

/// Accumulateur de phase.
///
/// `phase` stays in `[0, 2π)`; `phase_increment = 2π·f / sample_rate`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OscillatorState {
    /// Current phase in radians.
    pub phase: f64,
    /// Phase advance per frame in radians.
    pub phase_increment: f64,
}

impl OscillatorState {
    /// Recompute the increment for `frequency` at `sample_rate`.
    ///
    /// Frequencies at or above Nyquist are pulled just below it. A
    /// non-finite frequency leaves the increment unchanged.
    pub fn retune(&mut self, frequency: f32, sample_rate: u32) {
        if !frequency.is_finite() {
            return;
        }
        if sample_rate == 0 {
            self.phase_increment = 0.0;
            return;
        }
        let nyquist = f64::from(sample_rate) / 2.0;
        let f = f64::from(frequency).clamp(0.0, nyquist * 0.999);
        self.phase_increment = TAU * f / f64::from(sample_rate);
    }
}

/// Remplit `buffer` (entrelacé, `channel_count` canaux) avec `amplitude·sin(phase)`.
///
/// Every channel of a frame receives the same sample. The phase carries over
/// between calls, so consecutive buffers form one continuous sine. A trailing
/// partial frame is written as well.
///
/// Real-time safe: no allocation, no lock.
pub fn fill_sine(state: &mut OscillatorState, buffer: &mut [f32], channel_count: usize, amplitude: f32) {
    let channels = channel_count.max(1);
    for frame in buffer.chunks_mut(channels) {
        let sample = amplitude * state.phase.sin() as f32;
        frame.fill(sample);
        state.phase += state.phase_increment;
        if state.phase >= TAU {
            state.phase -= TAU;
        }
    }
}

/// Générateur de sonde pour la détection active.
///
/// Owned by the output callback. Reads its [`ToneControl`] once per buffer.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use es_audio::oscillator::{ToneControl, ToneOscillator};
/// use es_core::config::ToneConfig;
///
/// let control = Arc::new(ToneControl::new(&ToneConfig::default()));
/// let mut osc = ToneOscillator::new(Arc::clone(&control), 48_000);
/// let mut out = [0.0f32; 512];
/// osc.fill(&mut out, 2);
/// assert_eq!(out[0], out[1]);
/// ```
pub struct ToneOscillator {
    control: std::sync::Arc<ToneControl>,
    sample_rate: u32,
    state: OscillatorState,
    tuned_to: f32,
}

impl ToneOscillator {
    /// Create an oscillator rendering at `sample_rate`.
    #[must_use]
    pub fn new(control: std::sync::Arc<ToneControl>, sample_rate: u32) -> Self {
        let tuned_to = control.frequency();
        let mut state = OscillatorState::default();
        state.retune(tuned_to, sample_rate);
        Self {
            control,
            sample_rate,
            state,
            tuned_to,
        }
    }

    /// Fill one output buffer.
    ///
    /// Muted output writes silence but keeps the phase running.
    pub fn fill(&mut self, buffer: &mut [f32], channel_count: usize) {
        let frequency = self.control.frequency();
        if frequency.to_bits() != self.tuned_to.to_bits() {
            self.state.retune(frequency, self.sample_rate);
            self.tuned_to = frequency;
        }

        let amplitude = if self.control.is_muted() {
            0.0
        } else {
            self.control.amplitude()
        };
        fill_sine(&mut self.state, buffer, channel_count, amplitude);
    }

    /// Current phase accumulator.
    #[must_use]
    pub fn state(&self) -> OscillatorState {
        self.state
    }

    /// Output sample rate.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn config(frequency: f32, amplitude: f32) -> ToneConfig {
        ToneConfig {
            enabled: true,
            frequency,
            min_frequency: 20.0,
            max_frequency: 20_000.0,
            amplitude,
        }
    }

    #[test]
    fn consecutive_fills_are_one_continuous_sine() {
        let sample_rate = 44_100;
        let frequency = 1_234.0f32;
        let control = Arc::new(ToneControl::new(&config(frequency, 1.0)));
        let mut osc = ToneOscillator::new(control, sample_rate);

        let mut stream = Vec::new();
        for len in [100usize, 37, 256, 1, 606] {
            let mut block = vec![0.0f32; len];
            osc.fill(&mut block, 1);
            stream.extend_from_slice(&block);
        }

        for (n, &sample) in stream.iter().enumerate() {
            let expected =
                (TAU * f64::from(frequency) * n as f64 / f64::from(sample_rate)).sin() as f32;
            assert!((sample - expected).abs() < 1e-4, "discontinuity at sample {n}");
        }
    }

    #[test]
    fn stereo_frames_duplicate_the_sample() {
        let control = Arc::new(ToneControl::new(&config(440.0, 0.5)));
        let mut osc = ToneOscillator::new(control, 48_000);
        let mut out = vec![0.0f32; 64];
        osc.fill(&mut out, 2);
        for frame in out.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
            assert!(frame[0].abs() <= 0.5);
        }
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn phase_stays_wrapped() {
        let mut state = OscillatorState::default();
        state.retune(19_000.0, 44_100);
        let mut out = vec![0.0f32; 10_000];
        fill_sine(&mut state, &mut out, 1, 1.0);
        assert!(state.phase >= 0.0 && state.phase < TAU);
    }

    #[test]
    fn frequency_change_is_picked_up_next_buffer() {
        let control = Arc::new(ToneControl::new(&config(1_000.0, 1.0)));
        let mut osc = ToneOscillator::new(Arc::clone(&control), 48_000);
        let mut out = [0.0f32; 16];
        osc.fill(&mut out, 1);
        let before = osc.state().phase_increment;
        control.set_frequency(2_000.0);
        osc.fill(&mut out, 1);
        let after = osc.state().phase_increment;
        assert!((after - 2.0 * before).abs() < 1e-9);
    }

    #[test]
    fn muted_output_is_silent() {
        let control = Arc::new(ToneControl::new(&ToneConfig {
            enabled: false,
            ..ToneConfig::default()
        }));
        let mut osc = ToneOscillator::new(Arc::clone(&control), 48_000);
        let mut out = [1.0f32; 32];
        osc.fill(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
        control.set_muted(false);
        osc.fill(&mut out, 2);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn increment_clamped_below_nyquist() {
        let mut state = OscillatorState::default();
        state.retune(30_000.0, 44_100);
        assert!(state.phase_increment < std::f64::consts::PI);
        state.retune(1_000.0, 0);
        assert!(state.phase_increment.abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_frequency_is_ignored() {
        let control = Arc::new(ToneControl::new(&config(1_000.0, 1.0)));
        let mut osc = ToneOscillator::new(Arc::clone(&control), 48_000);
        assert!((control.set_frequency(f32::NAN) - 1_000.0).abs() < f32::EPSILON);
        assert!((control.set_frequency(f32::INFINITY) - 1_000.0).abs() < f32::EPSILON);
        let mut out = [0.0f32; 8];
        osc.fill(&mut out, 2);
        assert!(out.iter().all(|s| s.is_finite()));

        let mut state = OscillatorState::default();
        state.retune(1_000.0, 48_000);
        let before = state.phase_increment;
        state.retune(f32::NAN, 48_000);
        assert!((state.phase_increment - before).abs() < f64::EPSILON);
    }

    #[test]
    fn nan_initial_frequency_starts_at_range_bottom() {
        let control = ToneControl::new(&ToneConfig {
            frequency: f32::NAN,
            ..ToneConfig::default()
        });
        assert!((control.frequency() - 17_000.0).abs() < f32::EPSILON);
    }

    #[test]
    fn range_change_is_detected() {
        let base = config(1_000.0, 1.0);
        let control = ToneControl::new(&base);
        assert!(control.range_matches(&base));
        let narrowed = ToneConfig {
            min_frequency: 17_000.0,
            ..base
        };
        assert!(!control.range_matches(&narrowed));
        assert_eq!(control.range(), (20.0, 20_000.0));
    }

    #[test]
    fn control_clamps_to_probe_range() {
        let control = ToneControl::new(&ToneConfig::default());
        assert!((control.set_frequency(10.0) - 17_000.0).abs() < f32::EPSILON);
        assert_eq!(control.range(), (17_000.0, 20_000.0));
        control.set_amplitude(3.0);
        assert!((control.amplitude() - 1.0).abs() < f32::EPSILON);
    }
}
