use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Configuration complète d'une session de détection, hot-rechargeable.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use es_core::config::SensingConfig;
/// let config = SensingConfig::default();
/// assert_eq!(config.analysis.buffer_size, 4096);
/// assert_eq!(config.analysis.fps, 30);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SensingConfig {
    /// Spectral analysis settings.
    pub analysis: AnalysisConfig,
    /// Gesture classifier thresholds.
    pub gesture: GestureConfig,
    /// Passive two-peak tracking.
    pub peaks: PeakConfig,
    /// Emitted probe tone.
    pub tone: ToneConfig,
}

/// Analysis window and tick settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AnalysisConfig {
    /// Samples per analysis window. Power of two.
    pub buffer_size: usize,
    /// Analysis ticks per second.
    pub fps: u32,
    /// Window applied before the FFT.
    pub window: WindowKind,
    /// Number of max-pooled equalizer bands.
    pub band_count: usize,
    /// Half-width in bins of the zoomed view around the emitted tone.
    pub zoom_bins: usize,
}

/// Thresholds and timings of the gesture state machine.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GestureConfig {
    /// Which qualifying-shift test runs each tick.
    pub strategy: GestureStrategyKind,
    /// Minimum smoothed peak shift in Hz (peak-shift strategy).
    pub frequency_threshold: f32,
    /// Minimum peak magnitude change in dB (peak-shift strategy).
    pub magnitude_threshold: f32,
    /// Minimum left/right mean difference in dB (band-asymmetry strategy).
    pub gesture_threshold: f32,
    /// Seconds without a new gesture before reverting to `None`.
    pub no_gesture_timeout: f64,
    /// Seconds during which a new gesture cannot re-trigger.
    pub gesture_buffer_time: f64,
    /// EMA coefficient for the peak frequency. 1.0 = no smoothing.
    pub smoothing_factor: f32,
    /// Bins on each side of the emitted tone (band-asymmetry strategy).
    pub half_window_bins: usize,
}

/// Passive two-peak tracking settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PeakConfig {
    /// Bins at or below this dB level are ignored.
    pub magnitude_threshold: f32,
    /// Second peak must sit further than this from the first.
    pub min_separation_hz: f32,
    /// Ticks a pair must repeat before it is reported.
    pub stability_ticks: usize,
    /// What to report when no separated second peak exists.
    pub second_peak_fallback: SecondPeakFallback,
}

/// Probe tone settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToneConfig {
    /// Emit the probe tone (active sensing).
    pub enabled: bool,
    /// Initial frequency in Hz.
    pub frequency: f32,
    /// Lowest selectable frequency in Hz.
    pub min_frequency: f32,
    /// Highest selectable frequency in Hz.
    pub max_frequency: f32,
    /// Peak amplitude [0.0, 1.0].
    pub amplitude: f32,
}

/// Analysis window function.
///
/// # Example
/// ```
/// use es_core::config::WindowKind;
/// assert!(matches!(WindowKind::default(), WindowKind::Blackman));
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum WindowKind {
    /// No tapering.
    Rectangular,
    /// Hann (raised cosine).
    Hann,
    /// Blackman, periodic form. Leakage confined to ±2 bins for aligned tones.
    #[default]
    Blackman,
}

/// Qualifying-shift test used by the gesture classifier.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum GestureStrategyKind {
    /// Energy imbalance around the emitted tone (active sensing).
    #[default]
    BandAsymmetry,
    /// Tick-to-tick shift of the dominant peak.
    PeakShift,
}

/// Second frequency reported when the two loudest bins are too close.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum SecondPeakFallback {
    /// Keep the last accepted second frequency.
    #[default]
    HoldPrevious,
    /// Report the first frequency twice.
    RepeatFirst,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            fps: 30,
            window: WindowKind::Blackman,
            band_count: 20,
            zoom_bins: 10,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            strategy: GestureStrategyKind::BandAsymmetry,
            frequency_threshold: 5.0,
            magnitude_threshold: 2.0,
            gesture_threshold: 3.0,
            no_gesture_timeout: 1.0,
            gesture_buffer_time: 0.5,
            smoothing_factor: 0.1,
            half_window_bins: 10,
        }
    }
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            magnitude_threshold: -40.0,
            min_separation_hz: 50.0,
            stability_ticks: 4,
            second_peak_fallback: SecondPeakFallback::HoldPrevious,
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 18_000.0,
            min_frequency: 17_000.0,
            max_frequency: 20_000.0,
            amplitude: 0.5,
        }
    }
}

impl SensingConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        let a = &mut self.analysis;
        a.fps = a.fps.clamp(5, 120);
        a.band_count = a.band_count.clamp(1, (a.buffer_size / 2).max(1));
        a.zoom_bins = a.zoom_bins.clamp(1, 512);

        let g = &mut self.gesture;
        g.frequency_threshold = g.frequency_threshold.max(0.0);
        g.magnitude_threshold = g.magnitude_threshold.max(0.0);
        g.gesture_threshold = g.gesture_threshold.max(0.0);
        g.no_gesture_timeout = g.no_gesture_timeout.clamp(0.0, 60.0);
        g.gesture_buffer_time = g.gesture_buffer_time.clamp(0.0, 60.0);
        g.smoothing_factor = g.smoothing_factor.clamp(0.01, 1.0);
        g.half_window_bins = g.half_window_bins.clamp(1, 512);

        let p = &mut self.peaks;
        p.min_separation_hz = p.min_separation_hz.max(0.0);
        p.stability_ticks = p.stability_ticks.clamp(1, 64);

        let t = &mut self.tone;
        t.amplitude = t.amplitude.clamp(0.0, 1.0);
        t.min_frequency = t.min_frequency.max(1.0);
        t.frequency = t.frequency.clamp(t.min_frequency, t.max_frequency.max(t.min_frequency));
    }

    /// Reject values that cannot be clamped into something meaningful.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidBufferSize`] when `buffer_size` is not a power
    /// of two of at least 64, [`CoreError::InvalidToneRange`] for an empty
    /// tone range and [`CoreError::Config`] for a non-finite threshold.
    ///
    /// # Example
    /// ```
    /// use es_core::config::SensingConfig;
    /// let mut config = SensingConfig::default();
    /// assert!(config.validate().is_ok());
    /// config.analysis.buffer_size = 3000;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), CoreError> {
        let size = self.analysis.buffer_size;
        if size < 64 || !size.is_power_of_two() {
            return Err(CoreError::InvalidBufferSize { size });
        }
        let g = &self.gesture;
        for (name, value) in [
            ("frequency_threshold", g.frequency_threshold),
            ("magnitude_threshold", g.magnitude_threshold),
            ("gesture_threshold", g.gesture_threshold),
            ("smoothing_factor", g.smoothing_factor),
            ("peaks.magnitude_threshold", self.peaks.magnitude_threshold),
            ("tone.frequency", self.tone.frequency),
        ] {
            if !value.is_finite() {
                return Err(CoreError::Config(format!("{name} doit être fini")));
            }
        }
        let t = &self.tone;
        if t.min_frequency >= t.max_frequency {
            return Err(CoreError::InvalidToneRange {
                min: t.min_frequency,
                max: t.max_frequency,
            });
        }
        Ok(())
    }

    /// Frequency resolution of one spectrum bin at `sample_rate`.
    ///
    /// # Example
    /// ```
    /// use es_core::config::SensingConfig;
    /// let config = SensingConfig::default();
    /// assert!((config.bin_width(48_000) - 11.718_75).abs() < 1e-6);
    /// ```
    #[must_use]
    pub fn bin_width(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.analysis.buffer_size as f32
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    analysis: Option<AnalysisSection>,
    gesture: Option<GestureSection>,
    peaks: Option<PeakSection>,
    tone: Option<ToneSection>,
}

#[derive(Deserialize)]
struct AnalysisSection {
    buffer_size: Option<usize>,
    fps: Option<u32>,
    window: Option<WindowKind>,
    band_count: Option<usize>,
    zoom_bins: Option<usize>,
}

#[derive(Deserialize)]
struct GestureSection {
    strategy: Option<GestureStrategyKind>,
    frequency_threshold: Option<f32>,
    magnitude_threshold: Option<f32>,
    gesture_threshold: Option<f32>,
    no_gesture_timeout: Option<f64>,
    gesture_buffer_time: Option<f64>,
    smoothing_factor: Option<f32>,
    half_window_bins: Option<usize>,
}

#[derive(Deserialize)]
struct PeakSection {
    magnitude_threshold: Option<f32>,
    min_separation_hz: Option<f32>,
    stability_ticks: Option<usize>,
    second_peak_fallback: Option<SecondPeakFallback>,
}

#[derive(Deserialize)]
struct ToneSection {
    enabled: Option<bool>,
    frequency: Option<f32>,
    min_frequency: Option<f32>,
    max_frequency: Option<f32>,
    amplitude: Option<f32>,
}

/// Assigne `$target` si la valeur optionnelle est présente.
macro_rules! merge {
    ($section:ident, $target:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $section.$field {
                $target.$field = v;
            }
        )+
    };
}

/// Parse une config TOML et fusionne avec les valeurs par défaut.
///
/// Missing sections and fields keep their defaults.
///
/// # Errors
/// Returns an error if the TOML is malformed or the merged config is invalid.
///
/// # Example
/// ```
/// use es_core::config::{parse_config, GestureStrategyKind};
/// let config = parse_config("[gesture]\nstrategy = \"PeakShift\"\n").unwrap();
/// assert_eq!(config.gesture.strategy, GestureStrategyKind::PeakShift);
/// assert_eq!(config.analysis.buffer_size, 4096);
/// ```
pub fn parse_config(content: &str) -> Result<SensingConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = SensingConfig::default();

    if let Some(s) = file.analysis {
        merge!(s, config.analysis, buffer_size, fps, window, band_count, zoom_bins);
    }
    if let Some(s) = file.gesture {
        merge!(
            s,
            config.gesture,
            strategy,
            frequency_threshold,
            magnitude_threshold,
            gesture_threshold,
            no_gesture_timeout,
            gesture_buffer_time,
            smoothing_factor,
            half_window_bins,
        );
    }
    if let Some(s) = file.peaks {
        merge!(
            s,
            config.peaks,
            magnitude_threshold,
            min_separation_hz,
            stability_ticks,
            second_peak_fallback,
        );
    }
    if let Some(s) = file.tone {
        merge!(
            s,
            config.tone,
            enabled,
            frequency,
            min_frequency,
            max_frequency,
            amplitude,
        );
    }

    config.validate()?;
    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use es_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<SensingConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide dans {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        let config = parse_config("")?;
        assert_eq!(config, SensingConfig::default());
        Ok(())
    }

    #[test]
    fn partial_sections_override_defaults() -> Result<()> {
        let toml = r#"
            [analysis]
            buffer_size = 8192
            window = "Hann"

            [peaks]
            min_separation_hz = 10.0
            second_peak_fallback = "RepeatFirst"
        "#;
        let config = parse_config(toml)?;
        assert_eq!(config.analysis.buffer_size, 8192);
        assert_eq!(config.analysis.window, WindowKind::Hann);
        assert_eq!(config.analysis.fps, 30);
        assert!((config.peaks.min_separation_hz - 10.0).abs() < f32::EPSILON);
        assert_eq!(
            config.peaks.second_peak_fallback,
            SecondPeakFallback::RepeatFirst
        );
        assert_eq!(config.gesture, GestureConfig::default());
        Ok(())
    }

    #[test]
    fn non_power_of_two_buffer_is_rejected() {
        assert!(parse_config("[analysis]\nbuffer_size = 1000\n").is_err());
    }

    #[test]
    fn non_finite_threshold_is_rejected() {
        let mut config = SensingConfig::default();
        config.gesture.gesture_threshold = f32::NAN;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn inverted_tone_range_is_rejected() {
        let toml = "[tone]\nmin_frequency = 20000.0\nmax_frequency = 17000.0\n";
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn out_of_range_values_are_clamped() -> Result<()> {
        let toml = r"
            [analysis]
            fps = 1000
            [gesture]
            smoothing_factor = 4.0
            no_gesture_timeout = -2.0
            [tone]
            frequency = 25000.0
            amplitude = 3.0
        ";
        let config = parse_config(toml)?;
        assert_eq!(config.analysis.fps, 120);
        assert!((config.gesture.smoothing_factor - 1.0).abs() < f32::EPSILON);
        assert!(config.gesture.no_gesture_timeout.abs() < f64::EPSILON);
        assert!((config.tone.frequency - 20_000.0).abs() < f32::EPSILON);
        assert!((config.tone.amplitude - 1.0).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn load_config_reads_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[gesture]\ngesture_threshold = 6.5")?;
        let config = load_config(file.path())?;
        assert!((config.gesture.gesture_threshold - 6.5).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/echosense.toml")).is_err());
    }
}
