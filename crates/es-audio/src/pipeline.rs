use es_core::config::{AnalysisConfig, GestureConfig, GestureStrategyKind, PeakConfig, SensingConfig};
use es_core::gesture::{GestureLabel, PeakObservation, PeakPair};
use es_core::spectrum::Spectrum;

use crate::bands;
use crate::fft::SpectralAnalyzer;
use crate::gesture::GestureClassifier;
use crate::peaks::{PeakTracker, single_peak, two_loudest_peaks};
use crate::ring::RingBuffer;

/// Résultat d'un tick d'analyse, publié vers l'affichage.
///
/// Owned copy of everything the visual layer draws: raw block, spectrum,
/// equalizer bands, peaks and the current label.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisSnapshot {
    /// Session time of the tick, seconds.
    pub timestamp: f64,
    /// Time-domain samples that were analysed (first channel).
    pub time_block: Vec<f32>,
    /// Full dB spectrum.
    pub spectrum: Spectrum,
    /// Max-pooled equalizer bands.
    pub bands: Vec<f32>,
    /// Loudest bin of this tick.
    pub dominant: Option<PeakObservation>,
    /// Last stable two-peak pair (passive sensing).
    pub peaks: Option<PeakPair>,
    /// dB window around the emitted tone.
    pub zoomed: Vec<f32>,
    /// Probe frequency in effect for this tick, Hz.
    pub emitted_hz: f32,
    /// Gesture label after hysteresis.
    pub label: GestureLabel,
}

/// Chaîne d'analyse complète pour un tick : fenêtre → FFT → bandes → pics → geste.
///
/// Single-threaded; owned by the analysis thread. Holds the only mutable
/// state of the core (classifier state and peak tracker) plus scratch
/// buffers sized once at construction.
///
/// # Example
/// ```
/// use es_audio::pipeline::AnalysisPipeline;
/// use es_audio::ring::RingBuffer;
/// use es_core::config::SensingConfig;
/// use es_core::gesture::GestureLabel;
///
/// let config = SensingConfig::default();
/// let ring = RingBuffer::new(1, config.analysis.buffer_size);
/// let mut pipeline = AnalysisPipeline::new(&config, 48_000);
/// let snapshot = pipeline.tick(&ring, 18_000.0, 0.0);
/// assert_eq!(snapshot.spectrum.len(), 2048);
/// assert_eq!(snapshot.label, GestureLabel::None);
/// ```
pub struct AnalysisPipeline {
    analysis: AnalysisConfig,
    gesture: GestureConfig,
    peak_config: PeakConfig,
    sample_rate: u32,
    analyzer: SpectralAnalyzer,
    classifier: GestureClassifier,
    tracker: PeakTracker,
    block: Vec<f32>,
}

impl AnalysisPipeline {
    /// Build the pipeline for input captured at `sample_rate`.
    #[must_use]
    pub fn new(config: &SensingConfig, sample_rate: u32) -> Self {
        let analysis = config.analysis.clone();
        let size = analysis.buffer_size.max(2);
        Self {
            analyzer: SpectralAnalyzer::new(size, analysis.window),
            classifier: GestureClassifier::from_config(&config.gesture),
            tracker: PeakTracker::from_config(&config.peaks),
            block: vec![0.0; size],
            gesture: config.gesture.clone(),
            peak_config: config.peaks.clone(),
            analysis,
            sample_rate,
        }
    }

    /// Read the freshest window from `ring` (first channel) and run one tick.
    ///
    /// Before the ring has filled, the missing head of the window is zero.
    pub fn tick(&mut self, ring: &RingBuffer, emitted_hz: f32, timestamp: f64) -> AnalysisSnapshot {
        let mut block = std::mem::take(&mut self.block);
        ring.read_channel_into(0, &mut block);
        let snapshot = self.process_block(&block, emitted_hz, timestamp);
        self.block = block;
        snapshot
    }

    /// Run one tick on an explicit time-domain block.
    pub fn process_block(&mut self, block: &[f32], emitted_hz: f32, timestamp: f64) -> AnalysisSnapshot {
        let spectrum = self.analyzer.analyze(block, self.sample_rate);
        let mags = spectrum.magnitudes();

        let bands = bands::reduce(mags, self.analysis.band_count);

        let dominant = single_peak(mags).map(|(index, magnitude_db)| PeakObservation {
            frequency_hz: spectrum.frequency_of(index),
            magnitude_db,
            timestamp,
        });

        let peaks = self.tracker.observe(two_loudest_peaks(
            mags,
            spectrum.bin_width(),
            self.peak_config.magnitude_threshold,
            self.peak_config.min_separation_hz,
        ));

        let label = self.classifier.update(&spectrum, emitted_hz, timestamp);
        let zoomed = spectrum.zoomed_window(emitted_hz, self.analysis.zoom_bins);

        AnalysisSnapshot {
            timestamp,
            time_block: block.to_vec(),
            spectrum,
            bands,
            dominant,
            peaks,
            zoomed,
            emitted_hz,
            label,
        }
    }

    /// Apply a reloaded configuration.
    ///
    /// The window size is fixed for the lifetime of the capture ring, so a
    /// changed `buffer_size` is ignored. A new window function rebuilds the
    /// analyzer; the peak tracker restarts when its settings change.
    pub fn reconfigure(&mut self, config: &SensingConfig) {
        if config.analysis.buffer_size != self.analysis.buffer_size {
            log::warn!(
                "buffer_size {} ignoré à chaud (fenêtre actuelle : {})",
                config.analysis.buffer_size,
                self.analysis.buffer_size
            );
        }
        if config.analysis.window != self.analysis.window {
            self.analyzer = SpectralAnalyzer::new(self.analyzer.fft_size(), config.analysis.window);
        }
        self.analysis = AnalysisConfig {
            buffer_size: self.analysis.buffer_size,
            ..config.analysis.clone()
        };

        if config.peaks != self.peak_config {
            self.tracker = PeakTracker::from_config(&config.peaks);
            self.peak_config = config.peaks.clone();
        }

        self.gesture = config.gesture.clone();
        self.classifier.reconfigure(&self.gesture);
        log::info!("Analyse reconfigurée ({:?})", self.gesture.strategy);
    }

    /// Swap the gesture strategy, keeping every threshold.
    pub fn set_strategy(&mut self, strategy: GestureStrategyKind) {
        self.gesture.strategy = strategy;
        self.classifier.reconfigure(&self.gesture);
        log::info!("Stratégie de geste : {strategy:?}");
    }

    /// Active gesture strategy.
    #[must_use]
    pub fn strategy(&self) -> GestureStrategyKind {
        self.gesture.strategy
    }

    /// Samples per analysis window.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.analyzer.fft_size()
    }

    /// Sample rate the pipeline analyses at.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let phase = std::f64::consts::TAU * f64::from(freq) * i as f64 / f64::from(sample_rate);
                amplitude * phase.sin() as f32
            })
            .collect()
    }

    #[test]
    fn empty_ring_yields_floor_snapshot() {
        let config = SensingConfig::default();
        let ring = RingBuffer::new(2, config.analysis.buffer_size);
        let mut pipeline = AnalysisPipeline::new(&config, 48_000);
        let snap = pipeline.tick(&ring, 18_000.0, 0.0);
        assert_eq!(snap.time_block.len(), 4096);
        assert!(snap.time_block.iter().all(|&s| s == 0.0));
        assert_eq!(snap.bands.len(), 20);
        assert_eq!(snap.peaks, None);
        assert_eq!(snap.zoomed.len(), 21);
        assert_eq!(snap.label, GestureLabel::None);
    }

    #[test]
    fn dominant_peak_follows_the_tone() {
        let config = SensingConfig::default();
        let mut pipeline = AnalysisPipeline::new(&config, 48_000);
        let block = sine(18_000.0, 1.0, 48_000, 4096);
        let snap = pipeline.process_block(&block, 18_000.0, 0.0);
        let dominant = snap.dominant.unwrap();
        assert!((dominant.frequency_hz - 18_000.0).abs() < 1e-2);
        assert!((snap.timestamp - dominant.timestamp).abs() < f64::EPSILON);
    }

    #[test]
    fn stable_pair_appears_after_stability_ticks() {
        let mut config = SensingConfig::default();
        config.peaks.stability_ticks = 3;
        let mut pipeline = AnalysisPipeline::new(&config, 48_000);
        // bins 256 and 512 at 48 kHz / 4096
        let a = sine(3_000.0, 1.0, 48_000, 4096);
        let b = sine(6_000.0, 0.5, 48_000, 4096);
        let block: Vec<f32> = a.iter().zip(&b).map(|(x, y)| x + y).collect();

        let mut last = None;
        for tick in 0..3 {
            last = pipeline.process_block(&block, 18_000.0, f64::from(tick) * 0.05).peaks;
        }
        let pair = last.unwrap();
        assert!((pair.first_hz - 3_000.0).abs() < 1e-2);
        assert!((pair.second_hz - 6_000.0).abs() < 1e-2);
    }

    #[test]
    fn ring_window_is_analysed() {
        let config = SensingConfig::default();
        let ring = RingBuffer::new(1, config.analysis.buffer_size);
        ring.write(&sine(18_000.0, 1.0, 48_000, 4096), 1);
        let mut pipeline = AnalysisPipeline::new(&config, 48_000);
        let snap = pipeline.tick(&ring, 18_000.0, 0.0);
        let center = snap.zoomed[10];
        assert!(snap.zoomed.iter().all(|&m| m <= center));
    }

    #[test]
    fn buffer_size_is_fixed_after_start() {
        let config = SensingConfig::default();
        let mut pipeline = AnalysisPipeline::new(&config, 48_000);
        let mut reloaded = config.clone();
        reloaded.analysis.buffer_size = 1024;
        reloaded.analysis.band_count = 8;
        reloaded.gesture.strategy = GestureStrategyKind::PeakShift;
        pipeline.reconfigure(&reloaded);
        assert_eq!(pipeline.buffer_size(), 4096);
        assert_eq!(pipeline.strategy(), GestureStrategyKind::PeakShift);
        let snap = pipeline.process_block(&[0.0; 4096], 18_000.0, 0.0);
        assert_eq!(snap.bands.len(), 8);
    }

    #[test]
    fn set_strategy_keeps_thresholds() {
        let mut config = SensingConfig::default();
        config.gesture.gesture_threshold = 7.5;
        let mut pipeline = AnalysisPipeline::new(&config, 48_000);
        pipeline.set_strategy(GestureStrategyKind::PeakShift);
        pipeline.set_strategy(GestureStrategyKind::BandAsymmetry);
        assert_eq!(pipeline.strategy(), GestureStrategyKind::BandAsymmetry);
        assert!((pipeline.gesture.gesture_threshold - 7.5).abs() < f32::EPSILON);
    }
}
