//! 18 kHz probe at 48 kHz / 4096: bin width 11.71875 Hz, probe on bin 1536.
//! An echo two bins up (~+23 Hz) is a hand moving toward the device, two
//! bins down is a hand moving away.

use std::sync::Arc;

use es_audio::fft::SpectralAnalyzer;
use es_audio::gesture::GestureClassifier;
use es_audio::oscillator::{ToneControl, ToneOscillator};
use es_audio::pipeline::AnalysisPipeline;
use es_audio::ring::RingBuffer;
use es_core::config::{GestureConfig, GestureStrategyKind, SensingConfig, ToneConfig};
use es_core::gesture::GestureLabel;

const SAMPLE_RATE: u32 = 48_000;
const SIZE: usize = 4096;
const PROBE_HZ: f32 = 18_000.0;
const BIN_HZ: f32 = 11.718_75;

fn tone(freq: f32, amplitude: f32) -> Vec<f32> {
    (0..SIZE)
        .map(|i| {
            let phase = std::f64::consts::TAU * f64::from(freq) * i as f64 / f64::from(SAMPLE_RATE);
            amplitude * phase.sin() as f32
        })
        .collect()
}

fn probe_with_echo(echo_bins: i32) -> Vec<f32> {
    let echo = tone(PROBE_HZ + echo_bins as f32 * BIN_HZ, 0.5);
    tone(PROBE_HZ, 1.0)
        .iter()
        .zip(&echo)
        .map(|(p, e)| p + e)
        .collect()
}

fn classify(classifier: &mut GestureClassifier, block: &[f32], t: f64) -> GestureLabel {
    let mut analyzer = SpectralAnalyzer::new(SIZE, es_core::config::WindowKind::Blackman);
    let spectrum = analyzer.analyze(block, SAMPLE_RATE);
    classifier.update(&spectrum, PROBE_HZ, t)
}

#[test]
fn echo_above_the_probe_is_toward() {
    let mut classifier = GestureClassifier::from_config(&GestureConfig::default());
    assert_eq!(classify(&mut classifier, &tone(PROBE_HZ, 1.0), 0.0), GestureLabel::None);
    assert_eq!(classify(&mut classifier, &probe_with_echo(2), 0.05), GestureLabel::Toward);
}

#[test]
fn echo_below_the_probe_is_away() {
    let mut classifier = GestureClassifier::from_config(&GestureConfig::default());
    assert_eq!(classify(&mut classifier, &probe_with_echo(-2), 0.05), GestureLabel::Away);
}

#[test]
fn gesture_holds_then_expires() {
    let mut classifier = GestureClassifier::from_config(&GestureConfig::default());
    let still = tone(PROBE_HZ, 1.0);

    assert_eq!(classify(&mut classifier, &probe_with_echo(2), 0.0), GestureLabel::Toward);
    assert_eq!(classify(&mut classifier, &still, 0.6), GestureLabel::Toward);
    assert_eq!(classify(&mut classifier, &still, 1.2), GestureLabel::None);
}

#[test]
fn reversal_inside_debounce_is_ignored() {
    let mut classifier = GestureClassifier::from_config(&GestureConfig::default());
    assert_eq!(classify(&mut classifier, &probe_with_echo(2), 0.0), GestureLabel::Toward);
    assert_eq!(classify(&mut classifier, &probe_with_echo(-2), 0.2), GestureLabel::Toward);
    assert_eq!(classify(&mut classifier, &probe_with_echo(-2), 0.7), GestureLabel::Away);
}

#[test]
fn oscillator_through_ring_and_pipeline() {
    let control = Arc::new(ToneControl::new(&ToneConfig {
        amplitude: 1.0,
        ..ToneConfig::default()
    }));
    let mut osc = ToneOscillator::new(Arc::clone(&control), SAMPLE_RATE);
    let ring = RingBuffer::new(2, SIZE);

    // Loop the probe back as a stereo input, in callback-sized blocks.
    let mut block = vec![0.0f32; 512 * 2];
    for _ in 0..(SIZE / 512) {
        osc.fill(&mut block, 2);
        ring.write(&block, 2);
    }

    let mut pipeline = AnalysisPipeline::new(&SensingConfig::default(), SAMPLE_RATE);
    let snapshot = pipeline.tick(&ring, control.frequency(), 0.0);

    let dominant = snapshot.dominant.unwrap();
    assert!((dominant.frequency_hz - PROBE_HZ).abs() < BIN_HZ);
    assert_eq!(snapshot.label, GestureLabel::None);
    assert_eq!(snapshot.zoomed.len(), 21);
}

#[test]
fn peak_shift_strategy_sees_the_echo() {
    let config = GestureConfig {
        strategy: GestureStrategyKind::PeakShift,
        magnitude_threshold: 1.0,
        smoothing_factor: 1.0,
        ..GestureConfig::default()
    };
    let mut classifier = GestureClassifier::from_config(&config);

    // Dominant peak moves from 18 kHz up to a louder echo three bins above.
    let louder_echo: Vec<f32> = tone(PROBE_HZ, 0.5)
        .iter()
        .zip(&tone(PROBE_HZ + 3.0 * BIN_HZ, 1.0))
        .map(|(p, e)| p + e)
        .collect();
    assert_eq!(classify(&mut classifier, &tone(PROBE_HZ, 0.5), 0.0), GestureLabel::None);
    assert_eq!(classify(&mut classifier, &louder_echo, 0.05), GestureLabel::Toward);
}
