use std::collections::VecDeque;

use es_core::config::{PeakConfig, SecondPeakFallback};
use es_core::gesture::PeakPair;

/// Bin de magnitude maximale. Égalité : le plus petit index gagne.
///
/// Returns `None` for an empty spectrum.
///
/// # Example
/// ```
/// use es_audio::peaks::single_peak;
/// assert_eq!(single_peak(&[-3.0, 4.0, 1.0, 4.0]), Some((1, 4.0)));
/// assert_eq!(single_peak(&[]), None);
/// ```
#[must_use]
pub fn single_peak(spectrum: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &m) in spectrum.iter().enumerate() {
        match best {
            Some((_, b)) if m <= b => {}
            _ => best = Some((i, m)),
        }
    }
    best
}

/// Les deux fréquences les plus fortes au-dessus de `threshold`.
///
/// The first is the loudest bin above `threshold` (dB). The second is the
/// loudest other bin above `threshold` whose frequency differs from the first
/// by more than `min_separation_hz`; bins closer than that are treated as
/// sidelobes or harmonics of the same tone and never reported as a second
/// peak. Returns `None` when no bin clears the threshold, and `Some((f1, None))`
/// when only one separated peak exists. Frequencies are `index × bin_width`.
///
/// # Example
/// ```
/// use es_audio::peaks::two_loudest_peaks;
/// let mut spectrum = vec![-100.0f32; 64];
/// spectrum[10] = -5.0;
/// spectrum[11] = -6.0;
/// spectrum[40] = -20.0;
/// let peaks = two_loudest_peaks(&spectrum, 10.0, -40.0, 50.0);
/// assert_eq!(peaks, Some((100.0, Some(400.0))));
/// ```
#[must_use]
pub fn two_loudest_peaks(
    spectrum: &[f32],
    bin_width: f32,
    threshold: f32,
    min_separation_hz: f32,
) -> Option<(f32, Option<f32>)> {
    let (first, _) = loudest_where(spectrum, threshold, |_| true)?;
    let first_hz = first as f32 * bin_width;

    let second = loudest_where(spectrum, threshold, |i| {
        (i as f32 * bin_width - first_hz).abs() > min_separation_hz
    });

    Some((first_hz, second.map(|(i, _)| i as f32 * bin_width)))
}

/// Loudest bin strictly above `threshold` among those accepted by `keep`.
fn loudest_where(
    spectrum: &[f32],
    threshold: f32,
    keep: impl Fn(usize) -> bool,
) -> Option<(usize, f32)> {
    spectrum
        .iter()
        .enumerate()
        .filter(|&(i, &m)| m > threshold && keep(i))
        .fold(None, |best, (i, &m)| match best {
            Some((_, b)) if m <= b => best,
            _ => Some((i, m)),
        })
}

/// Suivi de paires de pics stables sur une fenêtre glissante.
///
/// A pair is reported only once it repeats identically for
/// `stability_ticks` consecutive ticks (4 ticks ≈ 200 ms at 20 ticks/s);
/// until then the last stable pair is held, which suppresses single-frame
/// flicker. A tick with nothing above the threshold breaks the run.
///
/// # Example
/// ```
/// use es_audio::peaks::PeakTracker;
/// use es_core::config::SecondPeakFallback;
///
/// let mut tracker = PeakTracker::new(2, 50.0, SecondPeakFallback::RepeatFirst);
/// assert_eq!(tracker.observe(Some((440.0, Some(880.0)))), None);
/// let stable = tracker.observe(Some((440.0, Some(880.0)))).unwrap();
/// assert_eq!((stable.first_hz, stable.second_hz), (440.0, 880.0));
/// ```
#[derive(Debug)]
pub struct PeakTracker {
    window: VecDeque<PeakPair>,
    stability_ticks: usize,
    min_separation_hz: f32,
    fallback: SecondPeakFallback,
    /// Last separated second frequency seen, for `HoldPrevious`.
    last_second: Option<f32>,
    consistent: Option<PeakPair>,
}

impl PeakTracker {
    /// Create a tracker requiring `stability_ticks` identical observations.
    ///
    /// A held second frequency is only reused while it stays further than
    /// `min_separation_hz` from the current first peak.
    #[must_use]
    pub fn new(stability_ticks: usize, min_separation_hz: f32, fallback: SecondPeakFallback) -> Self {
        let stability_ticks = stability_ticks.max(1);
        Self {
            window: VecDeque::with_capacity(stability_ticks + 1),
            stability_ticks,
            min_separation_hz: min_separation_hz.max(0.0),
            fallback,
            last_second: None,
            consistent: None,
        }
    }

    /// Build from the `[peaks]` config section.
    #[must_use]
    pub fn from_config(config: &PeakConfig) -> Self {
        Self::new(
            config.stability_ticks,
            config.min_separation_hz,
            config.second_peak_fallback,
        )
    }

    /// Feed one tick of [`two_loudest_peaks`] output.
    ///
    /// Returns the latest stable pair, if any has been established.
    pub fn observe(&mut self, peaks: Option<(f32, Option<f32>)>) -> Option<PeakPair> {
        let Some((first_hz, second)) = peaks else {
            self.window.clear();
            return self.consistent;
        };

        let second_hz = match (second, self.fallback) {
            (Some(s), _) => {
                self.last_second = Some(s);
                s
            }
            (None, SecondPeakFallback::HoldPrevious) => self
                .last_second
                .filter(|s| (s - first_hz).abs() > self.min_separation_hz)
                .unwrap_or(first_hz),
            (None, SecondPeakFallback::RepeatFirst) => first_hz,
        };

        let pair = PeakPair {
            first_hz,
            second_hz,
        };
        self.window.push_back(pair);
        while self.window.len() > self.stability_ticks {
            self.window.pop_front();
        }

        if self.window.len() == self.stability_ticks && self.window.iter().all(|p| *p == pair) {
            self.consistent = Some(pair);
        }
        self.consistent
    }

    /// Last stable pair without feeding a new tick.
    #[must_use]
    pub fn consistent(&self) -> Option<PeakPair> {
        self.consistent
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_second = None;
        self.consistent = None;
    }
}
