use es_core::config::WindowKind;
use es_core::spectrum::{POWER_EPSILON, Spectrum};
use realfft::RealFftPlanner;

/// Analyseur spectral : FFT réelle fenêtrée, magnitudes en dB.
///
/// Pre-allocates the FFT plan and scratch buffers for zero-allocation hot path.
/// The output depends only on the input block, the window and the size: the
/// buffers held here are scratch space, not state.
///
/// # Example
/// ```
/// use es_audio::fft::SpectralAnalyzer;
/// use es_core::config::WindowKind;
/// let analyzer = SpectralAnalyzer::new(4096, WindowKind::Blackman);
/// assert_eq!(analyzer.bin_count(), 2048);
/// ```
pub struct SpectralAnalyzer {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Window coefficients, periodic form.
    window: Vec<f32>,
}

impl SpectralAnalyzer {
    /// Create an analyzer for blocks of `size` samples.
    ///
    /// # Panics
    /// Panics if `size` is less than 2.
    #[must_use]
    pub fn new(size: usize, window: WindowKind) -> Self {
        assert!(size >= 2, "FFT size must be >= 2");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window: window_coefficients(window, size),
        }
    }

    /// FFT window size (`BUFFER_SIZE`).
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Bins produced per analysis: `fft_size / 2`.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyze `samples` recorded at `sample_rate` into a fresh [`Spectrum`].
    ///
    /// # Example
    /// ```
    /// use es_audio::fft::SpectralAnalyzer;
    /// use es_core::config::WindowKind;
    /// let mut analyzer = SpectralAnalyzer::new(256, WindowKind::Hann);
    /// let spectrum = analyzer.analyze(&[0.0; 256], 44_100);
    /// assert_eq!(spectrum.len(), 128);
    /// assert!(spectrum.magnitudes().iter().all(|m| m.is_finite()));
    /// ```
    pub fn analyze(&mut self, samples: &[f32], sample_rate: u32) -> Spectrum {
        let mut out = vec![0.0; self.bin_count()];
        self.analyze_into(samples, &mut out);
        Spectrum::new(out, sample_rate)
    }

    /// Analyze `samples` into `out` (`fft_size / 2` dB values).
    ///
    /// Blocks shorter than `fft_size` are zero padded, longer ones truncated.
    /// Each bin is `10·log10(|X|² / N + ε)`; silence lands on
    /// [`es_core::spectrum::FLOOR_DB`].
    pub fn analyze_into(&mut self, samples: &[f32], out: &mut [f32]) {
        let n = self.fft_size.min(samples.len());

        // Copy and window
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                samples[i] * self.window[i]
            } else {
                0.0
            };
        }

        // Forward FFT
        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            out.fill(es_core::spectrum::FLOOR_DB);
            return;
        }

        // Power → dB, Nyquist bin dropped
        let norm = self.fft_size as f32;
        for (slot, c) in out.iter_mut().zip(self.spectrum_buf.iter()) {
            let power = (c.re * c.re + c.im * c.im) / norm;
            *slot = 10.0 * (power + POWER_EPSILON).log10();
        }
    }
}

/// Coefficients de fenêtre, forme périodique (dénominateur `size`).
fn window_coefficients(kind: WindowKind, size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / n;
            match kind {
                WindowKind::Rectangular => 1.0,
                WindowKind::Hann => 0.5 * (1.0 - phase.cos()),
                WindowKind::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use es_core::spectrum::FLOOR_DB;

    use super::*;
    use crate::peaks::single_peak;

    fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn silence_sits_on_the_floor() {
        let mut analyzer = SpectralAnalyzer::new(1024, WindowKind::Blackman);
        let spectrum = analyzer.analyze(&[0.0; 1024], 44_100);
        assert_eq!(spectrum.len(), 512);
        for &m in spectrum.magnitudes() {
            assert!(m.is_finite());
            assert!((m - FLOOR_DB).abs() < 1e-3);
        }
    }

    #[test]
    fn empty_block_is_silence() {
        let mut analyzer = SpectralAnalyzer::new(64, WindowKind::Hann);
        let spectrum = analyzer.analyze(&[], 8_000);
        assert!(spectrum.magnitudes().iter().all(|m| (m - FLOOR_DB).abs() < 1e-3));
    }

    #[test]
    fn aligned_sine_peaks_on_its_bin() {
        let sample_rate = 48_000;
        let size = 4096;
        let mut analyzer = SpectralAnalyzer::new(size, WindowKind::Blackman);
        // bin 1536 × 11.71875 Hz = 18 kHz
        let block = sine(18_000.0, sample_rate, size, 0.8);
        let spectrum = analyzer.analyze(&block, sample_rate);
        let (index, magnitude) = single_peak(spectrum.magnitudes()).unwrap_or_default();
        assert_eq!(index, 1536);
        assert!(magnitude > 0.0);
        assert!((spectrum.frequency_of(index) - 18_000.0).abs() < spectrum.bin_width());
    }

    #[test]
    fn peak_found_with_every_window() {
        let sample_rate = 44_100;
        let size = 2048;
        let bin = 200;
        let freq = bin as f32 * sample_rate as f32 / size as f32;
        let block = sine(freq, sample_rate, size, 0.5);
        for kind in [WindowKind::Rectangular, WindowKind::Hann, WindowKind::Blackman] {
            let mut analyzer = SpectralAnalyzer::new(size, kind);
            let spectrum = analyzer.analyze(&block, sample_rate);
            let (index, _) = single_peak(spectrum.magnitudes()).unwrap_or_default();
            assert!(index.abs_diff(bin) <= 1, "{kind:?} peak at {index}");
        }
    }

    #[test]
    fn analysis_is_deterministic() {
        let mut analyzer = SpectralAnalyzer::new(512, WindowKind::Blackman);
        let block = sine(1_000.0, 16_000, 512, 0.3);
        let a = analyzer.analyze(&block, 16_000);
        let b = analyzer.analyze(&block, 16_000);
        assert_eq!(a, b);
    }

    #[test]
    fn rectangular_full_scale_power() {
        // Aligned unit sine, no window: |X| = N/2, power = N/4.
        let size = 256;
        let mut analyzer = SpectralAnalyzer::new(size, WindowKind::Rectangular);
        let block = sine(1_000.0, 8_000, size, 1.0);
        // 1 kHz at 8 kHz / 256 = bin 32
        let spectrum = analyzer.analyze(&block, 8_000);
        let expected = 10.0 * (size as f32 / 4.0).log10();
        assert!((spectrum.magnitudes()[32] - expected).abs() < 0.05);
    }
}
