/// Plancher d'énergie ajouté avant le logarithme.
pub const POWER_EPSILON: f32 = 1e-10;

/// dB level of a silent bin: `10·log10(POWER_EPSILON)`.
pub const FLOOR_DB: f32 = -100.0;

/// Spectre de magnitude en décibels, une valeur par bin.
///
/// Produit par l'analyseur à chaque tick ; immuable ensuite.
/// Holds `buffer_size / 2` bins; bin `i` covers `i × bin_width()` Hz.
///
/// # Example
/// ```
/// use es_core::spectrum::Spectrum;
/// let spectrum = Spectrum::silent(4096, 48_000);
/// assert_eq!(spectrum.len(), 2048);
/// assert!((spectrum.bin_width() - 11.718_75).abs() < 1e-6);
/// assert!((spectrum.frequency_of(1536) - 18_000.0).abs() < 1e-3);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spectrum {
    magnitudes_db: Vec<f32>,
    sample_rate: u32,
}

impl Spectrum {
    /// Wrap dB magnitudes computed at `sample_rate`.
    #[must_use]
    pub fn new(magnitudes_db: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            magnitudes_db,
            sample_rate,
        }
    }

    /// Spectre au plancher pour une fenêtre de `buffer_size` échantillons.
    #[must_use]
    pub fn silent(buffer_size: usize, sample_rate: u32) -> Self {
        Self::new(vec![FLOOR_DB; buffer_size / 2], sample_rate)
    }

    /// Magnitudes in dB.
    #[inline]
    #[must_use]
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes_db
    }

    /// Number of bins.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.magnitudes_db.len()
    }

    /// `true` when the spectrum holds no bins.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.magnitudes_db.is_empty()
    }

    /// Sample rate the spectrum was computed at.
    #[inline]
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Width of one bin in Hz: `(sample_rate / 2) / len`.
    #[inline]
    #[must_use]
    pub fn bin_width(&self) -> f32 {
        if self.magnitudes_db.is_empty() {
            return 0.0;
        }
        self.sample_rate as f32 / 2.0 / self.magnitudes_db.len() as f32
    }

    /// Centre frequency of `index` in Hz.
    #[inline]
    #[must_use]
    pub fn frequency_of(&self, index: usize) -> f32 {
        index as f32 * self.bin_width()
    }

    /// Bin nearest to `frequency` in Hz, clamped to the spectrum.
    ///
    /// Returns `None` for an empty spectrum.
    ///
    /// # Example
    /// ```
    /// use es_core::spectrum::Spectrum;
    /// let spectrum = Spectrum::silent(4096, 48_000);
    /// assert_eq!(spectrum.nearest_bin(18_004.0), Some(1536));
    /// assert_eq!(spectrum.nearest_bin(1e9), Some(2047));
    /// ```
    #[must_use]
    pub fn nearest_bin(&self, frequency: f32) -> Option<usize> {
        let width = self.bin_width();
        if width <= 0.0 {
            return None;
        }
        let bin = (frequency.max(0.0) / width).round() as usize;
        Some(bin.min(self.magnitudes_db.len() - 1))
    }

    /// Copie de ±`half_width` bins autour de `frequency`, pour un affichage zoomé.
    ///
    /// The window is clipped at the spectrum edges, so it may be shorter
    /// than `2 × half_width + 1`.
    ///
    /// # Example
    /// ```
    /// use es_core::spectrum::Spectrum;
    /// let spectrum = Spectrum::silent(4096, 48_000);
    /// assert_eq!(spectrum.zoomed_window(18_000.0, 10).len(), 21);
    /// assert_eq!(spectrum.zoomed_window(0.0, 10).len(), 11);
    /// ```
    #[must_use]
    pub fn zoomed_window(&self, frequency: f32, half_width: usize) -> Vec<f32> {
        let Some(center) = self.nearest_bin(frequency) else {
            return Vec::new();
        };
        let lo = center.saturating_sub(half_width);
        let hi = (center + half_width + 1).min(self.magnitudes_db.len());
        self.magnitudes_db[lo..hi].to_vec()
    }
}

impl AsRef<[f32]> for Spectrum {
    fn as_ref(&self) -> &[f32] {
        &self.magnitudes_db
    }
}
