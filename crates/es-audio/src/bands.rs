use es_core::spectrum::FLOOR_DB;

/// Réduit un spectre en `band_count` barres d'égaliseur (max par fenêtre).
///
/// Windows are contiguous and `len / band_count` bins wide; remainder bins at
/// the top of the spectrum are left out. Display only, never used for gesture
/// decisions.
///
/// # Example
/// ```
/// use es_audio::bands::reduce;
/// let spectrum = [1.0, 5.0, 2.0, 3.0, 9.0, 0.0, 7.0];
/// assert_eq!(reduce(&spectrum, 3), vec![5.0, 3.0, 9.0]);
/// ```
#[must_use]
pub fn reduce(spectrum: &[f32], band_count: usize) -> Vec<f32> {
    let mut bands = vec![FLOOR_DB; band_count];
    reduce_into(spectrum, &mut bands);
    bands
}

/// Zero-alloc form of [`reduce`]: one band per slot of `bands`.
///
/// When the spectrum has fewer bins than bands, the window width falls to
/// zero and every band reports [`FLOOR_DB`].
pub fn reduce_into(spectrum: &[f32], bands: &mut [f32]) {
    if bands.is_empty() {
        return;
    }
    let width = spectrum.len() / bands.len();
    if width == 0 {
        bands.fill(FLOOR_DB);
        return;
    }

    for (band, window) in bands.iter_mut().zip(spectrum.chunks_exact(width)) {
        *band = window.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_spectrum_reduces_to_constant() {
        let spectrum = vec![-42.5f32; 2048];
        for band_count in [1, 3, 7, 20, 64, 2048] {
            let bands = reduce(&spectrum, band_count);
            assert_eq!(bands.len(), band_count);
            assert!(bands.iter().all(|&b| (b + 42.5).abs() < f32::EPSILON));
        }
    }

    #[test]
    fn remainder_bins_are_excluded() {
        // width = 2; the trailing 100.0 belongs to no band
        let spectrum = [0.0, 1.0, 2.0, 3.0, 100.0];
        assert_eq!(reduce(&spectrum, 2), vec![1.0, 3.0]);
    }

    #[test]
    fn too_many_bands_report_the_floor() {
        let bands = reduce(&[1.0, 2.0], 4);
        assert_eq!(bands, vec![FLOOR_DB; 4]);
    }

    #[test]
    fn zero_bands_is_empty() {
        assert!(reduce(&[1.0, 2.0, 3.0], 0).is_empty());
    }
}
