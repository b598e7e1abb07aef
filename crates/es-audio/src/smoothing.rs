/// Moyenne mobile exponentielle : `previous·(1−α) + current·α`.
///
/// `alpha = 1.0` returns `current` unchanged (smoothing disabled); small
/// values react slowly.
///
/// # Example
/// ```
/// use es_audio::smoothing::ema;
/// assert!((ema(100.0, 200.0, 0.1) - 110.0).abs() < 1e-4);
/// assert!((ema(100.0, 200.0, 1.0) - 200.0).abs() < f32::EPSILON);
/// ```
#[inline(always)]
#[must_use]
pub fn ema(previous: f32, current: f32, alpha: f32) -> f32 {
    previous * (1.0 - alpha) + current * alpha
}
