//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value into the range `[min, max]`.
///
/// NaN values are mapped to `min` so that they can never reach an actuator.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    if value.is_nan() {
        return min
    }

    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Cosine ease-in-out of a linear progress value in `[0, 1]`.
///
/// Starts and ends with zero slope, and passes through 0.5 at the midpoint.
pub fn ease_cosine<T>(linear: T) -> T
where
    T: Float
{
    let half = T::from(0.5).unwrap();
    let pi = T::from(std::f64::consts::PI).unwrap();

    half * (T::one() - (pi * linear).cos())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 180f64), (500f64, 2500f64), 90f64), 1500f64);
        assert_eq!(lin_map((0f64, 10f64), (1f64, -1f64), 10f64), -1f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5f32, 0f32, 10f32), 5f32);
        assert_eq!(clamp(-5f32, 0f32, 10f32), 0f32);
        assert_eq!(clamp(15f32, 0f32, 10f32), 10f32);
        assert_eq!(clamp(f32::NAN, 0f32, 10f32), 0f32);
    }

    #[test]
    fn test_ease_cosine() {
        assert!(ease_cosine(0f32).abs() < 1e-6);
        assert!((ease_cosine(0.5f32) - 0.5).abs() < 1e-6);
        assert!((ease_cosine(1f32) - 1.0).abs() < 1e-6);

        // Slow start: eased progress lags behind linear progress in the first half
        assert!(ease_cosine(0.2f32) < 0.2);
        assert!(ease_cosine(0.8f32) > 0.8);
    }
}
