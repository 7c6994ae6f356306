//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Least squares fit of a first order polynomial `y = coeffs.0 * x + coeffs.1`.
///
/// Returns `None` if there are fewer than two points, the slices differ in length, or all `x`
/// values are identical (the fit is degenerate).
pub fn lin_fit<T>(xs: &[T], ys: &[T]) -> Option<(T, T)>
where
    T: Float,
{
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = T::from(xs.len())?;
    let mean_x = xs.iter().fold(T::zero(), |acc, &x| acc + x) / n;
    let mean_y = ys.iter().fold(T::zero(), |acc, &y| acc + y) / n;

    let mut sxx = T::zero();
    let mut sxy = T::zero();
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        sxx = sxx + (x - mean_x) * (x - mean_x);
        sxy = sxy + (x - mean_x) * (y - mean_y);
    }

    if sxx == T::zero() {
        return None;
    }

    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((15f64, 30f64), (0f64, 1f64), 15f64), 0f64);
        assert_eq!(lin_map((15f64, 30f64), (0f64, 1f64), 30f64), 1f64);
        assert!((lin_map((15f64, 30f64), (0f64, 1f64), 25f64) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_lin_fit() {
        // x = 2y + 1
        let ys = [0f64, 1.0, 2.0, 3.0];
        let xs = [1f64, 3.0, 5.0, 7.0];
        let (m, c) = lin_fit(&ys, &xs).unwrap();
        assert!((m - 2.0).abs() < 1e-12);
        assert!((c - 1.0).abs() < 1e-12);

        // Vertical data can't be fitted
        assert!(lin_fit(&[1f64, 1.0, 1.0], &[0f64, 1.0, 2.0]).is_none());
        assert!(lin_fit(&[1f64], &[0f64]).is_none());
    }
}
