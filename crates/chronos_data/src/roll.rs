//! Sliding-window sample generation.

use ndarray::{s, Array2, Array3, Axis};

use crate::error::{DataError, Result};

/// Cut a `(T, F)` series into lookback/horizon windows.
///
/// Window `i` takes rows `i..i + past` of every feature as input and rows
/// `i + past..i + past + future` of the `target_cols` as target, so a series
/// of length `T` yields `T - past - future + 1` samples.
///
/// # Errors
///
/// Returns an error if the series is shorter than `past + future`, a window
/// length is zero, or a target column is out of range.
///
/// # Example
///
/// ```rust
/// use chronos_data::roll;
/// use ndarray::Array2;
///
/// let series = Array2::from_shape_fn((10, 2), |(t, f)| (t * 10 + f) as f32);
/// let (x, y) = roll(&series, 4, 2, &[0]).unwrap();
/// assert_eq!(x.dim(), (5, 4, 2));
/// assert_eq!(y.dim(), (5, 2, 1));
/// assert_eq!(y[[0, 0, 0]], 40.0);
/// ```
pub fn roll(
    series: &Array2<f32>,
    past: usize,
    future: usize,
    target_cols: &[usize],
) -> Result<(Array3<f32>, Array3<f32>)> {
    let (length, n_features) = series.dim();

    if past == 0 || future == 0 {
        return Err(DataError::InvalidShape(
            "lookback and horizon must be greater than 0".to_string(),
        ));
    }
    if length < past + future {
        return Err(DataError::SeriesTooShort {
            length,
            past,
            future,
        });
    }
    if target_cols.is_empty() {
        return Err(DataError::InvalidShape("no target columns selected".to_string()));
    }
    if let Some(&col) = target_cols.iter().find(|&&c| c >= n_features) {
        return Err(DataError::InvalidShape(format!(
            "target column {} out of range for {} features",
            col, n_features
        )));
    }

    let n_samples = length - past - future + 1;
    let targets = series.select(Axis(1), target_cols);

    let mut x = Array3::<f32>::zeros((n_samples, past, n_features));
    let mut y = Array3::<f32>::zeros((n_samples, future, target_cols.len()));

    for i in 0..n_samples {
        x.index_axis_mut(Axis(0), i)
            .assign(&series.slice(s![i..i + past, ..]));
        y.index_axis_mut(Axis(0), i)
            .assign(&targets.slice(s![i + past..i + past + future, ..]));
    }

    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(len: usize, features: usize) -> Array2<f32> {
        Array2::from_shape_fn((len, features), |(t, f)| (t * 10 + f) as f32)
    }

    #[test]
    fn test_roll_windows() {
        let (x, y) = roll(&series(30, 3), 24, 5, &[2]).unwrap();
        assert_eq!(x.dim(), (2, 24, 3));
        assert_eq!(y.dim(), (2, 5, 1));

        // second window starts one step later
        assert_eq!(x[[1, 0, 0]], 10.0);
        assert_eq!(x[[1, 23, 1]], 241.0);
        assert_eq!(y[[1, 0, 0]], 252.0);
        assert_eq!(y[[1, 4, 0]], 292.0);
    }

    #[test]
    fn test_roll_multiple_targets() {
        let (_, y) = roll(&series(8, 3), 3, 2, &[2, 0]).unwrap();
        assert_eq!(y.dim(), (4, 2, 2));
        assert_eq!(y[[0, 0, 0]], 32.0);
        assert_eq!(y[[0, 0, 1]], 30.0);
    }

    #[test]
    fn test_roll_too_short() {
        let err = roll(&series(5, 1), 4, 2, &[0]);
        assert!(matches!(err, Err(DataError::SeriesTooShort { length: 5, .. })));
    }

    #[test]
    fn test_roll_bad_target() {
        assert!(roll(&series(10, 2), 3, 2, &[2]).is_err());
        assert!(roll(&series(10, 2), 3, 2, &[]).is_err());
        assert!(roll(&series(10, 2), 0, 2, &[0]).is_err());
    }
}
