//! Forecasting dataset type.

use ndarray::{Array3, ArrayView2, Axis};

use crate::error::{DataError, Result};

/// A dataset of lookback windows and their forecast targets.
///
/// Stores data in the `(N, L, F)` format:
/// - `x`: `(N, past_seq_len, input_feature_num)`
/// - `y`: `(N, future_seq_len, output_feature_num)`
///
/// # Example
///
/// ```rust
/// use chronos_data::ForecastDataset;
/// use ndarray::Array3;
///
/// let x = Array3::<f32>::zeros((100, 24, 3));
/// let y = Array3::<f32>::zeros((100, 5, 1));
/// let dataset = ForecastDataset::new(x, y).unwrap();
/// assert_eq!(dataset.len(), 100);
/// assert_eq!(dataset.horizon(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct ForecastDataset {
    x: Array3<f32>,
    y: Array3<f32>,
}

impl ForecastDataset {
    /// Create a new dataset from arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample counts differ or the dataset is empty.
    pub fn new(x: Array3<f32>, y: Array3<f32>) -> Result<Self> {
        let n_samples = x.len_of(Axis(0));
        if y.len_of(Axis(0)) != n_samples {
            return Err(DataError::InvalidShape(format!(
                "x has {} samples but y has {} samples",
                n_samples,
                y.len_of(Axis(0))
            )));
        }
        if n_samples == 0 {
            return Err(DataError::EmptyDataset);
        }
        Ok(Self { x, y })
    }

    /// Get the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len_of(Axis(0))
    }

    /// Check if the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookback length.
    #[must_use]
    pub fn lookback(&self) -> usize {
        self.x.len_of(Axis(1))
    }

    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.x.len_of(Axis(2))
    }

    /// Forecast horizon.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.y.len_of(Axis(1))
    }

    /// Number of target features.
    #[must_use]
    pub fn n_targets(&self) -> usize {
        self.y.len_of(Axis(2))
    }

    /// Inputs.
    #[must_use]
    pub fn x(&self) -> &Array3<f32> {
        &self.x
    }

    /// Targets.
    #[must_use]
    pub fn y(&self) -> &Array3<f32> {
        &self.y
    }

    /// Get a single sample as `(x, y)` views.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn get(&self, idx: usize) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>) {
        (
            self.x.index_axis(Axis(0), idx),
            self.y.index_axis(Axis(0), idx),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_dims() {
        let ds = ForecastDataset::new(Array3::zeros((8, 24, 3)), Array3::zeros((8, 5, 2))).unwrap();
        assert_eq!(ds.len(), 8);
        assert_eq!(ds.lookback(), 24);
        assert_eq!(ds.n_features(), 3);
        assert_eq!(ds.horizon(), 5);
        assert_eq!(ds.n_targets(), 2);
        assert!(!ds.is_empty());
    }

    #[test]
    fn test_dataset_sample_mismatch() {
        let err = ForecastDataset::new(Array3::zeros((8, 24, 1)), Array3::zeros((7, 5, 1)));
        assert!(matches!(err, Err(DataError::InvalidShape(_))));
    }

    #[test]
    fn test_dataset_empty() {
        let err = ForecastDataset::new(Array3::zeros((0, 24, 1)), Array3::zeros((0, 5, 1)));
        assert!(matches!(err, Err(DataError::EmptyDataset)));
    }

    #[test]
    fn test_dataset_get() {
        let x = Array3::from_shape_fn((4, 3, 1), |(n, t, _)| (n * 10 + t) as f32);
        let y = Array3::from_shape_fn((4, 2, 1), |(n, t, _)| (n * 100 + t) as f32);
        let ds = ForecastDataset::new(x, y).unwrap();

        let (xs, ys) = ds.get(2);
        assert_eq!(xs[[1, 0]], 21.0);
        assert_eq!(ys[[1, 0]], 201.0);
    }
}
