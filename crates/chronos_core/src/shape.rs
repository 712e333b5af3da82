//! Forecaster window shapes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input/output window configuration of a forecaster.
///
/// Inputs are `(N, past_seq_len, input_feature_num)` and targets are
/// `(N, future_seq_len, output_feature_num)`. The configuration is fixed when
/// the forecaster is built and never changes afterwards.
///
/// # Example
///
/// ```rust
/// use chronos_core::ShapeConfig;
///
/// let shape = ShapeConfig::new(24, 5, 3, 1);
/// assert_eq!(shape.past_seq_len(), 24);
/// assert_eq!(shape.x_dims(10), [10, 24, 3]);
/// assert_eq!(shape.y_dims(10), [10, 5, 1]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeConfig {
    past_seq_len: usize,
    future_seq_len: usize,
    input_feature_num: usize,
    output_feature_num: usize,
}

impl ShapeConfig {
    /// Create a new shape configuration.
    ///
    /// # Arguments
    ///
    /// * `past_seq_len` - History time steps (lookback)
    /// * `future_seq_len` - Output time steps (horizon)
    /// * `input_feature_num` - Features per input step
    /// * `output_feature_num` - Targets per output step
    #[must_use]
    pub const fn new(
        past_seq_len: usize,
        future_seq_len: usize,
        input_feature_num: usize,
        output_feature_num: usize,
    ) -> Self {
        Self {
            past_seq_len,
            future_seq_len,
            input_feature_num,
            output_feature_num,
        }
    }

    /// Lookback length.
    #[must_use]
    pub const fn past_seq_len(&self) -> usize {
        self.past_seq_len
    }

    /// Forecast horizon.
    #[must_use]
    pub const fn future_seq_len(&self) -> usize {
        self.future_seq_len
    }

    /// Number of input features.
    #[must_use]
    pub const fn input_feature_num(&self) -> usize {
        self.input_feature_num
    }

    /// Number of output features.
    #[must_use]
    pub const fn output_feature_num(&self) -> usize {
        self.output_feature_num
    }

    /// Expected input dims for `n` samples.
    #[must_use]
    pub const fn x_dims(&self, n: usize) -> [usize; 3] {
        [n, self.past_seq_len, self.input_feature_num]
    }

    /// Expected target dims for `n` samples.
    #[must_use]
    pub const fn y_dims(&self, n: usize) -> [usize; 3] {
        [n, self.future_seq_len, self.output_feature_num]
    }

    /// Check input and target dims against this configuration.
    ///
    /// Only the two trailing dimensions are compared, in the order
    /// `past_seq_len`, `future_seq_len`, `input_feature_num`,
    /// `output_feature_num`. The first mismatch is returned. A dimension
    /// that is missing entirely counts as zero.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatch`] naming the offending field.
    pub fn check_data(&self, x_dims: &[usize], y_dims: &[usize]) -> Result<(), ShapeMismatch> {
        let checks = [
            (ShapeField::PastSeqLen, trailing(x_dims, 2)),
            (ShapeField::FutureSeqLen, trailing(y_dims, 2)),
            (ShapeField::InputFeatureNum, trailing(x_dims, 1)),
            (ShapeField::OutputFeatureNum, trailing(y_dims, 1)),
        ];

        for (field, got) in checks {
            let expected = self.get(field);
            if expected != got {
                return Err(ShapeMismatch {
                    field,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Configured value of a single field.
    #[must_use]
    pub const fn get(&self, field: ShapeField) -> usize {
        match field {
            ShapeField::PastSeqLen => self.past_seq_len,
            ShapeField::FutureSeqLen => self.future_seq_len,
            ShapeField::InputFeatureNum => self.input_feature_num,
            ShapeField::OutputFeatureNum => self.output_feature_num,
        }
    }
}

impl std::fmt::Display for ShapeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(past={}, future={}, in={}, out={})",
            self.past_seq_len, self.future_seq_len, self.input_feature_num, self.output_feature_num
        )
    }
}

fn trailing(dims: &[usize], k: usize) -> usize {
    dims.len().checked_sub(k).map_or(0, |i| dims[i])
}

/// A field of [`ShapeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeField {
    /// `x.shape[-2]`.
    PastSeqLen,
    /// `y.shape[-2]`.
    FutureSeqLen,
    /// `x.shape[-1]`.
    InputFeatureNum,
    /// `y.shape[-1]`.
    OutputFeatureNum,
}

impl ShapeField {
    /// Field name as used in configuration.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ShapeField::PastSeqLen => "past_seq_len",
            ShapeField::FutureSeqLen => "future_seq_len",
            ShapeField::InputFeatureNum => "input_feature_num",
            ShapeField::OutputFeatureNum => "output_feature_num",
        }
    }

    /// The array (`x` or `y`) this field constrains.
    #[must_use]
    pub const fn tensor(&self) -> &'static str {
        match self {
            ShapeField::PastSeqLen | ShapeField::InputFeatureNum => "x",
            ShapeField::FutureSeqLen | ShapeField::OutputFeatureNum => "y",
        }
    }

    const fn layout(&self) -> &'static str {
        match self {
            ShapeField::PastSeqLen | ShapeField::InputFeatureNum => {
                "(batch_size, past_seq_len, input_feature_num)"
            }
            ShapeField::FutureSeqLen | ShapeField::OutputFeatureNum => {
                "(batch_size, future_seq_len, output_feature_num)"
            }
        }
    }
}

impl std::fmt::Display for ShapeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An input or target array that does not fit the [`ShapeConfig`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error(
    "The {tensor} shape should be {layout}, got {field} of {expected} in config while {tensor} input shape of {got}.",
    tensor = .field.tensor(),
    layout = .field.layout()
)]
pub struct ShapeMismatch {
    /// Mismatched field.
    pub field: ShapeField,
    /// Value from the configuration.
    pub expected: usize,
    /// Value found on the array.
    pub got: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_accessors() {
        let shape = ShapeConfig::new(24, 5, 3, 2);
        assert_eq!(shape.past_seq_len(), 24);
        assert_eq!(shape.future_seq_len(), 5);
        assert_eq!(shape.input_feature_num(), 3);
        assert_eq!(shape.output_feature_num(), 2);
        assert_eq!(shape.get(ShapeField::InputFeatureNum), 3);
    }

    #[test]
    fn test_check_data_accepts_matching_shapes() {
        let shape = ShapeConfig::new(24, 5, 1, 1);
        assert!(shape.check_data(&[10, 24, 1], &[10, 5, 1]).is_ok());
        // leading dims are not checked
        assert!(shape.check_data(&[3, 24, 1], &[7, 5, 1]).is_ok());
    }

    #[test]
    fn test_check_data_past_seq_len() {
        let shape = ShapeConfig::new(24, 5, 1, 1);
        let err = shape.check_data(&[10, 23, 1], &[10, 5, 1]).unwrap_err();
        assert_eq!(err.field, ShapeField::PastSeqLen);
        assert_eq!(err.expected, 24);
        assert_eq!(err.got, 23);

        let msg = err.to_string();
        assert!(msg.contains("past_seq_len of 24"));
        assert!(msg.contains("x input shape of 23"));
    }

    #[test]
    fn test_check_data_order() {
        let shape = ShapeConfig::new(24, 5, 2, 3);

        // every field wrong: lookback is reported first
        let err = shape.check_data(&[1, 1, 1], &[1, 1, 1]).unwrap_err();
        assert_eq!(err.field, ShapeField::PastSeqLen);

        // horizon is checked before input features
        let err = shape.check_data(&[1, 24, 9], &[1, 4, 3]).unwrap_err();
        assert_eq!(err.field, ShapeField::FutureSeqLen);
        assert!(err.to_string().contains("y input shape of 4"));

        let err = shape.check_data(&[1, 24, 9], &[1, 5, 9]).unwrap_err();
        assert_eq!(err.field, ShapeField::InputFeatureNum);
        assert_eq!((err.expected, err.got), (2, 9));

        let err = shape.check_data(&[1, 24, 2], &[1, 5, 1]).unwrap_err();
        assert_eq!(err.field, ShapeField::OutputFeatureNum);
        assert_eq!((err.expected, err.got), (3, 1));
    }

    #[test]
    fn test_missing_dims_count_as_zero() {
        let shape = ShapeConfig::new(24, 5, 1, 1);
        let err = shape.check_data(&[24], &[5, 1]).unwrap_err();
        assert_eq!(err.field, ShapeField::PastSeqLen);
        assert_eq!(err.got, 0);
    }

    #[test]
    fn test_shape_serialization() {
        let shape = ShapeConfig::new(24, 5, 1, 1);
        let json = serde_json::to_string(&shape).unwrap();
        let restored: ShapeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(shape, restored);
    }
}
