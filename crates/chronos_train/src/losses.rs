//! Loss functions for multi-step forecasting.
//!
//! All losses take `(B, H, O)` predictions and targets and reduce to the
//! mean over every element.

use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Mean Squared Error loss.
#[derive(Debug, Default)]
pub struct MSELoss;

impl MSELoss {
    /// Compute the loss.
    pub fn forward<B: Backend>(&self, preds: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        let diff = preds - targets;
        (diff.clone() * diff).mean()
    }
}

/// Mean Absolute Error loss.
#[derive(Debug, Default)]
pub struct MAELoss;

impl MAELoss {
    /// Compute the loss.
    pub fn forward<B: Backend>(&self, preds: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        (preds - targets).abs().mean()
    }
}

/// Huber loss (smooth L1).
///
/// L = 0.5 * (y - pred)^2                   if |y - pred| <= delta
/// L = delta * (|y - pred| - 0.5 * delta)   otherwise
#[derive(Debug)]
pub struct HuberLoss {
    /// Threshold between L2 and L1 behavior.
    pub delta: f32,
}

impl HuberLoss {
    /// Create a new Huber loss.
    pub fn new(delta: f32) -> Self {
        Self { delta }
    }

    /// Compute the loss.
    pub fn forward<B: Backend>(&self, preds: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        let diff = preds - targets;
        let abs_diff = diff.clone().abs();

        let quadratic = diff.powf_scalar(2.0).mul_scalar(0.5);
        let linear = abs_diff
            .clone()
            .sub_scalar(0.5 * self.delta)
            .mul_scalar(self.delta);

        linear
            .mask_where(abs_diff.lower_equal_elem(self.delta), quadratic)
            .mean()
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Loss used for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LossKind {
    /// Mean squared error.
    #[default]
    Mse,
    /// Mean absolute error.
    Mae,
    /// Huber loss with delta 1.0.
    Huber,
}

impl LossKind {
    /// Compute the loss between predictions and targets.
    pub fn forward<B: Backend>(&self, preds: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        match self {
            LossKind::Mse => MSELoss.forward(preds, targets),
            LossKind::Mae => MAELoss.forward(preds, targets),
            LossKind::Huber => HuberLoss::default().forward(preds, targets),
        }
    }

    /// Canonical name.
    pub const fn name(&self) -> &'static str {
        match self {
            LossKind::Mse => "mse",
            LossKind::Mae => "mae",
            LossKind::Huber => "huber_loss",
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mse" => Ok(LossKind::Mse),
            "mae" => Ok(LossKind::Mae),
            "huber_loss" | "huber" => Ok(LossKind::Huber),
            other => Err(ForecastError::InvalidConfig(format!(
                "Unknown loss '{}'. Supported: mse, mae, huber_loss",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray;

    fn pair(preds: [f32; 4], targets: [f32; 4]) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let device = Default::default();
        (
            Tensor::<B, 1>::from_floats(preds, &device).reshape([1, 2, 2]),
            Tensor::<B, 1>::from_floats(targets, &device).reshape([1, 2, 2]),
        )
    }

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_scalar().elem()
    }

    #[test]
    fn test_mse() {
        let (p, t) = pair([1.0, 2.0, 3.0, 4.0], [1.0, 2.0, 3.0, 6.0]);
        assert!((scalar(LossKind::Mse.forward(p, t)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mae() {
        let (p, t) = pair([1.0, 2.0, 3.0, 4.0], [2.0, 2.0, 3.0, 7.0]);
        assert!((scalar(LossKind::Mae.forward(p, t)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_huber_regions() {
        // |d| = 0.5 -> 0.125 (quadratic), |d| = 3 -> 2.5 (linear)
        let (p, t) = pair([0.5, 3.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0]);
        let loss = scalar(LossKind::Huber.forward(p, t));
        assert!((loss - (0.125 + 2.5) / 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_loss() {
        assert_eq!("MSE".parse::<LossKind>().unwrap(), LossKind::Mse);
        assert_eq!("huber_loss".parse::<LossKind>().unwrap(), LossKind::Huber);
        assert_eq!("huber".parse::<LossKind>().unwrap(), LossKind::Huber);
        assert!("hinge".parse::<LossKind>().is_err());
    }
}
