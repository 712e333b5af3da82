//! Evaluation metrics for multi-step forecasts.
//!
//! Metrics compare `(N, H, O)` targets with predictions of the same shape.
//! Each output channel `o` is scored over all samples and horizon steps, so
//! [`MultiOutput::RawValues`] yields `O` values per metric and
//! [`MultiOutput::UniformAverage`] their mean.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Guard against division by zero in relative metrics.
const EPSILON: f64 = 1e-8;

/// Forecast evaluation metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Metric {
    /// Mean error.
    Me,
    /// Mean absolute error.
    Mae,
    /// Mean squared error.
    #[default]
    Mse,
    /// Root mean squared error.
    Rmse,
    /// Mean squared log error.
    Msle,
    /// Coefficient of determination.
    R2,
    /// Mean percentage error.
    Mpe,
    /// Mean absolute percentage error.
    Mape,
    /// Mean squared percentage error.
    Mspe,
    /// Symmetric mean absolute percentage error.
    Smape,
    /// Median absolute percentage error.
    Mdape,
    /// Symmetric median absolute percentage error.
    Smdape,
}

impl Metric {
    /// All supported metrics.
    pub const ALL: [Metric; 12] = [
        Metric::Me,
        Metric::Mae,
        Metric::Mse,
        Metric::Rmse,
        Metric::Msle,
        Metric::R2,
        Metric::Mpe,
        Metric::Mape,
        Metric::Mspe,
        Metric::Smape,
        Metric::Mdape,
        Metric::Smdape,
    ];

    /// Metric name.
    pub const fn name(&self) -> &'static str {
        match self {
            Metric::Me => "me",
            Metric::Mae => "mae",
            Metric::Mse => "mse",
            Metric::Rmse => "rmse",
            Metric::Msle => "msle",
            Metric::R2 => "r2",
            Metric::Mpe => "mpe",
            Metric::Mape => "mape",
            Metric::Mspe => "mspe",
            Metric::Smape => "smape",
            Metric::Mdape => "mdape",
            Metric::Smdape => "smdape",
        }
    }

    /// Whether higher is better.
    pub const fn higher_is_better(&self) -> bool {
        matches!(self, Metric::R2)
    }

    /// Score a single channel.
    fn compute(&self, y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        let pairs = || y_true.iter().zip(y_pred).map(|(&t, &p)| (t, p));

        let value = match self {
            Metric::Me => mean(pairs().map(|(t, p)| t - p)),
            Metric::Mae => mean(pairs().map(|(t, p)| (t - p).abs())),
            Metric::Mse => mean(pairs().map(|(t, p)| (t - p).powi(2))),
            Metric::Rmse => mean(pairs().map(|(t, p)| (t - p).powi(2))).sqrt(),
            Metric::Msle => {
                if pairs().any(|(t, p)| t < 0.0 || p < 0.0) {
                    return Err(ForecastError::InvalidInput(
                        "msle cannot be used when targets or predictions contain negative values"
                            .to_string(),
                    ));
                }
                mean(pairs().map(|(t, p)| (t.ln_1p() - p.ln_1p()).powi(2)))
            }
            Metric::R2 => {
                let y_mean = mean(y_true.iter().copied());
                let ss_res: f64 = pairs().map(|(t, p)| (t - p).powi(2)).sum();
                let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();
                if ss_tot == 0.0 {
                    if ss_res == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    1.0 - ss_res / ss_tot
                }
            }
            Metric::Mpe => 100.0 * mean(pairs().map(|(t, p)| (t - p) / nonzero(t))),
            Metric::Mape => 100.0 * mean(pairs().map(|(t, p)| ((t - p) / nonzero(t)).abs())),
            Metric::Mspe => 100.0 * mean(pairs().map(|(t, p)| ((t - p) / nonzero(t)).powi(2))),
            Metric::Smape => 100.0 * mean(pairs().map(|(t, p)| symmetric_error(t, p))),
            Metric::Mdape => {
                100.0 * median(pairs().map(|(t, p)| ((t - p) / nonzero(t)).abs()).collect())
            }
            Metric::Smdape => 100.0 * median(pairs().map(|(t, p)| symmetric_error(t, p)).collect()),
        };
        Ok(value)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ForecastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ForecastError::InvalidConfig(format!("Unknown metric '{}'", s)))
    }
}

/// How per-channel metric values are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MultiOutput {
    /// One value per output channel.
    #[default]
    RawValues,
    /// Mean over output channels.
    UniformAverage,
}

impl MultiOutput {
    /// Name as accepted by [`FromStr`].
    pub const fn name(&self) -> &'static str {
        match self {
            MultiOutput::RawValues => "raw_values",
            MultiOutput::UniformAverage => "uniform_average",
        }
    }
}

impl fmt::Display for MultiOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MultiOutput {
    type Err = ForecastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw_values" => Ok(MultiOutput::RawValues),
            "uniform_average" => Ok(MultiOutput::UniformAverage),
            other => Err(ForecastError::InvalidConfig(format!(
                "Unknown multioutput '{}'. Supported: raw_values, uniform_average",
                other
            ))),
        }
    }
}

/// Values of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// The metric.
    pub metric: Metric,
    /// One value per output channel, or a single averaged value.
    pub values: Vec<f64>,
}

impl MetricResult {
    /// Mean of the stored values.
    pub fn mean(&self) -> f64 {
        mean(self.values.iter().copied())
    }
}

/// Score predictions against targets.
///
/// # Errors
///
/// Returns an error if the arrays differ in shape, are empty, or a metric
/// is undefined for the data.
pub fn compute_metrics(
    y_true: &Array3<f32>,
    y_pred: &Array3<f32>,
    metrics: &[Metric],
    multioutput: MultiOutput,
) -> Result<Vec<MetricResult>> {
    if y_true.dim() != y_pred.dim() {
        return Err(ForecastError::InvalidInput(format!(
            "target shape {:?} does not match prediction shape {:?}",
            y_true.shape(),
            y_pred.shape()
        )));
    }
    if y_true.is_empty() {
        return Err(ForecastError::InvalidInput("cannot evaluate empty arrays".to_string()));
    }

    let channels: Vec<(Vec<f64>, Vec<f64>)> = (0..y_true.len_of(Axis(2)))
        .map(|c| {
            let t = y_true.index_axis(Axis(2), c).iter().map(|&v| f64::from(v)).collect();
            let p = y_pred.index_axis(Axis(2), c).iter().map(|&v| f64::from(v)).collect();
            (t, p)
        })
        .collect();

    metrics
        .iter()
        .map(|&metric| {
            let raw = channels
                .iter()
                .map(|(t, p)| metric.compute(t, p))
                .collect::<Result<Vec<f64>>>()?;
            let values = match multioutput {
                MultiOutput::RawValues => raw,
                MultiOutput::UniformAverage => vec![mean(raw.into_iter())],
            };
            Ok(MetricResult { metric, values })
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn nonzero(v: f64) -> f64 {
    if v.abs() < EPSILON {
        EPSILON
    } else {
        v
    }
}

fn symmetric_error(t: f64, p: f64) -> f64 {
    (t - p).abs() / (t.abs() + p.abs() + EPSILON)
}
