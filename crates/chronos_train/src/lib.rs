//! Training, evaluation and the `TCNForecaster` facade for chronos-rs.
//!
//! This crate provides:
//! - [`TCNForecaster`]: shape-checked facade over a trainable model
//! - [`ForecastModel`] / [`TcnModel`]: the model seam and its TCN implementation
//! - [`ForecastTrainer`]: mini-batch training loop with selectable optimizer
//! - Loss functions and forecast metrics
//! - [`ExportedForecaster`]: serialised inference-only runtime
//!
//! # Example
//!
//! ```rust,ignore
//! use chronos_train::{FitOptions, TCNForecaster, TCNForecasterConfig};
//!
//! let mut forecaster = TCNForecaster::new(TCNForecasterConfig::new(24, 5, 1, 1));
//! let result = forecaster.fit(&x, &y, FitOptions::default().with_epochs(10))?;
//! println!("{}: {:.4}", result.metric, result.value);
//!
//! let forecast = forecaster.predict(&x_test)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod error;
pub mod export;
pub mod forecaster;
pub mod losses;
pub mod metrics;
pub mod model;
pub mod optimizer;
pub mod training;

pub use config::TrainConfig;
pub use error::{ForecastError, Result};
pub use export::ExportedForecaster;
pub use forecaster::{FitOptions, TCNForecaster, TCNForecasterConfig};
pub use losses::{HuberLoss, LossKind, MAELoss, MSELoss};
pub use metrics::{compute_metrics, Metric, MetricResult, MultiOutput};
pub use model::{
    CheckpointMetadata, FitResult, ForecastModel, InferBackend, TcnModel, TrainBackend,
};
pub use optimizer::OptimizerKind;
pub use training::{predict_array, ForecastTrainer, TrainerConfig, TrainingOutput};
