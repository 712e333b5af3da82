//! # chronos
//!
//! Multi-step time series forecasting with temporal convolutional networks.
//!
//! - **Core**: window shapes, shape checks and seeds
//! - **Data**: forecast datasets, batching, sliding windows and `.npy` I/O
//! - **Models**: the TCN forecasting network and checkpoint files
//! - **Training**: the `TCNForecaster` facade, trainer, metrics and export runtime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chronos::prelude::*;
//!
//! let series = read_npy2("data/series.npy")?;
//! let (x, y) = roll(&series, 24, 5, &[0])?;
//!
//! let config = TCNForecasterConfig::new(24, 5, series.ncols(), 1);
//! let mut forecaster = TCNForecaster::new(config);
//! forecaster.fit(&x, &y, FitOptions::default().with_epochs(20))?;
//!
//! let metrics = [Metric::Mae, Metric::Smape];
//! let scores = forecaster.evaluate(&x, &y, &metrics, MultiOutput::RawValues)?;
//! forecaster.save("runs/tcn")?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use chronos_core as core;
pub use chronos_data as data;
pub use chronos_models as models;
pub use chronos_train as train;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use chronos::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use chronos_core::{Seed, ShapeConfig, ShapeField, ShapeMismatch};

    // Data
    pub use chronos_data::{read_npy2, read_npy3, roll, write_npy3, ForecastDataset, ForecastLoader};

    // Models
    pub use chronos_models::{TCNForecastNet, TCNForecastNetConfig};

    // Training
    pub use chronos_train::{
        ExportedForecaster, FitOptions, FitResult, ForecastError, ForecastModel, LossKind, Metric,
        MetricResult, MultiOutput, OptimizerKind, TCNForecaster, TCNForecasterConfig, TcnModel,
        TrainConfig,
    };
}
