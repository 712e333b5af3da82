//! Error types for training and forecasting.

use thiserror::Error;

use chronos_core::ShapeMismatch;

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised by the forecaster and its model.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Input or target array does not fit the configured shape.
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatch),

    /// The model has not been fitted or restored yet.
    #[error("You must call fit or restore first before calling {operation}!")]
    NotBuilt {
        /// The rejected operation.
        operation: &'static str,
    },

    /// Invalid configuration value.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Arrays passed to the model are inconsistent with each other or with
    /// the built network.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Data error.
    #[error("Data error: {0}")]
    Data(#[from] chronos_data::DataError),

    /// Network configuration error.
    #[error("Model error: {0}")]
    Model(#[from] chronos_models::ModelError),

    /// Checkpoint error.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] chronos_models::CheckpointError),

    /// Export runtime error.
    #[error("Export error: {0}")]
    Export(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tensor conversion error.
    #[error("Tensor error: {0}")]
    Tensor(String),
}
