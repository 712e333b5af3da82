//! Error types for chronos_models.

use thiserror::Error;

/// Result type alias using [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while configuring a network.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The network configuration cannot be built.
    #[error("Invalid model config: {0}")]
    InvalidConfig(String),
}
