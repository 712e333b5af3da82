//! # chronos_models
//!
//! Forecasting network architectures for chronos-rs.
//!
//! Currently provides [`TCNForecastNet`], a temporal convolutional network
//! with a sequence-to-sequence projection head, plus checkpoint helpers built
//! on Burn's record system.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chronos_models::TCNForecastNetConfig;
//!
//! let config = TCNForecastNetConfig::new(24, 5, 3, 1)
//!     .with_channels(vec![16, 16])
//!     .with_kernel_size(3);
//! let model = config.init::<NdArray>(&device);
//!
//! // x: (batch, past_seq_len, input_feature_num)
//! let y = model.forward(x);
//! // y: (batch, future_seq_len, output_feature_num)
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
mod error;
pub mod tcn;

pub use checkpoint::{CheckpointError, ModelCheckpoint};
pub use error::{ModelError, Result};
pub use tcn::{TCNBlock, TCNBlockConfig, TCNForecastNet, TCNForecastNetConfig};
