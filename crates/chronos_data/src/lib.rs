//! # chronos_data
//!
//! Data handling for chronos-rs forecasters.
//!
//! This crate provides:
//! - [`ForecastDataset`] pairing lookback windows with their targets
//! - [`ForecastLoader`] for shuffled, batched iteration as Burn tensors
//! - [`roll`] to cut a raw series into lookback/horizon windows
//! - NumPy `.npy` readers and writers
//!
//! ## Example
//!
//! ```rust,ignore
//! use chronos_data::{roll, ForecastDataset, ForecastLoader};
//! use chronos_core::Seed;
//!
//! let (x, y) = roll(&series, 24, 5, &[0])?;
//! let dataset = ForecastDataset::new(x, y)?;
//! let loader = ForecastLoader::builder(dataset)
//!     .batch_size(32)
//!     .shuffle(true)
//!     .seed(Seed::new(42))
//!     .build()?;
//!
//! for batch in loader.iter::<NdArray>(&device) {
//!     let batch = batch?;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod dataset;
mod error;
mod io;
mod loader;
mod roll;

pub use dataset::ForecastDataset;
pub use error::{DataError, Result};
pub use io::{read_npy2, read_npy3, write_npy3};
pub use loader::{
    to_tensor, ForecastBatch, ForecastLoader, ForecastLoaderBuilder, ForecastLoaderIter,
};
pub use roll::roll;
