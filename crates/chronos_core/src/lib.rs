//! # chronos_core
//!
//! Core types shared by the chronos-rs forecasting crates.
//!
//! This crate provides:
//! - [`ShapeConfig`] describing the input/output windows of a forecaster
//! - [`ShapeMismatch`] raised when an array does not fit that configuration
//! - [`Seed`] for deterministic shuffling
//!
//! ## Shape Convention
//!
//! Forecasting data follows the convention `(N, L, F)`:
//! - `N`: Number of samples
//! - `L`: Time steps (lookback for inputs, horizon for targets)
//! - `F`: Features per time step
//!
//! ## Example
//!
//! ```rust
//! use chronos_core::ShapeConfig;
//!
//! let shape = ShapeConfig::new(24, 5, 1, 1);
//! assert!(shape.check_data(&[10, 24, 1], &[10, 5, 1]).is_ok());
//! assert!(shape.check_data(&[10, 23, 1], &[10, 5, 1]).is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod seed;
mod shape;

pub use seed::Seed;
pub use shape::{ShapeConfig, ShapeField, ShapeMismatch};
