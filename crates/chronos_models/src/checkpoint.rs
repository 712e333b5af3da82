//! Model checkpointing and serialization utilities.
//!
//! A checkpoint at `path` is a pair of files:
//!
//! - **Weights** (`<path>.mpk`): Burn named MessagePack record, full precision
//! - **Metadata** (`<path>.meta.json`): JSON sidecar with whatever
//!   configuration is needed to rebuild the module before loading weights
//!
//! # Example
//!
//! ```rust,ignore
//! use chronos_models::checkpoint::{save_model, save_metadata, load_metadata};
//! use chronos_models::{ModelCheckpoint, TCNForecastNetConfig};
//!
//! let config = TCNForecastNetConfig::new(24, 5, 1, 1);
//! let model = config.init::<NdArray>(&device);
//!
//! save_model(&model, "runs/tcn")?;
//! save_metadata(&config, "runs/tcn")?;
//!
//! let config: TCNForecastNetConfig = load_metadata("runs/tcn")?;
//! let loaded = config.init::<NdArray>(&device).load_checkpoint("runs/tcn", &device)?;
//! ```

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use serde::{de::DeserializeOwned, Serialize};

/// Extension of the weights file.
pub const WEIGHTS_EXTENSION: &str = "mpk";
/// Extension of the metadata sidecar.
pub const METADATA_EXTENSION: &str = "meta.json";

/// Path of the weights file for a checkpoint.
///
/// The extension is appended, so `runs/tcn.epoch1` maps to
/// `runs/tcn.epoch1.mpk`.
pub fn weights_path(path: impl AsRef<Path>) -> PathBuf {
    append_extension(path.as_ref(), WEIGHTS_EXTENSION)
}

/// Path of the metadata sidecar for a checkpoint.
pub fn metadata_path(path: impl AsRef<Path>) -> PathBuf {
    append_extension(path.as_ref(), METADATA_EXTENSION)
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Save a model's weights to a checkpoint.
///
/// # Arguments
///
/// * `model` - The model to save
/// * `path` - Checkpoint path (`.mpk` is appended)
pub fn save_model<B, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
    B: Backend,
    M: Module<B>,
{
    let path = weights_path(path);
    ensure_parent(&path)?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(model.clone().into_record(), path.clone())
        .map_err(|e| CheckpointError::Save(e.to_string()))?;

    tracing::debug!("Saved weights to {:?}", path);
    Ok(())
}

/// Load a model record from a checkpoint.
///
/// # Arguments
///
/// * `path` - Checkpoint path
/// * `device` - Device to load the record onto
pub fn load_record<B, M>(path: impl AsRef<Path>, device: &B::Device) -> Result<M::Record>
where
    B: Backend,
    M: Module<B>,
{
    let path = weights_path(path);
    if !path.exists() {
        return Err(CheckpointError::Load(format!("{:?} does not exist", path)));
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.clone(), device)
        .map_err(|e| CheckpointError::Load(e.to_string()))?;

    tracing::debug!("Loaded weights from {:?}", path);
    Ok(record)
}

/// Save checkpoint metadata as pretty JSON.
pub fn save_metadata<T: Serialize>(metadata: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = metadata_path(path);
    ensure_parent(&path)?;

    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CheckpointError::InvalidFormat(e.to_string()))?;
    std::fs::write(&path, json).map_err(|e| CheckpointError::Save(e.to_string()))
}

/// Load checkpoint metadata.
pub fn load_metadata<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = metadata_path(path);
    let json = std::fs::read_to_string(&path)
        .map_err(|e| CheckpointError::Load(format!("{:?}: {}", path, e)))?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::InvalidFormat(e.to_string()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| CheckpointError::Save(format!("{:?}: {}", parent, e))),
        _ => Ok(()),
    }
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Checkpoint-related errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Error saving checkpoint.
    #[error("Failed to save checkpoint: {0}")]
    Save(String),

    /// Error loading checkpoint.
    #[error("Failed to load checkpoint: {0}")]
    Load(String),

    /// Invalid format.
    #[error("Invalid checkpoint format: {0}")]
    InvalidFormat(String),
}

/// Extension trait for models to add checkpoint methods.
pub trait ModelCheckpoint<B: Backend>: Module<B> {
    /// Save the model weights to a checkpoint.
    fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        save_model::<B, Self>(self, path)
    }

    /// Load weights from a checkpoint into an existing model.
    fn load_checkpoint(&self, path: impl AsRef<Path>, device: &B::Device) -> Result<Self>
    where
        Self: Sized,
    {
        let record = load_record::<B, Self>(path, device)?;
        Ok(self.clone().load_record(record))
    }
}

impl<B: Backend, M: Module<B>> ModelCheckpoint<B> for M {}
