//! Exported inference runtime.
//!
//! An [`ExportedForecaster`] is a serialised, inference-only copy of a
//! trained [`TCNForecastNet`]. The network record is written out with a
//! Burn recorder and loaded back onto the plain NdArray backend, so the
//! exported copy carries no autodiff state and no reference to the
//! model it came from.
//!
//! Without a directory the record goes through an in-memory byte buffer.
//! With a directory it is persisted as `<dirname>/tcn_forecaster.mpk` plus
//! a `tcn_forecaster.meta.json` sidecar and [`ExportedForecaster::load`]
//! can reopen it later.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use ndarray::Array3;

use chronos_models::checkpoint::{load_metadata, save_metadata, save_model, weights_path};
use chronos_models::{ModelCheckpoint, TCNForecastNet, TCNForecastNetConfig};

use crate::error::{ForecastError, Result};
use crate::model::InferBackend;
use crate::training::predict_array;

/// File stem of a persisted export.
pub const ARTIFACT_NAME: &str = "tcn_forecaster";

/// Inference-only runtime built from a trained network.
#[derive(Debug)]
pub struct ExportedForecaster {
    net: TCNForecastNet<InferBackend>,
    config: TCNForecastNetConfig,
    dir: Option<PathBuf>,
    device: <InferBackend as Backend>::Device,
}

impl ExportedForecaster {
    /// Export a trained network.
    ///
    /// # Arguments
    ///
    /// * `net` - The trained network, on any backend
    /// * `config` - The configuration the network was built from
    /// * `dirname` - Directory to persist the artifact in, if any
    pub fn export<B: Backend>(
        net: &TCNForecastNet<B>,
        config: &TCNForecastNetConfig,
        dirname: Option<&Path>,
    ) -> Result<Self> {
        let Some(dir) = dirname else {
            return Self::export_in_memory(net, config);
        };

        let stem = dir.join(ARTIFACT_NAME);
        save_model::<B, _>(net, &stem)?;
        save_metadata(config, &stem)?;
        tracing::info!("Exported forecaster to {:?}", weights_path(&stem));

        Self::load(dir)
    }

    fn export_in_memory<B: Backend>(
        net: &TCNForecastNet<B>,
        config: &TCNForecastNetConfig,
    ) -> Result<Self> {
        let device = Default::default();
        let recorder: BinBytesRecorder<FullPrecisionSettings> = BinBytesRecorder::default();

        let bytes = Recorder::<B>::record(&recorder, net.clone().into_record(), ())
            .map_err(|e| ForecastError::Export(e.to_string()))?;
        let record = Recorder::<InferBackend>::load(&recorder, bytes, &device)
            .map_err(|e| ForecastError::Export(e.to_string()))?;

        let net = config.init::<InferBackend>(&device).load_record(record);
        tracing::debug!("Exported forecaster in memory");

        Ok(Self {
            net,
            config: config.clone(),
            dir: None,
            device,
        })
    }

    /// Load a persisted export from `dirname`.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact or its sidecar is missing or
    /// does not match.
    pub fn load(dirname: impl AsRef<Path>) -> Result<Self> {
        let dir = dirname.as_ref();
        let stem = dir.join(ARTIFACT_NAME);
        let device = Default::default();

        let config: TCNForecastNetConfig = load_metadata(&stem)?;
        config.validate()?;
        let net = config
            .init::<InferBackend>(&device)
            .load_checkpoint(&stem, &device)?;

        Ok(Self {
            net,
            config,
            dir: Some(dir.to_path_buf()),
            device,
        })
    }

    /// Forecast `x` of shape `(N, past_seq_len, input_feature_num)`.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidInput`] if `x` does not match the
    /// exported network.
    pub fn predict(&self, x: &Array3<f32>, batch_size: usize) -> Result<Array3<f32>> {
        let (_, past, features) = x.dim();
        if (past, features) != (self.config.past_seq_len, self.config.input_feature_num) {
            return Err(ForecastError::InvalidInput(format!(
                "exported network expects (N, {}, {}), got {:?}",
                self.config.past_seq_len,
                self.config.input_feature_num,
                x.shape()
            )));
        }
        predict_array::<InferBackend, _>(x, batch_size, &self.device, |t| self.net.forward(t))
    }

    /// Network configuration.
    pub fn config(&self) -> &TCNForecastNetConfig {
        &self.config
    }

    /// Directory the artifact was persisted in, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Path of the persisted weights, if any.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| weights_path(d.join(ARTIFACT_NAME)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net() -> (TCNForecastNet<InferBackend>, TCNForecastNetConfig) {
        let config = TCNForecastNetConfig::new(6, 2, 2, 1)
            .with_channels(vec![4, 4])
            .with_kernel_size(2);
        (config.init(&Default::default()), config)
    }

    fn input() -> Array3<f32> {
        Array3::from_shape_fn((5, 6, 2), |(i, t, f)| (i + t + f) as f32 * 0.1)
    }

    #[test]
    fn test_in_memory_export_matches_source() {
        let (net, config) = net();
        let exported = ExportedForecaster::export(&net, &config, None).unwrap();
        assert!(exported.dir().is_none());
        assert!(exported.artifact_path().is_none());

        let device = Default::default();
        let expected =
            predict_array::<InferBackend, _>(&input(), 2, &device, |t| net.forward(t)).unwrap();
        let actual = exported.predict(&input(), 2).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_persisted_export_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let (net, config) = net();

        let exported = ExportedForecaster::export(&net, &config, Some(dir.path())).unwrap();
        let artifact = exported.artifact_path().unwrap();
        assert!(artifact.exists());
        assert!(artifact.ends_with("tcn_forecaster.mpk"));

        let reloaded = ExportedForecaster::load(dir.path()).unwrap();
        assert_eq!(reloaded.config(), &config);
        assert_eq!(
            exported.predict(&input(), 4).unwrap(),
            reloaded.predict(&input(), 4).unwrap()
        );
    }

    #[test]
    fn test_predict_rejects_wrong_shape() {
        let (net, config) = net();
        let exported = ExportedForecaster::export(&net, &config, None).unwrap();
        let x = Array3::<f32>::zeros((2, 5, 2));
        assert!(matches!(exported.predict(&x, 4), Err(ForecastError::InvalidInput(_))));
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ExportedForecaster::load(dir.path()),
            Err(ForecastError::Checkpoint(_))
        ));
    }
}
