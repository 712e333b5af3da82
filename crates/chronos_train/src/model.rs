//! Trainable models behind the forecaster facade.
//!
//! [`ForecastModel`] is the seam between [`TCNForecaster`] and whatever
//! actually trains and runs a network. [`TcnModel`] is the default
//! implementation, backed by [`TCNForecastNet`].
//!
//! [`TCNForecaster`]: crate::TCNForecaster

use std::path::Path;

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use chronos_core::Seed;
use chronos_data::{DataError, ForecastDataset, ForecastLoader};
use chronos_models::checkpoint::{load_metadata, save_metadata};
use chronos_models::{ModelCheckpoint, TCNForecastNet, TCNForecastNetConfig};

use crate::config::TrainConfig;
use crate::error::{ForecastError, Result};
use crate::export::ExportedForecaster;
use crate::metrics::{compute_metrics, Metric, MetricResult, MultiOutput};
use crate::training::{predict_array, ForecastTrainer, TrainerConfig};

/// Type alias for the training backend (CPU with autodiff).
pub type TrainBackend = Autodiff<NdArray>;

/// Type alias for the inference backend (CPU only).
pub type InferBackend = NdArray;

/// Result of a combined fit and evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Metric scored on the validation data.
    pub metric: Metric,
    /// Final validation score, averaged over output channels.
    pub value: f64,
    /// Mean training loss per epoch.
    pub train_losses: Vec<f32>,
    /// Validation score per epoch.
    pub valid_scores: Vec<f64>,
    /// Total training time in seconds.
    pub training_time_secs: f64,
}

/// A trainable forecasting model.
///
/// Arrays are `(N, past_seq_len, input_feature_num)` for inputs and
/// `(N, future_seq_len, output_feature_num)` for targets and predictions.
pub trait ForecastModel {
    /// Train on `data` for `epochs` epochs, then score `validation` with
    /// `metric`.
    fn fit_eval(
        &mut self,
        data: (&Array3<f32>, &Array3<f32>),
        validation: (&Array3<f32>, &Array3<f32>),
        epochs: usize,
        metric: Metric,
        config: &TrainConfig,
    ) -> Result<FitResult>;

    /// Forecast `x`.
    fn predict(&self, x: &Array3<f32>) -> Result<Array3<f32>>;

    /// Forecast `x` through the exported runtime, optionally persisting the
    /// export under `dirname`.
    fn predict_with_onnx(
        &mut self,
        x: &Array3<f32>,
        dirname: Option<&Path>,
    ) -> Result<Array3<f32>>;

    /// Score forecasts of `x` against `y`.
    fn evaluate(
        &self,
        x: &Array3<f32>,
        y: &Array3<f32>,
        metrics: &[Metric],
        multioutput: MultiOutput,
    ) -> Result<Vec<MetricResult>>;

    /// Score forecasts from the exported runtime.
    fn evaluate_with_onnx(
        &mut self,
        x: &Array3<f32>,
        y: &Array3<f32>,
        metrics: &[Metric],
        dirname: Option<&Path>,
        multioutput: MultiOutput,
    ) -> Result<Vec<MetricResult>>;

    /// Persist the model to a checkpoint.
    fn save(&self, path: &Path) -> Result<()>;

    /// Load the model from a checkpoint.
    fn restore(&mut self, path: &Path) -> Result<()>;

    /// Whether the model has been fitted or restored.
    fn is_built(&self) -> bool;
}

/// Current checkpoint metadata version.
pub const CHECKPOINT_VERSION: u32 = 1;

const ARCH: &str = "TCN";

/// JSON sidecar written next to the weights of a [`TcnModel`] checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Metadata format version.
    pub version: u32,
    /// Architecture name.
    pub arch: String,
    /// Network configuration.
    pub net: TCNForecastNetConfig,
    /// Training configuration of the last fit.
    pub train: TrainConfig,
    /// Epochs trained so far.
    pub epochs_trained: usize,
}

/// TCN-backed [`ForecastModel`].
///
/// The network is sized from the data on the first fit. Later fits keep
/// training the same network.
#[derive(Debug)]
pub struct TcnModel {
    net: Option<TCNForecastNet<TrainBackend>>,
    net_config: Option<TCNForecastNetConfig>,
    train_config: TrainConfig,
    epochs_trained: usize,
    exported: Option<ExportedForecaster>,
    device: <TrainBackend as Backend>::Device,
}

impl Default for TcnModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TcnModel {
    /// Create an unbuilt model.
    pub fn new() -> Self {
        Self {
            net: None,
            net_config: None,
            train_config: TrainConfig::default(),
            epochs_trained: 0,
            exported: None,
            device: Default::default(),
        }
    }

    /// Network configuration, once built.
    pub fn net_config(&self) -> Option<&TCNForecastNetConfig> {
        self.net_config.as_ref()
    }

    /// Training configuration of the last fit or restore.
    pub fn train_config(&self) -> &TrainConfig {
        &self.train_config
    }

    /// Epochs trained so far.
    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    fn built(
        &self,
        operation: &'static str,
    ) -> Result<(&TCNForecastNet<TrainBackend>, &TCNForecastNetConfig)> {
        match (&self.net, &self.net_config) {
            (Some(net), Some(config)) => Ok((net, config)),
            _ => Err(ForecastError::NotBuilt { operation }),
        }
    }

    fn net_config_for(
        &self,
        train: &ForecastDataset,
        config: &TrainConfig,
    ) -> Result<TCNForecastNetConfig> {
        let dims = (
            train.lookback(),
            train.horizon(),
            train.n_features(),
            train.n_targets(),
        );

        if let Some(existing) = &self.net_config {
            let built = (
                existing.past_seq_len,
                existing.future_seq_len,
                existing.input_feature_num,
                existing.output_feature_num,
            );
            if built != dims {
                return Err(ForecastError::InvalidInput(format!(
                    "network was built for (past, future, in, out) = {:?}, got {:?}",
                    built, dims
                )));
            }
            return Ok(existing.clone());
        }

        let net_config = TCNForecastNetConfig::new(dims.0, dims.1, dims.2, dims.3)
            .with_channels(config.num_channels.clone())
            .with_kernel_size(config.kernel_size)
            .with_dropout(config.dropout);
        net_config.validate()?;
        Ok(net_config)
    }

    /// Build (or reuse) the exported runtime, persisting it under `dirname`
    /// if given.
    ///
    /// The export is cached until the next fit or restore, or until a
    /// different `dirname` is requested.
    pub fn export(&mut self, dirname: Option<&Path>) -> Result<&ExportedForecaster> {
        self.export_runtime(dirname, "export")
    }

    fn export_runtime(
        &mut self,
        dirname: Option<&Path>,
        operation: &'static str,
    ) -> Result<&ExportedForecaster> {
        let stale = match (&self.exported, dirname) {
            (None, _) => true,
            (Some(exported), Some(dir)) => exported.dir() != Some(dir),
            (Some(_), None) => false,
        };

        if stale {
            let (net, config) = self.built(operation)?;
            let exported = ExportedForecaster::export(&net.clone().valid(), config, dirname)?;
            self.exported = Some(exported);
        }

        self.exported.as_ref().ok_or(ForecastError::NotBuilt { operation })
    }
}

impl ForecastModel for TcnModel {
    fn fit_eval(
        &mut self,
        data: (&Array3<f32>, &Array3<f32>),
        validation: (&Array3<f32>, &Array3<f32>),
        epochs: usize,
        metric: Metric,
        config: &TrainConfig,
    ) -> Result<FitResult> {
        let train = ForecastDataset::new(data.0.clone(), data.1.clone())?;
        let valid = ForecastDataset::new(validation.0.clone(), validation.1.clone())?;

        let train_dims = (train.lookback(), train.n_features(), train.horizon(), train.n_targets());
        let valid_dims = (valid.lookback(), valid.n_features(), valid.horizon(), valid.n_targets());
        if train_dims != valid_dims {
            return Err(DataError::InvalidShape(format!(
                "validation data (past, in, future, out) = {:?} does not match training data {:?}",
                valid_dims, train_dims
            ))
            .into());
        }

        let net_config = self.net_config_for(&train, config)?;
        let net = match &self.net {
            Some(net) => net.clone(),
            None => {
                TrainBackend::seed(config.seed);
                tracing::debug!(
                    layers = net_config.num_channels.len(),
                    receptive_field = net_config.receptive_field(),
                    "Building TCN network"
                );
                net_config.init::<TrainBackend>(&self.device)
            }
        };

        let loader = ForecastLoader::builder(train)
            .batch_size(config.batch_size)
            .shuffle(true)
            .seed(Seed::new(config.seed).for_epoch(self.epochs_trained))
            .build()?;

        let trainer = ForecastTrainer::<TrainBackend>::new(
            TrainerConfig {
                epochs,
                lr: config.lr,
                loss: config.loss,
                optimizer: config.optimizer,
                metric,
                batch_size: config.batch_size,
            },
            self.device,
        );
        let output = trainer.fit_with_forward(
            net,
            &loader,
            &valid,
            |m, x| m.forward(x),
            |m, x| m.forward(x),
        )?;

        self.net = Some(output.model);
        self.net_config = Some(net_config);
        self.train_config = config.clone();
        self.epochs_trained += epochs;
        self.exported = None;

        let value = match output.valid_scores.last() {
            Some(&score) => score,
            None => self
                .evaluate(validation.0, validation.1, &[metric], MultiOutput::UniformAverage)?
                .first()
                .map_or(f64::NAN, MetricResult::mean),
        };

        Ok(FitResult {
            metric,
            value,
            train_losses: output.train_losses,
            valid_scores: output.valid_scores,
            training_time_secs: output.training_time_secs,
        })
    }

    fn predict(&self, x: &Array3<f32>) -> Result<Array3<f32>> {
        let (net, config) = self.built("predict")?;
        let (_, past, features) = x.dim();
        if (past, features) != (config.past_seq_len, config.input_feature_num) {
            return Err(ForecastError::InvalidInput(format!(
                "network expects (N, {}, {}), got {:?}",
                config.past_seq_len,
                config.input_feature_num,
                x.shape()
            )));
        }

        let inner = net.clone().valid();
        predict_array::<InferBackend, _>(x, self.train_config.batch_size, &self.device, |t| {
            inner.forward(t)
        })
    }

    fn predict_with_onnx(
        &mut self,
        x: &Array3<f32>,
        dirname: Option<&Path>,
    ) -> Result<Array3<f32>> {
        let batch_size = self.train_config.batch_size;
        self.export_runtime(dirname, "predict")?.predict(x, batch_size)
    }

    fn evaluate(
        &self,
        x: &Array3<f32>,
        y: &Array3<f32>,
        metrics: &[Metric],
        multioutput: MultiOutput,
    ) -> Result<Vec<MetricResult>> {
        let preds = self.predict(x)?;
        compute_metrics(y, &preds, metrics, multioutput)
    }

    fn evaluate_with_onnx(
        &mut self,
        x: &Array3<f32>,
        y: &Array3<f32>,
        metrics: &[Metric],
        dirname: Option<&Path>,
        multioutput: MultiOutput,
    ) -> Result<Vec<MetricResult>> {
        let batch_size = self.train_config.batch_size;
        let preds = self.export_runtime(dirname, "evaluate")?.predict(x, batch_size)?;
        compute_metrics(y, &preds, metrics, multioutput)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let (net, config) = self.built("save")?;
        net.save_checkpoint(path)?;
        save_metadata(
            &CheckpointMetadata {
                version: CHECKPOINT_VERSION,
                arch: ARCH.to_string(),
                net: config.clone(),
                train: self.train_config.clone(),
                epochs_trained: self.epochs_trained,
            },
            path,
        )?;
        tracing::info!("Saved checkpoint to {:?}", path);
        Ok(())
    }

    fn restore(&mut self, path: &Path) -> Result<()> {
        let meta: CheckpointMetadata = load_metadata(path)?;
        if meta.arch != ARCH || meta.version > CHECKPOINT_VERSION {
            return Err(chronos_models::CheckpointError::InvalidFormat(format!(
                "unsupported checkpoint {} v{}",
                meta.arch, meta.version
            ))
            .into());
        }
        meta.net.validate()?;

        let net = meta
            .net
            .init::<TrainBackend>(&self.device)
            .load_checkpoint(path, &self.device)?;

        self.net = Some(net);
        self.net_config = Some(meta.net);
        self.train_config = meta.train;
        self.epochs_trained = meta.epochs_trained;
        self.exported = None;
        tracing::info!("Restored checkpoint from {:?}", path);
        Ok(())
    }

    fn is_built(&self) -> bool {
        self.net.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TrainConfig {
        TrainConfig {
            num_channels: vec![4, 4],
            kernel_size: 2,
            dropout: 0.0,
            batch_size: 4,
            ..Default::default()
        }
    }

    fn toy_data(n: usize) -> (Array3<f32>, Array3<f32>) {
        let x = Array3::from_shape_fn((n, 6, 2), |(i, t, f)| {
            ((i + t) as f32 * 0.2 + f as f32).sin()
        });
        let y = Array3::from_shape_fn((n, 3, 1), |(i, h, _)| ((i + 6 + h) as f32 * 0.2).sin());
        (x, y)
    }

    #[test]
    fn test_unbuilt_model() {
        let model = TcnModel::new();
        assert!(!model.is_built());
        assert!(matches!(
            model.predict(&Array3::zeros((1, 6, 2))),
            Err(ForecastError::NotBuilt { operation: "predict" })
        ));
    }

    #[test]
    fn test_fit_builds_from_data() {
        let (x, y) = toy_data(10);
        let mut model = TcnModel::new();
        let result = model
            .fit_eval((&x, &y), (&x, &y), 2, Metric::Mae, &small_config())
            .unwrap();

        assert!(model.is_built());
        assert_eq!(result.metric, Metric::Mae);
        assert_eq!(result.train_losses.len(), 2);
        assert_eq!(result.valid_scores.last().copied(), Some(result.value));

        let config = model.net_config().unwrap();
        assert_eq!(
            (
                config.past_seq_len,
                config.future_seq_len,
                config.input_feature_num,
                config.output_feature_num
            ),
            (6, 3, 2, 1)
        );
        assert_eq!(model.predict(&x).unwrap().dim(), (10, 3, 1));
    }

    #[test]
    fn test_fit_continues_training() {
        let (x, y) = toy_data(8);
        let mut model = TcnModel::new();
        model.fit_eval((&x, &y), (&x, &y), 1, Metric::Mse, &small_config()).unwrap();
        model.fit_eval((&x, &y), (&x, &y), 2, Metric::Mse, &small_config()).unwrap();
        assert_eq!(model.epochs_trained(), 3);

        // a later fit cannot change the data layout
        let x_wide = Array3::<f32>::zeros((8, 6, 3));
        assert!(matches!(
            model.fit_eval((&x_wide, &y), (&x_wide, &y), 1, Metric::Mse, &small_config()),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fit_rejects_inconsistent_data() {
        let (x, y) = toy_data(8);
        let mut model = TcnModel::new();

        let y_short = Array3::<f32>::zeros((7, 3, 1));
        assert!(matches!(
            model.fit_eval((&x, &y_short), (&x, &y), 1, Metric::Mse, &small_config()),
            Err(ForecastError::Data(_))
        ));

        let (vx, vy) = (Array3::<f32>::zeros((4, 5, 2)), Array3::<f32>::zeros((4, 3, 1)));
        assert!(matches!(
            model.fit_eval((&x, &y), (&vx, &vy), 1, Metric::Mse, &small_config()),
            Err(ForecastError::Data(_))
        ));
        assert!(!model.is_built());
    }

    #[test]
    fn test_zero_epochs_still_scores() {
        let (x, y) = toy_data(6);
        let mut model = TcnModel::new();
        let result = model
            .fit_eval((&x, &y), (&x, &y), 0, Metric::Rmse, &small_config())
            .unwrap();
        assert!(result.train_losses.is_empty());
        assert!(result.value.is_finite());
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt");
        let (x, y) = toy_data(8);

        let mut model = TcnModel::new();
        model.fit_eval((&x, &y), (&x, &y), 1, Metric::Mse, &small_config()).unwrap();
        model.save(&path).unwrap();

        let mut restored = TcnModel::new();
        restored.restore(&path).unwrap();
        assert!(restored.is_built());
        assert_eq!(restored.epochs_trained(), 1);
        assert_eq!(restored.train_config(), model.train_config());
        assert_eq!(model.predict(&x).unwrap(), restored.predict(&x).unwrap());
    }

    #[test]
    fn test_dotted_checkpoint_names_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let epoch1 = dir.path().join("tcn.epoch1");
        let epoch3 = dir.path().join("tcn.epoch3");
        let (x, y) = toy_data(8);

        let mut first = TcnModel::new();
        first.fit_eval((&x, &y), (&x, &y), 1, Metric::Mse, &small_config()).unwrap();
        first.save(&epoch1).unwrap();

        let reseeded = TrainConfig {
            seed: 7,
            ..small_config()
        };
        let mut second = TcnModel::new();
        second.fit_eval((&x, &y), (&x, &y), 3, Metric::Mse, &reseeded).unwrap();
        second.save(&epoch3).unwrap();

        let mut restored = TcnModel::new();
        restored.restore(&epoch1).unwrap();
        assert_eq!(restored.epochs_trained(), 1);
        assert_eq!(restored.train_config().seed, small_config().seed);
        assert_eq!(restored.predict(&x).unwrap(), first.predict(&x).unwrap());
        assert_ne!(restored.predict(&x).unwrap(), second.predict(&x).unwrap());
    }

    #[test]
    fn test_export_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (x, y) = toy_data(8);
        let mut model = TcnModel::new();
        model.fit_eval((&x, &y), (&x, &y), 1, Metric::Mse, &small_config()).unwrap();

        let expected = model.predict(&x).unwrap();
        let in_memory = model.predict_with_onnx(&x, None).unwrap();
        assert!(model.exported.as_ref().unwrap().dir().is_none());

        let persisted = model.predict_with_onnx(&x, Some(dir.path())).unwrap();
        assert_eq!(model.exported.as_ref().unwrap().dir(), Some(dir.path()));
        assert!(dir.path().join("tcn_forecaster.mpk").exists());

        for preds in [in_memory, persisted] {
            let diff = (&preds - &expected).mapv(f32::abs).fold(0.0f32, |a, &b| a.max(b));
            assert!(diff < 1e-5);
        }

        model.fit_eval((&x, &y), (&x, &y), 1, Metric::Mse, &small_config()).unwrap();
        assert!(model.exported.is_none());
    }
}
