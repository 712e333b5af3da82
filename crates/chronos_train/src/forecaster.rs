//! The `TCNForecaster` facade.
//!
//! The facade owns a [`ShapeConfig`], a [`TrainConfig`] and a
//! [`ForecastModel`]. It checks array shapes before training, refuses
//! inference and persistence until the model is built, and otherwise hands
//! every call to the model unchanged.

use std::path::Path;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use chronos_core::ShapeConfig;

use crate::config::{
    TrainConfig, DEFAULT_BATCH_SIZE, DEFAULT_DROPOUT, DEFAULT_KERNEL_SIZE, DEFAULT_LR,
    DEFAULT_NUM_CHANNELS,
};
use crate::error::{ForecastError, Result};
use crate::losses::LossKind;
use crate::metrics::{Metric, MetricResult, MultiOutput};
use crate::model::{FitResult, ForecastModel, TcnModel};
use crate::optimizer::OptimizerKind;

/// Construction parameters of a [`TCNForecaster`].
///
/// # Example
///
/// ```rust
/// use chronos_train::{LossKind, TCNForecasterConfig};
///
/// let config = TCNForecasterConfig::new(24, 5, 1, 1)
///     .with_num_channels(vec![16; 4])
///     .with_loss(LossKind::Mae);
/// assert_eq!(config.kernel_size, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TCNForecasterConfig {
    /// Lookback length.
    pub past_seq_len: usize,
    /// Forecast horizon.
    pub future_seq_len: usize,
    /// Features per input step.
    pub input_feature_num: usize,
    /// Targets per output step.
    pub output_feature_num: usize,
    /// Width of each TCN layer.
    pub num_channels: Vec<usize>,
    /// Convolution kernel size.
    pub kernel_size: usize,
    /// Dropout rate.
    pub dropout: f64,
    /// Optimizer.
    pub optimizer: OptimizerKind,
    /// Training loss.
    pub loss: LossKind,
    /// Learning rate.
    pub lr: f64,
    /// Random seed.
    pub seed: u64,
}

impl TCNForecasterConfig {
    /// Create a config with default training settings.
    pub fn new(
        past_seq_len: usize,
        future_seq_len: usize,
        input_feature_num: usize,
        output_feature_num: usize,
    ) -> Self {
        Self {
            past_seq_len,
            future_seq_len,
            input_feature_num,
            output_feature_num,
            num_channels: DEFAULT_NUM_CHANNELS.to_vec(),
            kernel_size: DEFAULT_KERNEL_SIZE,
            dropout: DEFAULT_DROPOUT,
            optimizer: OptimizerKind::default(),
            loss: LossKind::default(),
            lr: DEFAULT_LR,
            seed: 42,
        }
    }

    /// Set the layer widths.
    #[must_use]
    pub fn with_num_channels(mut self, num_channels: Vec<usize>) -> Self {
        self.num_channels = num_channels;
        self
    }

    /// Set the kernel size.
    #[must_use]
    pub fn with_kernel_size(mut self, kernel_size: usize) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    /// Set the dropout rate.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Set the optimizer.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Set the loss.
    #[must_use]
    pub fn with_loss(mut self, loss: LossKind) -> Self {
        self.loss = loss;
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Shape part of the configuration.
    pub fn shape_config(&self) -> ShapeConfig {
        ShapeConfig::new(
            self.past_seq_len,
            self.future_seq_len,
            self.input_feature_num,
            self.output_feature_num,
        )
    }

    /// Training part of the configuration.
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            lr: self.lr,
            loss: self.loss,
            num_channels: self.num_channels.clone(),
            kernel_size: self.kernel_size,
            optimizer: self.optimizer,
            dropout: self.dropout,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: self.seed,
        }
    }
}

/// Options for [`TCNForecaster::fit`].
#[derive(Debug, Clone, Copy)]
pub struct FitOptions<'a> {
    /// Validation arrays. Defaults to the training arrays.
    pub validation_data: Option<(&'a Array3<f32>, &'a Array3<f32>)>,
    /// Number of epochs.
    pub epochs: usize,
    /// Validation metric.
    pub metric: Metric,
    /// Mini-batch size.
    pub batch_size: usize,
}

impl Default for FitOptions<'_> {
    fn default() -> Self {
        Self {
            validation_data: None,
            epochs: 1,
            metric: Metric::Mse,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl<'a> FitOptions<'a> {
    /// Validate on separate data.
    #[must_use]
    pub fn with_validation_data(mut self, x: &'a Array3<f32>, y: &'a Array3<f32>) -> Self {
        self.validation_data = Some((x, y));
        self
    }

    /// Set the number of epochs.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the validation metric.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Temporal Convolutional Network forecaster.
///
/// Inputs are `(N, past_seq_len, input_feature_num)`, targets and
/// forecasts `(N, future_seq_len, output_feature_num)`.
///
/// # Example
///
/// ```rust,ignore
/// use chronos_train::{FitOptions, Metric, MultiOutput, TCNForecaster, TCNForecasterConfig};
///
/// let mut forecaster = TCNForecaster::new(TCNForecasterConfig::new(24, 5, 1, 1));
/// forecaster.fit(&x, &y, FitOptions::default().with_epochs(3))?;
///
/// let yhat = forecaster.predict(&x_test)?;
/// let scores = forecaster.evaluate(&x_test, &y_test, &[Metric::Mae], MultiOutput::RawValues)?;
/// forecaster.save("runs/tcn")?;
/// ```
#[derive(Debug)]
pub struct TCNForecaster<M: ForecastModel = TcnModel> {
    shape: ShapeConfig,
    config: TrainConfig,
    model: M,
}

impl TCNForecaster<TcnModel> {
    /// Create a forecaster around an unbuilt [`TcnModel`].
    pub fn new(config: TCNForecasterConfig) -> Self {
        Self::with_model(config, TcnModel::new())
    }
}

impl<M: ForecastModel> TCNForecaster<M> {
    /// Create a forecaster around any [`ForecastModel`].
    pub fn with_model(config: TCNForecasterConfig, model: M) -> Self {
        Self {
            shape: config.shape_config(),
            config: config.train_config(),
            model,
        }
    }

    /// Fit the forecaster on `x` and `y`.
    ///
    /// The batch size is recorded before the shapes are checked.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::ShapeMismatch`] if `x` or `y` does not fit
    /// the configured shape; the model is not called in that case.
    pub fn fit(
        &mut self,
        x: &Array3<f32>,
        y: &Array3<f32>,
        options: FitOptions<'_>,
    ) -> Result<FitResult> {
        self.config.batch_size = options.batch_size;
        self.shape.check_data(x.shape(), y.shape())?;

        let validation = options.validation_data.unwrap_or((x, y));
        tracing::debug!(
            samples = x.shape()[0],
            epochs = options.epochs,
            batch_size = options.batch_size,
            metric = %options.metric,
            "Fitting forecaster {}",
            self.shape
        );

        self.model
            .fit_eval((x, y), validation, options.epochs, options.metric, &self.config)
    }

    /// Forecast `x`.
    pub fn predict(&self, x: &Array3<f32>) -> Result<Array3<f32>> {
        self.ensure_built("predict")?;
        self.model.predict(x)
    }

    /// Forecast `x` with the exported runtime, persisting it under
    /// `dirname` if given.
    pub fn predict_with_onnx(
        &mut self,
        x: &Array3<f32>,
        dirname: Option<&Path>,
    ) -> Result<Array3<f32>> {
        self.ensure_built("predict")?;
        self.model.predict_with_onnx(x, dirname)
    }

    /// Score forecasts of `x` against `y`.
    ///
    /// With [`MultiOutput::RawValues`] each result holds one value per
    /// output feature.
    pub fn evaluate(
        &self,
        x: &Array3<f32>,
        y: &Array3<f32>,
        metrics: &[Metric],
        multioutput: MultiOutput,
    ) -> Result<Vec<MetricResult>> {
        self.ensure_built("evaluate")?;
        self.model.evaluate(x, y, metrics, multioutput)
    }

    /// Score forecasts from the exported runtime.
    pub fn evaluate_with_onnx(
        &mut self,
        x: &Array3<f32>,
        y: &Array3<f32>,
        metrics: &[Metric],
        dirname: Option<&Path>,
        multioutput: MultiOutput,
    ) -> Result<Vec<MetricResult>> {
        self.ensure_built("evaluate")?;
        self.model
            .evaluate_with_onnx(x, y, metrics, dirname, multioutput)
    }

    /// Save the built model to `checkpoint_path`.
    pub fn save(&self, checkpoint_path: impl AsRef<Path>) -> Result<()> {
        self.ensure_built("save")?;
        self.model.save(checkpoint_path.as_ref())
    }

    /// Restore the model from `checkpoint_path`.
    pub fn restore(&mut self, checkpoint_path: impl AsRef<Path>) -> Result<()> {
        self.model.restore(checkpoint_path.as_ref())
    }

    /// Shape configuration.
    pub fn shape_config(&self) -> &ShapeConfig {
        &self.shape
    }

    /// Training configuration.
    pub fn train_config(&self) -> &TrainConfig {
        &self.config
    }

    /// Whether the model has been fitted or restored.
    pub fn is_built(&self) -> bool {
        self.model.is_built()
    }

    /// The underlying model.
    pub fn model(&self) -> &M {
        &self.model
    }

    fn ensure_built(&self, operation: &'static str) -> Result<()> {
        if self.model.is_built() {
            Ok(())
        } else {
            Err(ForecastError::NotBuilt { operation })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronos_core::ShapeField;

    #[derive(Debug, Default)]
    struct MockModel {
        built: bool,
        fit_calls: usize,
        last_validation_len: usize,
        last_batch_size: usize,
        calls: Vec<&'static str>,
    }

    impl ForecastModel for MockModel {
        fn fit_eval(
            &mut self,
            _data: (&Array3<f32>, &Array3<f32>),
            validation: (&Array3<f32>, &Array3<f32>),
            _epochs: usize,
            metric: Metric,
            config: &TrainConfig,
        ) -> Result<FitResult> {
            self.built = true;
            self.fit_calls += 1;
            self.last_validation_len = validation.0.shape()[0];
            self.last_batch_size = config.batch_size;
            Ok(FitResult {
                metric,
                value: 0.5,
                train_losses: vec![],
                valid_scores: vec![0.5],
                training_time_secs: 0.0,
            })
        }

        fn predict(&self, x: &Array3<f32>) -> Result<Array3<f32>> {
            Ok(Array3::zeros((x.shape()[0], 5, 1)))
        }

        fn predict_with_onnx(
            &mut self,
            x: &Array3<f32>,
            _dirname: Option<&Path>,
        ) -> Result<Array3<f32>> {
            self.calls.push("predict_with_onnx");
            self.predict(x)
        }

        fn evaluate(
            &self,
            _x: &Array3<f32>,
            _y: &Array3<f32>,
            metrics: &[Metric],
            _multioutput: MultiOutput,
        ) -> Result<Vec<MetricResult>> {
            Ok(metrics
                .iter()
                .map(|&metric| MetricResult { metric, values: vec![0.0] })
                .collect())
        }

        fn evaluate_with_onnx(
            &mut self,
            x: &Array3<f32>,
            y: &Array3<f32>,
            metrics: &[Metric],
            _dirname: Option<&Path>,
            multioutput: MultiOutput,
        ) -> Result<Vec<MetricResult>> {
            self.calls.push("evaluate_with_onnx");
            self.evaluate(x, y, metrics, multioutput)
        }

        fn save(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn restore(&mut self, _path: &Path) -> Result<()> {
            self.built = true;
            self.calls.push("restore");
            Ok(())
        }

        fn is_built(&self) -> bool {
            self.built
        }
    }

    fn forecaster() -> TCNForecaster<MockModel> {
        TCNForecaster::with_model(TCNForecasterConfig::new(24, 5, 1, 1), MockModel::default())
    }

    fn xy(past: usize, n: usize) -> (Array3<f32>, Array3<f32>) {
        (Array3::zeros((n, past, 1)), Array3::zeros((n, 5, 1)))
    }

    #[test]
    fn test_config_split() {
        let config = TCNForecasterConfig::new(24, 5, 3, 2)
            .with_kernel_size(3)
            .with_optimizer(OptimizerKind::Sgd)
            .with_lr(0.01);
        assert_eq!(config.shape_config(), ShapeConfig::new(24, 5, 3, 2));

        let train = config.train_config();
        assert_eq!(train.kernel_size, 3);
        assert_eq!(train.optimizer, OptimizerKind::Sgd);
        assert_eq!(train.num_channels, vec![30; 8]);
        assert_eq!(train.batch_size, 32);
    }

    #[test]
    fn test_unbuilt_operations_fail() {
        let mut f = forecaster();
        let (x, y) = xy(24, 10);
        let dir = Path::new("unused");

        let errors = [
            f.predict(&x).unwrap_err(),
            f.evaluate(&x, &y, &[Metric::Mse], MultiOutput::RawValues).unwrap_err(),
            f.save(dir).unwrap_err(),
            f.predict_with_onnx(&x, None).unwrap_err(),
            f.evaluate_with_onnx(&x, &y, &[Metric::Mse], None, MultiOutput::RawValues)
                .unwrap_err(),
        ];
        let operations: Vec<_> = errors
            .iter()
            .map(|e| match e {
                ForecastError::NotBuilt { operation } => *operation,
                other => panic!("unexpected error: {other}"),
            })
            .collect();
        assert_eq!(operations, ["predict", "evaluate", "save", "predict", "evaluate"]);
        assert_eq!(
            errors[0].to_string(),
            "You must call fit or restore first before calling predict!"
        );
        assert!(f.model().calls.is_empty());
    }

    #[test]
    fn test_fit_then_predict() {
        let mut f = forecaster();
        let (x, y) = xy(24, 10);

        let result = f.fit(&x, &y, FitOptions::default()).unwrap();
        assert_eq!(result.metric, Metric::Mse);
        assert!(f.is_built());
        assert_eq!(f.predict(&x).unwrap().dim(), (10, 5, 1));

        // validation defaults to the training data
        assert_eq!(f.model().last_validation_len, 10);
    }

    #[test]
    fn test_fit_shape_mismatch_skips_model() {
        let mut f = forecaster();
        let (x, y) = xy(23, 10);

        let err = f.fit(&x, &y, FitOptions::default()).unwrap_err();
        match err {
            ForecastError::ShapeMismatch(m) => {
                assert_eq!(m.field, ShapeField::PastSeqLen);
                assert_eq!((m.expected, m.got), (24, 23));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.model().fit_calls, 0);
        assert!(!f.is_built());
    }

    fn assert_fit_rejects(x: Array3<f32>, y: Array3<f32>, field: ShapeField, got: usize) {
        let mut f = forecaster();
        let err = f.fit(&x, &y, FitOptions::default()).unwrap_err();
        match err {
            ForecastError::ShapeMismatch(m) => {
                assert_eq!(m.field, field);
                assert_eq!(m.got, got);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.model().fit_calls, 0);
        assert!(f.model().calls.is_empty());
        assert!(!f.is_built());
    }

    #[test]
    fn test_fit_input_feature_mismatch() {
        assert_fit_rejects(
            Array3::zeros((4, 24, 2)),
            Array3::zeros((4, 5, 1)),
            ShapeField::InputFeatureNum,
            2,
        );
    }

    #[test]
    fn test_fit_future_seq_len_mismatch() {
        assert_fit_rejects(
            Array3::zeros((4, 24, 1)),
            Array3::zeros((4, 4, 1)),
            ShapeField::FutureSeqLen,
            4,
        );
    }

    #[test]
    fn test_fit_output_feature_mismatch() {
        assert_fit_rejects(
            Array3::zeros((4, 24, 1)),
            Array3::zeros((4, 5, 2)),
            ShapeField::OutputFeatureNum,
            2,
        );
    }

    #[test]
    fn test_batch_size_overwritten() {
        let mut f = forecaster();
        let (x, y) = xy(24, 4);

        f.fit(&x, &y, FitOptions::default().with_batch_size(64)).unwrap();
        assert_eq!(f.train_config().batch_size, 64);
        assert_eq!(f.model().last_batch_size, 64);

        f.fit(&x, &y, FitOptions::default()).unwrap();
        assert_eq!(f.train_config().batch_size, 32);

        // recorded even when the shape check fails
        let (bad_x, bad_y) = xy(12, 4);
        assert!(f.fit(&bad_x, &bad_y, FitOptions::default().with_batch_size(8)).is_err());
        assert_eq!(f.train_config().batch_size, 8);
        assert_eq!(f.model().fit_calls, 2);
    }

    #[test]
    fn test_validation_data_forwarded() {
        let mut f = forecaster();
        let (x, y) = xy(24, 10);
        let (vx, vy) = xy(24, 3);

        let options = FitOptions::default()
            .with_validation_data(&vx, &vy)
            .with_epochs(2)
            .with_metric(Metric::Mae);
        let result = f.fit(&x, &y, options).unwrap();
        assert_eq!(result.metric, Metric::Mae);
        assert_eq!(f.model().last_validation_len, 3);
    }

    #[test]
    fn test_restore_builds() {
        let mut f = forecaster();
        f.restore("some/checkpoint").unwrap();
        assert!(f.is_built());

        let (x, y) = xy(24, 2);
        f.predict_with_onnx(&x, None).unwrap();
        let scores = f
            .evaluate_with_onnx(&x, &y, &[Metric::Mse, Metric::Smape], None, MultiOutput::RawValues)
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(
            f.model().calls,
            vec!["restore", "predict_with_onnx", "evaluate_with_onnx"]
        );
    }
}
