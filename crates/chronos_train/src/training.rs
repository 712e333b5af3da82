//! Training loop implementation.
//!
//! Provides the mini-batch loop used to fit forecasting networks, and
//! batched inference over ndarray inputs.

use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{
    AdaGradConfig, AdamConfig, AdamWConfig, GradientsParams, Optimizer, RmsPropConfig, SgdConfig,
};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array3, Axis};

use chronos_data::{to_tensor, ForecastDataset, ForecastLoader};

use crate::error::{ForecastError, Result};
use crate::losses::LossKind;
use crate::metrics::{compute_metrics, Metric, MultiOutput};
use crate::optimizer::OptimizerKind;

/// Training output with history and final model.
#[derive(Debug)]
pub struct TrainingOutput<M> {
    /// Trained model.
    pub model: M,
    /// Mean training loss per epoch.
    pub train_losses: Vec<f32>,
    /// Validation score per epoch.
    pub valid_scores: Vec<f64>,
    /// Total training time in seconds.
    pub training_time_secs: f64,
}

/// Configuration for forecast training.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Number of epochs.
    pub epochs: usize,
    /// Learning rate (constant).
    pub lr: f64,
    /// Training loss.
    pub loss: LossKind,
    /// Optimizer.
    pub optimizer: OptimizerKind,
    /// Metric scored on the validation set after each epoch.
    pub metric: Metric,
    /// Batch size used for validation inference.
    pub batch_size: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            lr: 1e-3,
            loss: LossKind::Mse,
            optimizer: OptimizerKind::Adam,
            metric: Metric::Mse,
            batch_size: 32,
        }
    }
}

/// Trainer for sequence-to-sequence forecasting models.
pub struct ForecastTrainer<B: AutodiffBackend> {
    config: TrainerConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> ForecastTrainer<B> {
    /// Create a new trainer.
    pub fn new(config: TrainerConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Get the configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train a model using forward function closures.
    ///
    /// `forward_fn` runs the autodiff model on a batch, `valid_forward_fn`
    /// the inner (inference) model. Both map `(B, L, F)` to `(B, H, O)`.
    ///
    /// # Errors
    ///
    /// Returns an error if batching fails or the validation metric is
    /// undefined for the data.
    pub fn fit_with_forward<M, F, G>(
        &self,
        model: M,
        train: &ForecastLoader,
        valid: &ForecastDataset,
        forward_fn: F,
        valid_forward_fn: G,
    ) -> Result<TrainingOutput<M>>
    where
        M: AutodiffModule<B> + Clone,
        F: Fn(&M, Tensor<B, 3>) -> Tensor<B, 3>,
        G: Fn(&M::InnerModule, Tensor<B::InnerBackend, 3>) -> Tensor<B::InnerBackend, 3>,
    {
        match self.config.optimizer {
            OptimizerKind::Adam => {
                let optim = AdamConfig::new().init::<B, M>();
                self.run(model, optim, train, valid, &forward_fn, &valid_forward_fn)
            }
            OptimizerKind::AdamW => {
                let optim = AdamWConfig::new().init::<B, M>();
                self.run(model, optim, train, valid, &forward_fn, &valid_forward_fn)
            }
            OptimizerKind::Sgd => {
                let optim = SgdConfig::new().init::<B, M>();
                self.run(model, optim, train, valid, &forward_fn, &valid_forward_fn)
            }
            OptimizerKind::RmsProp => {
                let optim = RmsPropConfig::new().init::<B, M>();
                self.run(model, optim, train, valid, &forward_fn, &valid_forward_fn)
            }
            OptimizerKind::AdaGrad => {
                let optim = AdaGradConfig::new().init::<B, M>();
                self.run(model, optim, train, valid, &forward_fn, &valid_forward_fn)
            }
        }
    }

    fn run<M, O, F, G>(
        &self,
        model: M,
        mut optim: O,
        train: &ForecastLoader,
        valid: &ForecastDataset,
        forward_fn: &F,
        valid_forward_fn: &G,
    ) -> Result<TrainingOutput<M>>
    where
        M: AutodiffModule<B> + Clone,
        O: Optimizer<M, B>,
        F: Fn(&M, Tensor<B, 3>) -> Tensor<B, 3>,
        G: Fn(&M::InnerModule, Tensor<B::InnerBackend, 3>) -> Tensor<B::InnerBackend, 3>,
    {
        let start_time = Instant::now();
        let epochs = self.config.epochs;

        let mut train_losses = Vec::with_capacity(epochs);
        let mut valid_scores = Vec::with_capacity(epochs);
        let mut current_model = model;

        for epoch in 0..epochs {
            let train_loss =
                self.train_epoch(&mut current_model, &mut optim, train, epoch, forward_fn)?;
            train_losses.push(train_loss);

            let score = self.valid_epoch(&current_model, valid, valid_forward_fn)?;
            valid_scores.push(score);

            tracing::info!(
                epoch = epoch + 1,
                epochs,
                train_loss,
                metric = %self.config.metric,
                score,
                "epoch complete"
            );
        }

        let training_time_secs = start_time.elapsed().as_secs_f64();
        tracing::debug!("Training complete in {:.1}s", training_time_secs);

        Ok(TrainingOutput {
            model: current_model,
            train_losses,
            valid_scores,
            training_time_secs,
        })
    }

    fn train_epoch<M, O, F>(
        &self,
        model: &mut M,
        optim: &mut O,
        loader: &ForecastLoader,
        epoch: usize,
        forward_fn: &F,
    ) -> Result<f32>
    where
        M: AutodiffModule<B> + Clone,
        O: Optimizer<M, B>,
        F: Fn(&M, Tensor<B, 3>) -> Tensor<B, 3>,
    {
        let mut total_loss = 0.0f32;
        let mut n_batches = 0usize;

        for batch_result in loader.iter_epoch::<B>(epoch, &self.device) {
            let batch = batch_result?;

            let preds = forward_fn(model, batch.x);
            let loss = self.config.loss.forward(preds, batch.y);
            total_loss += loss.clone().into_scalar().elem::<f32>();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, model);
            *model = optim.step(self.config.lr, model.clone(), grads);

            n_batches += 1;
        }

        Ok(if n_batches > 0 {
            total_loss / n_batches as f32
        } else {
            0.0
        })
    }

    fn valid_epoch<M, G>(
        &self,
        model: &M,
        valid: &ForecastDataset,
        valid_forward_fn: &G,
    ) -> Result<f64>
    where
        M: AutodiffModule<B>,
        G: Fn(&M::InnerModule, Tensor<B::InnerBackend, 3>) -> Tensor<B::InnerBackend, 3>,
    {
        let inner_model = model.clone().valid();
        let inner_device: <B::InnerBackend as Backend>::Device = self.device.clone().into();
        let preds = predict_array::<B::InnerBackend, _>(
            valid.x(),
            self.config.batch_size,
            &inner_device,
            |x| valid_forward_fn(&inner_model, x),
        )?;

        let scores = compute_metrics(
            valid.y(),
            &preds,
            &[self.config.metric],
            MultiOutput::UniformAverage,
        )?;
        Ok(scores.first().map_or(f64::NAN, |r| r.mean()))
    }
}

/// Run `forward` over `x` in batches of `batch_size` samples and stack the
/// outputs along the sample axis.
///
/// # Errors
///
/// Returns an error if `x` has no samples or an output cannot be
/// converted back to an array.
pub fn predict_array<B, F>(
    x: &Array3<f32>,
    batch_size: usize,
    device: &B::Device,
    forward: F,
) -> Result<Array3<f32>>
where
    B: Backend,
    F: Fn(Tensor<B, 3>) -> Tensor<B, 3>,
{
    if x.len_of(Axis(0)) == 0 {
        return Err(ForecastError::InvalidInput(
            "cannot predict on an empty array".to_string(),
        ));
    }

    let outputs = x
        .axis_chunks_iter(Axis(0), batch_size.max(1))
        .map(|chunk| tensor_to_array(forward(to_tensor::<B>(chunk, device))))
        .collect::<Result<Vec<_>>>()?;

    let views: Vec<_> = outputs.iter().map(|a| a.view()).collect();
    ndarray::concatenate(Axis(0), &views).map_err(|e| ForecastError::Tensor(e.to_string()))
}

/// Convert a rank-3 tensor into an ndarray.
///
/// # Errors
///
/// Returns an error if the tensor data is not `f32`.
pub fn tensor_to_array<B: Backend>(tensor: Tensor<B, 3>) -> Result<Array3<f32>> {
    let [n, h, o] = tensor.dims();
    let data: Vec<f32> = tensor
        .into_data()
        .to_vec()
        .map_err(|e| ForecastError::Tensor(format!("{:?}", e)))?;
    Array3::from_shape_vec((n, h, o), data).map_err(|e| ForecastError::Tensor(e.to_string()))
}
