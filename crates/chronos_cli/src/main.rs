//! chronos CLI for fitting, forecasting with and exporting TCN forecasters.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ndarray::Array3;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chronos_data::{read_npy3, write_npy3};
use chronos_models::checkpoint::load_metadata;
use chronos_train::{
    CheckpointMetadata, FitOptions, ForecastModel, LossKind, Metric, MultiOutput, OptimizerKind,
    TCNForecaster, TCNForecasterConfig, TcnModel,
};

#[derive(Parser)]
#[command(name = "chronos")]
#[command(author, version)]
#[command(about = "Multi-step time series forecasting with temporal convolutional networks")]
#[command(long_about = "chronos: TCN forecasting over .npy arrays.

Inputs are float arrays of shape (samples, past_seq_len, input_feature_num),
targets (samples, future_seq_len, output_feature_num).

EXAMPLES:
  # Fit and save a checkpoint
  chronos fit --x x.npy --y y.npy --epochs 20 --output runs/tcn

  # Forecast with a saved checkpoint
  chronos predict --checkpoint runs/tcn --x x_test.npy --output yhat.npy

  # Score a checkpoint
  chronos evaluate --checkpoint runs/tcn --x x_test.npy --y y_test.npy --metrics mae,smape

  # Write the inference-only export
  chronos export --checkpoint runs/tcn --output runs/export")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a forecaster and save a checkpoint
    Fit {
        /// Input windows (.npy)
        #[arg(long, value_name = "PATH")]
        x: PathBuf,

        /// Target windows (.npy)
        #[arg(long, value_name = "PATH")]
        y: PathBuf,

        /// Validation inputs (.npy); defaults to the training inputs
        #[arg(long, value_name = "PATH", requires = "valid_y")]
        valid_x: Option<PathBuf>,

        /// Validation targets (.npy)
        #[arg(long, value_name = "PATH", requires = "valid_x")]
        valid_y: Option<PathBuf>,

        /// Number of training epochs
        #[arg(long, default_value = "1", value_name = "N")]
        epochs: usize,

        /// Learning rate
        #[arg(long, default_value = "0.001", value_name = "LR")]
        lr: f64,

        /// Batch size for training
        #[arg(long, default_value = "32", value_name = "SIZE")]
        batch_size: usize,

        /// TCN layer widths, comma separated
        #[arg(long, value_delimiter = ',', default_value = "30,30,30,30,30,30,30,30")]
        channels: Vec<usize>,

        /// Convolution kernel size
        #[arg(long, default_value = "7")]
        kernel_size: usize,

        /// Dropout rate
        #[arg(long, default_value = "0.2")]
        dropout: f64,

        /// Optimizer: Adam, AdamW, SGD, RMSprop, Adagrad
        #[arg(long, default_value = "Adam")]
        optimizer: OptimizerKind,

        /// Loss: mse, mae, huber_loss
        #[arg(long, default_value = "mse")]
        loss: LossKind,

        /// Validation metric
        #[arg(long, default_value = "mse")]
        metric: Metric,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42", value_name = "SEED")]
        seed: u64,

        /// Checkpoint path
        #[arg(long, default_value = "./runs/tcn", value_name = "PATH")]
        output: PathBuf,
    },
    /// Forecast with a saved checkpoint
    Predict {
        /// Checkpoint path
        #[arg(long)]
        checkpoint: PathBuf,

        /// Input windows (.npy)
        #[arg(long, value_name = "PATH")]
        x: PathBuf,

        /// Output forecasts (.npy)
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Run the exported inference runtime instead of the trained network
        #[arg(long, default_value = "false")]
        exported: bool,
    },
    /// Score a saved checkpoint
    Evaluate {
        /// Checkpoint path
        #[arg(long)]
        checkpoint: PathBuf,

        /// Input windows (.npy)
        #[arg(long, value_name = "PATH")]
        x: PathBuf,

        /// Target windows (.npy)
        #[arg(long, value_name = "PATH")]
        y: PathBuf,

        /// Metrics, comma separated
        #[arg(long, value_delimiter = ',', default_value = "mse")]
        metrics: Vec<Metric>,

        /// raw_values or uniform_average
        #[arg(long, default_value = "raw_values")]
        multioutput: MultiOutput,

        /// Run the exported inference runtime instead of the trained network
        #[arg(long, default_value = "false")]
        exported: bool,
    },
    /// Write the inference-only export of a checkpoint
    Export {
        /// Checkpoint path
        #[arg(long)]
        checkpoint: PathBuf,

        /// Output directory
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Fit {
            x,
            y,
            valid_x,
            valid_y,
            epochs,
            lr,
            batch_size,
            channels,
            kernel_size,
            dropout,
            optimizer,
            loss,
            metric,
            seed,
            output,
        } => {
            let x = load_array(&x)?;
            let y = load_array(&y)?;
            let (_, past, input) = x.dim();
            let (_, future, out) = y.dim();

            let config = TCNForecasterConfig::new(past, future, input, out)
                .with_num_channels(channels)
                .with_kernel_size(kernel_size)
                .with_dropout(dropout)
                .with_optimizer(optimizer)
                .with_loss(loss)
                .with_lr(lr)
                .with_seed(seed);
            let validation = match (valid_x, valid_y) {
                (Some(vx), Some(vy)) => Some((load_array(&vx)?, load_array(&vy)?)),
                _ => None,
            };
            handle_fit(config, &x, &y, validation.as_ref(), epochs, metric, batch_size, &output)
        }
        Commands::Predict {
            checkpoint,
            x,
            output,
            exported,
        } => handle_predict(&checkpoint, &x, &output, exported),
        Commands::Evaluate {
            checkpoint,
            x,
            y,
            metrics,
            multioutput,
            exported,
        } => handle_evaluate(&checkpoint, &x, &y, &metrics, multioutput, exported),
        Commands::Export { checkpoint, output } => handle_export(&checkpoint, &output),
    }
}

fn load_array(path: &Path) -> Result<Array3<f32>> {
    read_npy3(path).with_context(|| format!("Failed to read {:?}", path))
}

#[allow(clippy::too_many_arguments)]
fn handle_fit(
    config: TCNForecasterConfig,
    x: &Array3<f32>,
    y: &Array3<f32>,
    validation: Option<&(Array3<f32>, Array3<f32>)>,
    epochs: usize,
    metric: Metric,
    batch_size: usize,
    output: &Path,
) -> Result<()> {
    println!("=== chronos Fit ===\n");
    println!("Configuration:");
    println!("  Shape: {}", config.shape_config());
    println!("  Channels: {:?}", config.num_channels);
    println!("  Kernel size: {}", config.kernel_size);
    println!("  Optimizer: {}", config.optimizer);
    println!("  Loss: {}", config.loss);
    println!("  Epochs: {}", epochs);
    println!("  Batch size: {}", batch_size);
    println!("  Samples: {}\n", x.shape()[0]);

    let mut options = FitOptions::default()
        .with_epochs(epochs)
        .with_metric(metric)
        .with_batch_size(batch_size);
    if let Some((vx, vy)) = validation {
        options = options.with_validation_data(vx, vy);
    }

    let mut forecaster = TCNForecaster::new(config);
    let result = forecaster.fit(x, y, options).context("Training failed")?;

    println!("Training complete in {:.1}s", result.training_time_secs);
    if let Some(loss) = result.train_losses.last() {
        println!("  Final train loss: {:.6}", loss);
    }
    println!("  Validation {}: {:.6}", result.metric, result.value);

    forecaster
        .save(output)
        .with_context(|| format!("Failed to save checkpoint to {:?}", output))?;
    println!("\nCheckpoint saved to {:?}", output);
    Ok(())
}

/// Rebuild a forecaster from the checkpoint sidecar and restore its weights.
fn load_forecaster(checkpoint: &Path) -> Result<TCNForecaster> {
    let meta: CheckpointMetadata =
        load_metadata(checkpoint).context("Failed to read checkpoint metadata")?;

    let config = TCNForecasterConfig::new(
        meta.net.past_seq_len,
        meta.net.future_seq_len,
        meta.net.input_feature_num,
        meta.net.output_feature_num,
    )
    .with_num_channels(meta.net.num_channels.clone())
    .with_kernel_size(meta.net.kernel_size)
    .with_dropout(meta.net.dropout)
    .with_optimizer(meta.train.optimizer)
    .with_loss(meta.train.loss)
    .with_lr(meta.train.lr)
    .with_seed(meta.train.seed);

    let mut forecaster = TCNForecaster::new(config);
    forecaster
        .restore(checkpoint)
        .with_context(|| format!("Failed to restore {:?}", checkpoint))?;
    tracing::info!(
        "Restored {} after {} epochs",
        forecaster.shape_config(),
        meta.epochs_trained
    );
    Ok(forecaster)
}

fn handle_predict(checkpoint: &Path, x: &Path, output: &Path, exported: bool) -> Result<()> {
    let mut forecaster = load_forecaster(checkpoint)?;
    let x = load_array(x)?;

    let preds = if exported {
        forecaster.predict_with_onnx(&x, None)?
    } else {
        forecaster.predict(&x)?
    };

    write_npy3(output, &preds).with_context(|| format!("Failed to write {:?}", output))?;
    println!("Wrote forecasts of shape {:?} to {:?}", preds.shape(), output);
    Ok(())
}

fn handle_evaluate(
    checkpoint: &Path,
    x: &Path,
    y: &Path,
    metrics: &[Metric],
    multioutput: MultiOutput,
    exported: bool,
) -> Result<()> {
    if metrics.is_empty() {
        bail!("At least one metric is required");
    }

    let mut forecaster = load_forecaster(checkpoint)?;
    let x = load_array(x)?;
    let y = load_array(y)?;

    let results = if exported {
        forecaster.evaluate_with_onnx(&x, &y, metrics, None, multioutput)?
    } else {
        forecaster.evaluate(&x, &y, metrics, multioutput)?
    };

    println!("=== chronos Evaluation ({}) ===\n", multioutput);
    for result in &results {
        let values: Vec<String> = result.values.iter().map(|v| format!("{:.6}", v)).collect();
        println!("  {:<8} {}", result.metric.name(), values.join("  "));
    }
    println!("\n{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn handle_export(checkpoint: &Path, output: &Path) -> Result<()> {
    let mut model = TcnModel::new();
    model
        .restore(checkpoint)
        .with_context(|| format!("Failed to restore {:?}", checkpoint))?;

    let exported = model.export(Some(output))?;
    let config = exported.config();
    println!("=== chronos Export ===\n");
    println!(
        "  Input: ({}, {}) -> Output: ({}, {})",
        config.past_seq_len,
        config.input_feature_num,
        config.future_seq_len,
        config.output_feature_num
    );
    if let Some(path) = exported.artifact_path() {
        println!("  Artifact: {:?}", path);
    }
    Ok(())
}
