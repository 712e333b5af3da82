//! Training configuration shared by the facade and its model.

use serde::{Deserialize, Serialize};

use crate::losses::LossKind;
use crate::optimizer::OptimizerKind;

/// Default learning rate.
pub const DEFAULT_LR: f64 = 0.001;
/// Default TCN layer widths.
pub const DEFAULT_NUM_CHANNELS: [usize; 8] = [30; 8];
/// Default convolution kernel size.
pub const DEFAULT_KERNEL_SIZE: usize = 7;
/// Default dropout rate.
pub const DEFAULT_DROPOUT: f64 = 0.2;
/// Default mini-batch size.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Hyper-parameters used to build and train a forecasting network.
///
/// `batch_size` reflects the most recent call to `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Learning rate.
    pub lr: f64,
    /// Training loss.
    pub loss: LossKind,
    /// Width of each TCN layer, in order.
    pub num_channels: Vec<usize>,
    /// Convolution kernel size.
    pub kernel_size: usize,
    /// Optimizer.
    pub optimizer: OptimizerKind,
    /// Dropout rate.
    pub dropout: f64,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Random seed for weight init and shuffling.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lr: DEFAULT_LR,
            loss: LossKind::default(),
            num_channels: DEFAULT_NUM_CHANNELS.to_vec(),
            kernel_size: DEFAULT_KERNEL_SIZE,
            optimizer: OptimizerKind::default(),
            dropout: DEFAULT_DROPOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: 42,
        }
    }
}
