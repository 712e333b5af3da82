//! Temporal Convolutional Network (TCN) for multi-step forecasting.
//!
//! TCN uses causal dilated convolutions for sequence modeling,
//! enabling efficient training with long-range dependencies.
//!
//! Key features:
//! - Causal convolutions (no information leakage from future)
//! - Dilated convolutions with exponentially increasing dilation
//! - Residual connections for gradient flow
//! - Sequence-to-sequence head mapping the lookback onto the horizon
//!
//! Reference: "An Empirical Evaluation of Generic Convolutional and Recurrent
//! Networks for Sequence Modeling" by Bai et al. (2018)

use burn::nn::{
    conv::{Conv1d, Conv1dConfig},
    Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig1d, Relu,
};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Configuration for a TCN residual block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TCNBlockConfig {
    /// Input channels.
    pub in_channels: usize,
    /// Output channels.
    pub out_channels: usize,
    /// Kernel size for convolutions.
    pub kernel_size: usize,
    /// Dilation factor.
    pub dilation: usize,
    /// Dropout rate.
    pub dropout: f64,
}

impl TCNBlockConfig {
    /// Create a new TCN block config.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        dilation: usize,
    ) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            dilation,
            dropout: 0.2,
        }
    }

    /// Set dropout rate.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Initialize the block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TCNBlock<B> {
        TCNBlock::new(self.clone(), device)
    }
}

/// TCN residual block with causal dilated convolutions.
///
/// Structure:
/// ```text
/// Input -> Conv1 -> ReLU -> Dropout -> Conv2 -> ReLU -> Dropout -> Add -> ReLU
///   |                                                               ^
///   +-------------------- (1x1 conv if needed) ---------------------+
/// ```
#[derive(Module, Debug)]
pub struct TCNBlock<B: Backend> {
    /// First dilated convolution.
    conv1: Conv1d<B>,
    /// Second dilated convolution.
    conv2: Conv1d<B>,
    /// Dropout layer.
    dropout: Dropout,
    /// Residual connection (1x1 conv if channels differ).
    residual: Option<Conv1d<B>>,
}

impl<B: Backend> TCNBlock<B> {
    /// Create a new TCN block.
    pub fn new(config: TCNBlockConfig, device: &B::Device) -> Self {
        // Causal padding: (kernel_size - 1) * dilation, trimmed after each conv
        let padding = (config.kernel_size - 1) * config.dilation;

        let conv1 = Conv1dConfig::new(config.in_channels, config.out_channels, config.kernel_size)
            .with_dilation(config.dilation)
            .with_padding(PaddingConfig1d::Explicit(padding))
            .init(device);

        let conv2 = Conv1dConfig::new(config.out_channels, config.out_channels, config.kernel_size)
            .with_dilation(config.dilation)
            .with_padding(PaddingConfig1d::Explicit(padding))
            .init(device);

        let residual = (config.in_channels != config.out_channels)
            .then(|| Conv1dConfig::new(config.in_channels, config.out_channels, 1).init(device));

        Self {
            conv1,
            conv2,
            dropout: DropoutConfig::new(config.dropout).init(),
            residual,
        }
    }

    /// Forward pass over `(B, C, L)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, _, seq_len] = x.dims();

        let out = causal(self.conv1.forward(x.clone()), seq_len);
        let out = self.dropout.forward(Relu::new().forward(out));

        let out = causal(self.conv2.forward(out), seq_len);
        let out = self.dropout.forward(Relu::new().forward(out));

        let residual = match &self.residual {
            Some(conv) => conv.forward(x),
            None => x,
        };

        Relu::new().forward(out + residual)
    }
}

/// Drop the right-hand padding so step `t` only sees steps `<= t`.
fn causal<B: Backend>(x: Tensor<B, 3>, seq_len: usize) -> Tensor<B, 3> {
    let [batch, channels, _] = x.dims();
    x.slice([0..batch, 0..channels, 0..seq_len])
}

/// Configuration for the TCN forecasting network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TCNForecastNetConfig {
    /// Lookback length.
    pub past_seq_len: usize,
    /// Forecast horizon.
    pub future_seq_len: usize,
    /// Number of input features.
    pub input_feature_num: usize,
    /// Number of output features.
    pub output_feature_num: usize,
    /// Number of channels per layer.
    pub num_channels: Vec<usize>,
    /// Kernel size.
    pub kernel_size: usize,
    /// Dropout rate.
    pub dropout: f64,
}

impl TCNForecastNetConfig {
    /// Create a new config with default layer settings.
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
            num_channels: vec![30; 8],
            kernel_size: 7,
            dropout: 0.2,
        }
    }

    /// Set the number of channels per layer.
    #[must_use]
    pub fn with_channels(mut self, channels: Vec<usize>) -> Self {
        self.num_channels = channels;
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

    /// Calculate the receptive field.
    pub fn receptive_field(&self) -> usize {
        // Two convs per block, dilation doubling per block
        let dilation_sum: usize = (0..self.num_channels.len()).map(|i| 1 << i).sum();
        1 + 2 * self.kernel_size.saturating_sub(1) * dilation_sum
    }

    /// Check that the network can be built.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] for zero-sized dimensions,
    /// an empty channel list or a dropout outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("past_seq_len", self.past_seq_len),
            ("future_seq_len", self.future_seq_len),
            ("input_feature_num", self.input_feature_num),
            ("output_feature_num", self.output_feature_num),
            ("kernel_size", self.kernel_size),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(ModelError::InvalidConfig(format!("{} must be greater than 0", name)));
        }
        if self.num_channels.is_empty() || self.num_channels.contains(&0) {
            return Err(ModelError::InvalidConfig(format!(
                "num_channels must be non-empty with positive widths, got {:?}",
                self.num_channels
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    /// Initialize the model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TCNForecastNet<B> {
        TCNForecastNet::new(self.clone(), device)
    }
}

/// Temporal Convolutional Network for multi-step forecasting.
///
/// # Architecture
///
/// ```text
/// Input (B, L, F) -> transpose -> [TCN Block d=1] -> ... -> [TCN Block d=2^n]   (B, C, L)
///                 -> Linear over time (L -> H)                                  (B, C, H)
///                 -> transpose -> Linear over channels (C -> O)                 (B, H, O)
/// ```
///
/// # Example
///
/// ```rust,ignore
/// use chronos_models::TCNForecastNetConfig;
///
/// let config = TCNForecastNetConfig::new(24, 5, 3, 1)
///     .with_channels(vec![16, 16, 16])
///     .with_kernel_size(3);
/// let model = config.init::<NdArray>(&device);
///
/// let x = Tensor::random([32, 24, 3], Distribution::Normal(0.0, 1.0), &device);
/// let output = model.forward(x);
/// // output shape: [32, 5, 1]
/// ```
#[derive(Module, Debug)]
pub struct TCNForecastNet<B: Backend> {
    /// TCN blocks with increasing dilation.
    blocks: Vec<TCNBlock<B>>,
    /// Projection from lookback steps to horizon steps.
    time_proj: Linear<B>,
    /// Projection from the last channel width to the output features.
    head: Linear<B>,
}

impl<B: Backend> TCNForecastNet<B> {
    /// Create a new TCN forecasting network.
    pub fn new(config: TCNForecastNetConfig, device: &B::Device) -> Self {
        let mut blocks = Vec::with_capacity(config.num_channels.len());
        let mut in_channels = config.input_feature_num;

        for (i, &out_channels) in config.num_channels.iter().enumerate() {
            let dilation = 1 << i; // Exponential dilation: 1, 2, 4, 8, ...
            let block = TCNBlockConfig::new(in_channels, out_channels, config.kernel_size, dilation)
                .with_dropout(config.dropout)
                .init(device);
            blocks.push(block);
            in_channels = out_channels;
        }

        let time_proj = LinearConfig::new(config.past_seq_len, config.future_seq_len).init(device);
        let head = LinearConfig::new(in_channels, config.output_feature_num).init(device);

        Self {
            blocks,
            time_proj,
            head,
        }
    }

    /// Forward pass from `(B, past_seq_len, input_feature_num)` to
    /// `(B, future_seq_len, output_feature_num)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut out = x.swap_dims(1, 2);

        for block in &self.blocks {
            out = block.forward(out);
        }

        let out = self.time_proj.forward(out);
        self.head.forward(out.swap_dims(1, 2))
    }

    /// Get the number of residual blocks.
    pub fn num_layers(&self) -> usize {
        self.blocks.len()
    }
}
