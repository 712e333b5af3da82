//! Batched iteration over a [`ForecastDataset`].

use burn::prelude::*;
use ndarray::{ArrayView3, Axis};
use rand::seq::SliceRandom;

use crate::dataset::ForecastDataset;
use crate::error::{DataError, Result};
use chronos_core::Seed;

/// A batch of inputs and targets as Burn tensors.
#[derive(Debug, Clone)]
pub struct ForecastBatch<B: Backend> {
    /// Inputs `(B, past_seq_len, input_feature_num)`.
    pub x: Tensor<B, 3>,
    /// Targets `(B, future_seq_len, output_feature_num)`.
    pub y: Tensor<B, 3>,
}

/// A dataloader that produces batches from a dataset.
///
/// # Example
///
/// ```rust,ignore
/// use chronos_data::{ForecastDataset, ForecastLoader};
/// use chronos_core::Seed;
///
/// let loader = ForecastLoader::builder(dataset)
///     .batch_size(32)
///     .shuffle(true)
///     .seed(Seed::new(42))
///     .build()?;
///
/// for batch in loader.iter::<NdArray>(&device) {
///     let batch = batch?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ForecastLoader {
    dataset: ForecastDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Seed,
}

impl ForecastLoader {
    /// Create a new dataloader builder.
    #[must_use]
    pub fn builder(dataset: ForecastDataset) -> ForecastLoaderBuilder {
        ForecastLoaderBuilder::new(dataset)
    }

    /// Get the dataset.
    #[must_use]
    pub fn dataset(&self) -> &ForecastDataset {
        &self.dataset
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Get the number of batches.
    #[must_use]
    pub fn n_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Create an iterator over batches using the loader seed.
    #[must_use]
    pub fn iter<B: Backend>(&self, device: &B::Device) -> ForecastLoaderIter<'_, B> {
        ForecastLoaderIter::new(self, self.seed, device.clone())
    }

    /// Create an iterator whose shuffle order depends on the epoch.
    #[must_use]
    pub fn iter_epoch<B: Backend>(
        &self,
        epoch: usize,
        device: &B::Device,
    ) -> ForecastLoaderIter<'_, B> {
        ForecastLoaderIter::new(self, self.seed.for_epoch(epoch), device.clone())
    }
}

/// Builder for [`ForecastLoader`].
#[derive(Debug)]
pub struct ForecastLoaderBuilder {
    dataset: ForecastDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Seed,
}

impl ForecastLoaderBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(dataset: ForecastDataset) -> Self {
        Self {
            dataset,
            batch_size: 32,
            shuffle: false,
            drop_last: false,
            seed: Seed::default(),
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable dropping the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the random seed for shuffling.
    #[must_use]
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Build the dataloader.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size is zero.
    pub fn build(self) -> Result<ForecastLoader> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        Ok(ForecastLoader {
            dataset: self.dataset,
            batch_size: self.batch_size,
            shuffle: self.shuffle,
            drop_last: self.drop_last,
            seed: self.seed,
        })
    }
}

/// Iterator over batches from a [`ForecastLoader`].
pub struct ForecastLoaderIter<'a, B: Backend> {
    loader: &'a ForecastLoader,
    device: B::Device,
    indices: Vec<usize>,
    current_batch: usize,
    n_batches: usize,
}

impl<'a, B: Backend> ForecastLoaderIter<'a, B> {
    fn new(loader: &'a ForecastLoader, seed: Seed, device: B::Device) -> Self {
        let mut indices: Vec<usize> = (0..loader.dataset.len()).collect();
        if loader.shuffle {
            indices.shuffle(&mut seed.to_rng());
        }

        Self {
            loader,
            device,
            indices,
            current_batch: 0,
            n_batches: loader.n_batches(),
        }
    }

    fn create_batch(&self, indices: &[usize]) -> Result<ForecastBatch<B>> {
        let dataset = &self.loader.dataset;
        let x = dataset.x().select(Axis(0), indices);
        let y = dataset.y().select(Axis(0), indices);

        Ok(ForecastBatch {
            x: to_tensor(x.view(), &self.device),
            y: to_tensor(y.view(), &self.device),
        })
    }
}

impl<B: Backend> Iterator for ForecastLoaderIter<'_, B> {
    type Item = Result<ForecastBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_batch >= self.n_batches {
            return None;
        }

        let start = self.current_batch * self.loader.batch_size;
        let end = std::cmp::min(start + self.loader.batch_size, self.indices.len());
        self.current_batch += 1;

        Some(self.create_batch(&self.indices[start..end]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_batches - self.current_batch;
        (remaining, Some(remaining))
    }
}

impl<B: Backend> ExactSizeIterator for ForecastLoaderIter<'_, B> {}

/// Convert an `(N, L, F)` array into a Burn tensor on `device`.
#[must_use]
pub fn to_tensor<B: Backend>(array: ArrayView3<'_, f32>, device: &B::Device) -> Tensor<B, 3> {
    let (n, l, f) = array.dim();
    let data: Vec<f32> = array.iter().copied().collect();
    Tensor::from_data(burn::tensor::TensorData::new(data, [n, l, f]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ndarray::Array3;

    type B = NdArray;

    fn dataset(n: usize) -> ForecastDataset {
        let x = Array3::from_shape_fn((n, 4, 2), |(i, _, _)| i as f32);
        let y = Array3::from_shape_fn((n, 3, 1), |(i, _, _)| i as f32);
        ForecastDataset::new(x, y).unwrap()
    }

    #[test]
    fn test_n_batches() {
        let loader = ForecastLoader::builder(dataset(10)).batch_size(4).build().unwrap();
        assert_eq!(loader.n_batches(), 3);

        let loader = ForecastLoader::builder(dataset(10))
            .batch_size(4)
            .drop_last(true)
            .build()
            .unwrap();
        assert_eq!(loader.n_batches(), 2);
    }

    #[test]
    fn test_zero_batch_size() {
        let err = ForecastLoader::builder(dataset(4)).batch_size(0).build();
        assert!(matches!(err, Err(DataError::InvalidBatchSize(_))));
    }

    #[test]
    fn test_batch_shapes() {
        let loader = ForecastLoader::builder(dataset(10)).batch_size(4).build().unwrap();
        let device = Default::default();
        let batches: Vec<_> = loader
            .iter::<B>(&device)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].x.dims(), [4, 4, 2]);
        assert_eq!(batches[0].y.dims(), [4, 3, 1]);
        assert_eq!(batches[2].x.dims(), [2, 4, 2]);
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let device = Default::default();
        let first_values = |seed: u64| -> Vec<f32> {
            let loader = ForecastLoader::builder(dataset(16))
                .batch_size(16)
                .shuffle(true)
                .seed(Seed::new(seed))
                .build()
                .unwrap();
            let batch = loader.iter::<B>(&device).next().unwrap().unwrap();
            let data: Vec<f32> = batch.y.into_data().to_vec().unwrap();
            data.iter().step_by(3).copied().collect()
        };

        let a = first_values(1);
        let b = first_values(1);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_by(|l, r| l.partial_cmp(r).unwrap());
        assert_eq!(sorted, (0..16).map(|i| i as f32).collect::<Vec<_>>());
    }
}
