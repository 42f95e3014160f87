use std::sync::Arc;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::spectrogram::{SpecDataset, SpecDatasetOptions, SpecMode};
use super::{check_index, DatasetView};
use crate::core::config::Config;
use crate::core::effects::SharedEffects;

pub const DEFAULT_VAL_SIZE: usize = 10;
const DEFAULT_SEED: u64 = 0;

/// Shuffles `0..len` with `seed` and cuts off the last `n_val` indices as
/// the validation part.
pub fn random_split(len: usize, n_val: usize, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if n_val > len {
        bail!("cannot hold out {n_val} validation items from a dataset of {len}");
    }
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let val = indices.split_off(len - n_val);
    Ok((indices, val))
}

/// A dataset view restricted to a list of indices.
pub struct Subset<D> {
    dataset: Arc<D>,
    indices: Vec<usize>,
}

impl<D: DatasetView> Subset<D> {
    pub fn new(dataset: Arc<D>, indices: Vec<usize>) -> Result<Self> {
        for &index in &indices {
            check_index(index, dataset.len())?;
        }
        Ok(Self { dataset, indices })
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl<D: DatasetView> DatasetView for Subset<D> {
    type Item = D::Item;

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Result<D::Item> {
        check_index(index, self.len())?;
        self.dataset.get(self.indices[index])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Fit,
    Test,
}

/// Train/validation/test views over `JSSS_spec` for a training loop.
pub struct SpecDataModule {
    config: Config,
    effects: SharedEffects,
    options: SpecDatasetOptions,
    val_size: usize,
    seed: u64,
    train: Option<Subset<SpecDataset>>,
    val: Option<Subset<SpecDataset>>,
    test: Option<Arc<SpecDataset>>,
}

impl SpecDataModule {
    #[must_use]
    pub fn new(config: Config, effects: SharedEffects, options: SpecDatasetOptions) -> Self {
        Self {
            config,
            effects,
            options,
            val_size: DEFAULT_VAL_SIZE,
            seed: DEFAULT_SEED,
            train: None,
            val: None,
            test: None,
        }
    }

    #[must_use]
    pub fn with_split(mut self, val_size: usize, seed: u64) -> Self {
        self.val_size = val_size;
        self.seed = seed;
        self
    }

    /// Builds the views for `stage`, or for every stage when `None`.
    pub fn setup(&mut self, stage: Option<Stage>) -> Result<()> {
        if matches!(stage, None | Some(Stage::Fit)) {
            let options = SpecDatasetOptions {
                mode: SpecMode::Train,
                ..self.options.clone()
            };
            let dataset = Arc::new(SpecDataset::new(&self.config, &self.effects, options)?);
            let (train, val) = random_split(dataset.len(), self.val_size, self.seed)?;
            debug!(train = train.len(), val = val.len(), "split dataset");
            self.train = Some(Subset::new(Arc::clone(&dataset), train)?);
            self.val = Some(Subset::new(dataset, val)?);
        }
        if matches!(stage, None | Some(Stage::Test)) {
            let options = SpecDatasetOptions {
                mode: SpecMode::Eval,
                ..self.options.clone()
            };
            self.test = Some(Arc::new(SpecDataset::new(
                &self.config,
                &self.effects,
                options,
            )?));
        }
        Ok(())
    }

    #[must_use]
    pub fn train(&self) -> Option<&Subset<SpecDataset>> {
        self.train.as_ref()
    }

    #[must_use]
    pub fn val(&self) -> Option<&Subset<SpecDataset>> {
        self.val.as_ref()
    }

    #[must_use]
    pub fn test(&self) -> Option<&SpecDataset> {
        self.test.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn split_is_a_seeded_partition() {
        let (train, val) = random_split(50, 10, 7).unwrap();
        assert_eq!(train.len(), 40);
        assert_eq!(val.len(), 10);
        let all: BTreeSet<_> = train.iter().chain(&val).copied().collect();
        assert_eq!(all, (0..50).collect());

        assert_eq!(random_split(50, 10, 7).unwrap(), (train, val.clone()));
        assert_ne!(random_split(50, 10, 8).unwrap().1, val);
    }

    #[test]
    fn oversized_validation_is_rejected() {
        assert!(random_split(5, 10, 0).is_err());
        assert_eq!(random_split(3, 3, 0).unwrap().0, Vec::<usize>::new());
    }

    struct Numbers(usize);

    impl DatasetView for Numbers {
        type Item = usize;

        fn len(&self) -> usize {
            self.0
        }

        fn get(&self, index: usize) -> Result<usize> {
            check_index(index, self.0)?;
            Ok(index * 10)
        }
    }

    #[test]
    fn subset_maps_through_indices() {
        let subset = Subset::new(Arc::new(Numbers(5)), vec![4, 1]).unwrap();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.get(0).unwrap(), 40);
        assert_eq!(subset.get(1).unwrap(), 10);
        let err = subset.get(2).unwrap_err();
        assert_eq!(
            err.downcast_ref::<crate::core::errors::DatasetError>(),
            Some(&crate::core::errors::DatasetError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(Subset::new(Arc::new(Numbers(2)), vec![2]).is_err());
    }
}
