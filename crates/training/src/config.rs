//! Explicit run configuration handed to the trainer and loaders.

use crate::error::TrainError;
use cli_support::DatasetLocation;
use pose_dataset::{FrameSlot, LoaderConfig};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunDevice {
    Cpu,
    /// GPU through the WGPU backend (requires the `backend-wgpu` feature).
    Accelerator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Precision {
    F32,
    F64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size_train: usize,
    pub batch_size_test: usize,
    pub lr: f64,
    pub num_workers: usize,
    pub device: RunDevice,
    pub precision: Precision,
    pub seed: Option<u64>,
    pub progress: bool,
    pub location: DatasetLocation,
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.batch_size_train == 0 || self.batch_size_test == 0 {
            return Err(TrainError::Config("batch sizes must be > 0".into()));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(TrainError::Config(format!(
                "learning rate must be positive, got {}",
                self.lr
            )));
        }
        Ok(())
    }

    /// Shuffled, keeps the short final batch.
    pub fn train_loader(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size_train,
            shuffle: true,
            seed: self.seed,
            drop_last: false,
            num_workers: self.num_workers,
            frame: FrameSlot::Source,
        }
    }

    /// Fixed order, keeps the short final batch.
    pub fn test_loader(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size_test,
            shuffle: false,
            seed: self.seed,
            drop_last: false,
            num_workers: self.num_workers,
            frame: FrameSlot::Source,
        }
    }
}
