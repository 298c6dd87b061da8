use models::ModelError;
use pose_dataset::DatasetError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Eval,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Train => f.write_str("train"),
            Phase::Eval => f.write_str("eval"),
        }
    }
}

/// Every variant is fatal for the run; nothing is retried.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("shape mismatch: reconstruction {recon:?} vs input {input:?}")]
    ShapeMismatch { recon: [usize; 4], input: [usize; 4] },
    #[error("device unavailable: {0}")]
    Device(String),
    #[error("non-finite {phase} loss ({value}) at epoch {epoch}, batch {batch}")]
    NonFinite {
        phase: Phase,
        epoch: usize,
        batch: usize,
        value: f64,
    },
    #[error("{phase} epoch {epoch} saw {received} of {expected} batches")]
    IncompleteEpoch {
        phase: Phase,
        epoch: usize,
        expected: usize,
        received: usize,
    },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
