//! Shared data contracts for split manifests, relative poses, and image normalization.

pub mod manifest;
pub mod pose;
pub mod preprocess;

pub use manifest::ManifestRow;
pub use pose::RelativePose;
pub use preprocess::NormalizeStats;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ContractError {
    #[error("manifest row {row}: empty `{field}` column")]
    EmptyField { row: usize, field: &'static str },
    #[error("pose expects 12 or 16 values, found {0}")]
    PoseLength(usize),
    #[error("pose value `{0}` is not a number")]
    PoseToken(String),
    #[error("pose contains a non-finite value")]
    NonFinitePose,
    #[error("4x4 pose must end with `0 0 0 1`, found {0:?}")]
    PoseHomogeneousRow([f32; 4]),
    #[error("pose rotation is not orthonormal (max deviation {0:.2e})")]
    NotOrthonormal(f32),
    #[error("normalization std must be positive and finite, got {0}")]
    InvalidStd(f32),
    #[error("normalization mean must be finite, got {0}")]
    InvalidMean(f32),
}
