//! Core types and error definitions for pose_dataset.

use data_contracts::{ContractError, RelativePose};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest parse error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid data in {path}: {source}")]
    Contract {
        path: PathBuf,
        #[source]
        source: ContractError,
    },
    #[error("manifest {path} lists no samples")]
    EmptyManifest { path: PathBuf },
    #[error("manifest {manifest} references missing file {file}")]
    MissingFile { manifest: PathBuf, file: PathBuf },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("center crop {crop_w}x{crop_h} exceeds image {width}x{height}")]
    CropTooLarge {
        crop_w: u32,
        crop_h: u32,
        width: u32,
        height: u32,
    },
    #[error(
        "batch mixes image sizes: expected {expected_w}x{expected_h}, sample {index} is {width}x{height}"
    )]
    InconsistentSize {
        index: usize,
        expected_w: u32,
        expected_h: u32,
        width: u32,
        height: u32,
    },
    #[error("sample index {index} out of range ({len} samples)")]
    OutOfRange { index: usize, len: usize },
    #[error("batch loading failed: {0}")]
    Producer(String),
    #[error("failed to build loader worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("{0}")]
    Config(String),
}

/// Which frame of a manifest row a loader reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSlot {
    #[default]
    Source,
    Target,
}

#[derive(Debug, Clone)]
pub struct PoseSample {
    /// Row index in the manifest.
    pub index: usize,
    /// Single-channel image in CHW layout, after the transform pipeline.
    pub image_chw: Vec<f32>,
    pub width: u32,
    pub height: u32,
    pub pose: RelativePose,
}
