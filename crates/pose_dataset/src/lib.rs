//! Dataset adapter for the FLA visual-odometry sequences.
//!
//! This crate provides:
//! - Manifest-indexed (image, pose) samples
//! - The resize / center-crop / normalize transform pipeline
//! - A batch loader with a rayon worker pool and a bounded prefetch queue
//! - Upload of host batches to Burn tensors

pub mod dataset;
pub mod loader;
pub mod transform;
pub mod types;

pub use dataset::{load_pose, PoseDataset};
pub use loader::{BatchStream, DataLoader, HostBatch, LoaderConfig, PoseBatch};
pub use transform::{TransformPipeline, TransformPipelineBuilder};
pub use types::*;
