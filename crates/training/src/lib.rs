#![recursion_limit = "256"]

pub mod config;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod report;
pub mod state;
pub mod trainer;
pub mod util;

pub use config::{Precision, RunDevice, TrainConfig};
pub use error::{Phase, TrainError};
pub use metrics::{BatchMean, EpochMetrics, MetricsSummary, StepOutcome};
pub use models::{ConvAutoencoder, ConvAutoencoderConfig};
pub use report::EpochReport;
pub use state::LoopState;
pub use trainer::{check_finite, eval_step, Trainer};
pub use util::{run, run_train, validate_device_choice, TrainArgs};

/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
