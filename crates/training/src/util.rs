use burn::backend::Autodiff;
use burn::module::Module;
use burn::optim::AdamConfig;
use burn::tensor::backend::AutodiffBackend;
use cli_support::DatasetLocationArgs;
use clap::Parser;
use models::{ConvAutoencoder, ConvAutoencoderConfig};
use pose_dataset::{DataLoader, PoseDataset, TransformPipeline};

use crate::config::{Precision, RunDevice, TrainConfig};
use crate::error::TrainError;
use crate::report::EpochReport;
use crate::trainer::Trainer;

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train the FLA convolutional autoencoder")]
pub struct TrainArgs {
    /// Number of epochs.
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,
    /// Evaluation batch size.
    #[arg(long = "batch_size_test", alias = "batch-size-test", default_value_t = 64)]
    pub batch_size_test: usize,
    /// Training batch size.
    #[arg(long = "batch_size_train", alias = "batch-size-train", default_value_t = 32)]
    pub batch_size_train: usize,
    /// Train on the accelerator (WGPU backend; needs the backend-wgpu feature).
    #[arg(long, default_value_t = false)]
    pub cuda: bool,
    /// Data loader worker threads.
    #[arg(long = "num_workers", alias = "num-workers", default_value_t = 4)]
    pub num_workers: usize,
    /// Adam learning rate.
    #[arg(long, default_value_t = 5e-4)]
    pub lr: f64,
    /// Use f64 tensors instead of f32.
    #[arg(long, default_value_t = false)]
    pub double: bool,
    /// Seed for parameter init and shuffling.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Hide the per-epoch progress bar.
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
    #[command(flatten)]
    pub location: DatasetLocationArgs,
}

impl TrainArgs {
    pub fn to_config(&self) -> TrainConfig {
        TrainConfig {
            epochs: self.epochs,
            batch_size_train: self.batch_size_train,
            batch_size_test: self.batch_size_test,
            lr: self.lr,
            num_workers: self.num_workers,
            device: if self.cuda {
                RunDevice::Accelerator
            } else {
                RunDevice::Cpu
            },
            precision: if self.double {
                Precision::F64
            } else {
                Precision::F32
            },
            seed: self.seed,
            progress: !self.no_progress,
            location: self.location.resolve(),
        }
    }
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let cfg = args.to_config();
    tracing::info!(?cfg, "resolved training configuration");
    run(&cfg)?;
    Ok(())
}

/// Reject device/precision combinations this build cannot serve.
pub fn validate_device_choice(device: RunDevice, precision: Precision) -> Result<(), TrainError> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (device, precision, built_wgpu) {
        (RunDevice::Accelerator, _, false) => Err(TrainError::Device(
            "accelerator requested but this build lacks the backend-wgpu feature; rebuild with --features backend-wgpu or drop --cuda".into(),
        )),
        (RunDevice::Accelerator, Precision::F64, true) => Err(TrainError::Device(
            "the WGPU backend does not support f64 tensors; drop --double".into(),
        )),
        _ => Ok(()),
    }
}

/// Pick the backend once from the configuration and run every epoch on it.
pub fn run(cfg: &TrainConfig) -> Result<Vec<EpochReport>, TrainError> {
    cfg.validate()?;
    validate_device_choice(cfg.device, cfg.precision)?;
    match (cfg.device, cfg.precision) {
        (RunDevice::Cpu, Precision::F32) => {
            run_on::<Autodiff<burn_ndarray::NdArray<f32>>>(cfg, Default::default())
        }
        (RunDevice::Cpu, Precision::F64) => {
            run_on::<Autodiff<burn_ndarray::NdArray<f64>>>(cfg, Default::default())
        }
        #[cfg(feature = "backend-wgpu")]
        (RunDevice::Accelerator, Precision::F32) => {
            run_on::<Autodiff<burn_wgpu::Wgpu<f32>>>(cfg, Default::default())
        }
        (device, precision) => Err(TrainError::Device(format!(
            "no backend for {device:?}/{precision:?}"
        ))),
    }
}

fn run_on<B: AutodiffBackend>(
    cfg: &TrainConfig,
    device: B::Device,
) -> Result<Vec<EpochReport>, TrainError> {
    if let Some(seed) = cfg.seed {
        B::seed(seed);
    }

    let loc = &cfg.location;
    let pipeline = TransformPipeline::default();
    tracing::info!(transform = %pipeline.describe(), "image pipeline");

    let train_set = PoseDataset::from_manifest(
        &loc.train_manifest,
        &loc.image_dir,
        &loc.pose_dir,
        pipeline.clone(),
    )?;
    let test_set =
        PoseDataset::from_manifest(&loc.test_manifest, &loc.image_dir, &loc.pose_dir, pipeline)?;
    let train_loader = DataLoader::new(train_set, cfg.train_loader())?;
    let test_loader = DataLoader::new(test_set, cfg.test_loader())?;
    tracing::info!(
        train_samples = train_loader.num_samples(),
        train_batches = train_loader.len(),
        test_samples = test_loader.num_samples(),
        test_batches = test_loader.len(),
        "datasets ready"
    );
    tracing::debug!(
        train = ?train_loader.config(),
        test = ?test_loader.config(),
        "loader configs"
    );

    let model = ConvAutoencoder::<B>::new(ConvAutoencoderConfig::default(), &device);
    tracing::info!(params = model.num_params(), device = ?device, "model initialized");
    let optim = AdamConfig::new().init::<B, ConvAutoencoder<B>>();

    let mut trainer = Trainer::new(model, optim, cfg.lr, device).with_progress(cfg.progress);
    trainer.run(&train_loader, &test_loader, cfg.epochs, |report| {
        println!("{report}")
    })
}
