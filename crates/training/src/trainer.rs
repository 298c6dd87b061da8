//! Train/evaluate loop over the autoencoder.

use crate::error::{Phase, TrainError};
use crate::loss::{reconstruction_error, reconstruction_loss, scalar};
use crate::metrics::{EpochMetrics, StepOutcome};
use crate::report::EpochReport;
use crate::state::LoopState;
use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use indicatif::{ProgressBar, ProgressStyle};
use models::ConvAutoencoder;
use pose_dataset::DataLoader;
use std::time::Instant;

pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ConvAutoencoder<B>, B>,
{
    model: ConvAutoencoder<B>,
    optim: O,
    lr: f64,
    device: B::Device,
    progress: bool,
    epoch: usize,
    batch: usize,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ConvAutoencoder<B>, B>,
{
    pub fn new(model: ConvAutoencoder<B>, optim: O, lr: f64, device: B::Device) -> Self {
        Self {
            model,
            optim,
            lr,
            device,
            progress: false,
            epoch: 0,
            batch: 0,
        }
    }

    /// Draw a per-epoch progress bar on stderr.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn model(&self) -> &ConvAutoencoder<B> {
        &self.model
    }

    pub fn into_model(self) -> ConvAutoencoder<B> {
        self.model
    }

    /// Backpropagate `loss` and apply one Adam update. Gradients are taken fresh from
    /// this loss only, so nothing accumulates across batches.
    pub fn optimizer_step(&mut self, loss: Tensor<B, 1>) {
        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self.optim.step(self.lr, self.model.clone(), grads);
    }

    /// Forward, loss, backward, and update on one batch.
    pub fn train_step(&mut self, images: Tensor<B, 4>) -> Result<StepOutcome, TrainError> {
        let recon = self.model.try_forward(images.clone())?;
        let error = scalar(reconstruction_error(recon.clone().detach(), images.clone())?);
        let loss = reconstruction_loss(recon, images)?;
        let value = scalar(loss.clone().detach());
        check_finite(Phase::Train, self.epoch, self.batch, value)?;
        self.optimizer_step(loss);
        Ok(StepOutcome { loss: value, error })
    }

    pub fn train_epoch(
        &mut self,
        loader: &DataLoader,
        epoch: usize,
    ) -> Result<EpochMetrics, TrainError> {
        let num_batches = loader.len();
        let mut metrics = EpochMetrics::new(num_batches);
        let bar = self.progress_bar(num_batches as u64, epoch);
        self.epoch = epoch;
        for (batch, host) in loader.iter(epoch as u64)?.enumerate() {
            let host = host?;
            self.batch = batch;
            let images = host.to_burn::<B>(&self.device).images;
            let step = self.train_step(images)?;
            metrics.push(step);
            bar.inc(1);
        }
        bar.finish_and_clear();
        check_complete(Phase::Train, epoch, &metrics, num_batches)?;
        Ok(metrics)
    }

    /// Evaluate on the inner backend: parameters frozen, no autodiff graph.
    pub fn evaluate(&self, loader: &DataLoader, epoch: usize) -> Result<EpochMetrics, TrainError> {
        let model = self.model.valid();
        let num_batches = loader.len();
        let mut metrics = EpochMetrics::new(num_batches);
        for (batch, host) in loader.iter(epoch as u64)?.enumerate() {
            let host = host?;
            let images = host.to_burn::<B::InnerBackend>(&self.device).images;
            let step = eval_step(&model, images)?;
            check_finite(Phase::Eval, epoch, batch, step.loss)?;
            metrics.push(step);
        }
        check_complete(Phase::Eval, epoch, &metrics, num_batches)?;
        Ok(metrics)
    }

    /// Run `epochs` train/evaluate/report cycles, handing each report to `sink`.
    pub fn run<F>(
        &mut self,
        train: &DataLoader,
        test: &DataLoader,
        epochs: usize,
        mut sink: F,
    ) -> Result<Vec<EpochReport>, TrainError>
    where
        F: FnMut(&EpochReport),
    {
        let mut reports = Vec::with_capacity(epochs);
        let mut state = LoopState::Idle;
        let mut started = Instant::now();
        let mut train_metrics = EpochMetrics::new(0);
        let mut test_metrics = EpochMetrics::new(0);

        loop {
            state = state.advance(epochs);
            tracing::debug!(?state, "loop state");
            match state {
                LoopState::Idle => {}
                LoopState::TrainingEpoch { epoch } => {
                    started = Instant::now();
                    train_metrics = self.train_epoch(train, epoch)?;
                }
                LoopState::EvaluatingEpoch { epoch } => {
                    test_metrics = self.evaluate(test, epoch)?;
                }
                LoopState::Reporting { epoch } => {
                    let report = EpochReport {
                        epoch: epoch + 1,
                        epochs,
                        train: train_metrics.summary(),
                        test: test_metrics.summary(),
                        elapsed: started.elapsed(),
                    };
                    sink(&report);
                    reports.push(report);
                }
                LoopState::Done => break,
            }
        }
        Ok(reports)
    }

    fn progress_bar(&self, len: u64, epoch: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{prefix} [{bar:40}] {pos}/{len} batches {elapsed_precise}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(format!("epoch {}", epoch + 1));
        bar
    }
}

/// Fail with [`TrainError::NonFinite`] unless `loss` is finite.
pub fn check_finite(
    phase: Phase,
    epoch: usize,
    batch: usize,
    loss: f64,
) -> Result<(), TrainError> {
    if loss.is_finite() {
        return Ok(());
    }
    Err(TrainError::NonFinite {
        phase,
        epoch,
        batch,
        value: loss,
    })
}

/// The per-batch mean divides by the loader's batch count, so every batch must arrive.
fn check_complete(
    phase: Phase,
    epoch: usize,
    metrics: &EpochMetrics,
    expected: usize,
) -> Result<(), TrainError> {
    let received = metrics.batches();
    if received == expected {
        return Ok(());
    }
    Err(TrainError::IncompleteEpoch {
        phase,
        epoch,
        expected,
        received,
    })
}

/// Loss and error of `model` on one batch.
pub fn eval_step<B: Backend>(
    model: &ConvAutoencoder<B>,
    images: Tensor<B, 4>,
) -> Result<StepOutcome, TrainError> {
    let recon = model.try_forward(images.clone())?;
    let loss = scalar(reconstruction_loss(recon.clone(), images.clone())?);
    let error = scalar(reconstruction_error(recon, images)?);
    Ok(StepOutcome { loss, error })
}
