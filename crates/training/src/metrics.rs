//! Per-epoch metric accumulation.

use serde::Serialize;

/// Loss/error of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepOutcome {
    pub loss: f64,
    pub error: f64,
}

/// Unweighted mean over batches: each push adds `value / num_batches`, whatever the
/// batch's sample count. A short final batch counts as much as a full one.
#[derive(Debug, Clone, Copy)]
pub struct BatchMean {
    weight: f64,
    value: f64,
    count: usize,
}

impl BatchMean {
    pub fn new(num_batches: usize) -> Self {
        let weight = if num_batches == 0 {
            0.0
        } else {
            1.0 / num_batches as f64
        };
        Self {
            weight,
            value: 0.0,
            count: 0,
        }
    }

    pub fn push(&mut self, batch_value: f64) {
        self.value += self.weight * batch_value;
        self.count += 1;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub loss: f64,
    pub error: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct EpochMetrics {
    loss: BatchMean,
    error: BatchMean,
}

impl EpochMetrics {
    pub fn new(num_batches: usize) -> Self {
        Self {
            loss: BatchMean::new(num_batches),
            error: BatchMean::new(num_batches),
        }
    }

    pub fn push(&mut self, step: StepOutcome) {
        self.loss.push(step.loss);
        self.error.push(step.error);
    }

    pub fn batches(&self) -> usize {
        self.loss.count()
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            loss: self.loss.value(),
            error: self.error.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_batches_average_without_size_weighting() {
        // Batch sizes 32, 32, 5 are irrelevant: only the batch count matters.
        let (a, b, c) = (0.9, 0.3, 0.03);
        let mut mean = BatchMean::new(3);
        for v in [a, b, c] {
            mean.push(v);
        }
        assert!((mean.value() - (a + b + c) / 3.0).abs() < 1e-12);
        assert_eq!(mean.count(), 3);
    }

    #[test]
    fn empty_loader_reports_zero() {
        let metrics = EpochMetrics::new(0);
        assert_eq!(metrics.summary(), MetricsSummary::default());
        assert_eq!(metrics.batches(), 0);
    }

    #[test]
    fn epoch_metrics_track_loss_and_error_separately() {
        let mut metrics = EpochMetrics::new(2);
        metrics.push(StepOutcome {
            loss: 1.0,
            error: 0.5,
        });
        metrics.push(StepOutcome {
            loss: 3.0,
            error: 1.5,
        });
        let summary = metrics.summary();
        assert!((summary.loss - 2.0).abs() < 1e-12);
        assert!((summary.error - 1.0).abs() < 1e-12);
    }
}
