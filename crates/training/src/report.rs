use crate::metrics::MetricsSummary;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct EpochReport {
    /// 1-based.
    pub epoch: usize,
    pub epochs: usize,
    pub train: MetricsSummary,
    pub test: MetricsSummary,
    pub elapsed: Duration,
}

/// `{:.3E}` with a signed, two-digit exponent (`1.250E-02`, `2.500E+00`).
fn sci3(value: f64) -> String {
    let raw = format!("{value:.3E}");
    let Some((mantissa, exp)) = raw.split_once('E') else {
        return raw;
    };
    match exp.parse::<i32>() {
        Ok(exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}E{sign}{:02}", exp.unsigned_abs())
        }
        Err(_) => raw,
    }
}

impl fmt::Display for EpochReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch: {}/{}. Train: Loss {} / Error {:.3} | Test: Loss {} / Error {:.3}. Epoch time: {:.3} sec.",
            self.epoch,
            self.epochs,
            sci3(self.train.loss),
            self.train.error,
            sci3(self.test.loss),
            self.test.error,
            self.elapsed.as_secs_f64()
        )
    }
}
