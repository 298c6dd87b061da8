use crate::ContractError;
use serde::{Deserialize, Serialize};

/// Single-channel normalization applied after pixels are scaled to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub mean: f32,
    pub std: f32,
}

impl Default for NormalizeStats {
    fn default() -> Self {
        Self {
            mean: 0.45,
            std: 0.25,
        }
    }
}

impl NormalizeStats {
    pub fn validate(&self) -> Result<(), ContractError> {
        if !self.mean.is_finite() {
            return Err(ContractError::InvalidMean(self.mean));
        }
        if !self.std.is_finite() || self.std <= 0.0 {
            return Err(ContractError::InvalidStd(self.std));
        }
        Ok(())
    }

    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        (v - self.mean) / self.std
    }
}
