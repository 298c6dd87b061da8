//! Relative SE(3) transform between the two frames of a manifest row.

use crate::ContractError;
use serde::{Deserialize, Serialize};

const ORTHONORMAL_TOL: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativePose {
    pub rotation: [[f32; 3]; 3],
    pub translation: [f32; 3],
}

impl Default for RelativePose {
    fn default() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }
}

impl RelativePose {
    /// Parse 12 (row-major `[R|t]`) or 16 (row-major 4x4) whitespace-separated values.
    pub fn parse(text: &str) -> Result<Self, ContractError> {
        let values = text
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f32>()
                    .map_err(|_| ContractError::PoseToken(tok.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match values.len() {
            12 => {}
            16 => {
                let last = [values[12], values[13], values[14], values[15]];
                if last != [0.0, 0.0, 0.0, 1.0] {
                    return Err(ContractError::PoseHomogeneousRow(last));
                }
            }
            n => return Err(ContractError::PoseLength(n)),
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ContractError::NonFinitePose);
        }
        let mut pose = RelativePose::default();
        for r in 0..3 {
            for c in 0..3 {
                pose.rotation[r][c] = values[r * 4 + c];
            }
            pose.translation[r] = values[r * 4 + 3];
        }
        pose.validate()?;
        Ok(pose)
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        let finite = self.rotation.iter().flatten().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite());
        if !finite {
            return Err(ContractError::NonFinitePose);
        }
        // R * R^T should be the identity.
        let mut max_dev = 0.0f32;
        for i in 0..3 {
            for j in 0..3 {
                let dot: f32 = (0..3)
                    .map(|k| self.rotation[i][k] * self.rotation[j][k])
                    .sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                max_dev = max_dev.max((dot - expected).abs());
            }
        }
        if max_dev > ORTHONORMAL_TOL {
            return Err(ContractError::NotOrthonormal(max_dev));
        }
        Ok(())
    }

    /// Row-major `[R|t]`, 12 values.
    pub fn as_flat(&self) -> [f32; 12] {
        let mut out = [0.0; 12];
        for r in 0..3 {
            out[r * 4..r * 4 + 3].copy_from_slice(&self.rotation[r]);
            out[r * 4 + 3] = self.translation[r];
        }
        out
    }
}
