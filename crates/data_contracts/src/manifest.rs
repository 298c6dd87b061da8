use crate::ContractError;
use serde::{Deserialize, Serialize};

/// One row of a split manifest CSV.
///
/// `source` and `target` are consecutive frames of the sequence, relative to the
/// image directory; `pose` names the relative-pose file inside the pose directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub source: String,
    pub target: String,
    pub pose: String,
}

impl ManifestRow {
    /// `row` is the 1-based data row (header excluded), used only for messages.
    pub fn validate(&self, row: usize) -> Result<(), ContractError> {
        for (field, value) in [
            ("source", &self.source),
            ("target", &self.target),
            ("pose", &self.pose),
        ] {
            if value.trim().is_empty() {
                return Err(ContractError::EmptyField { row, field });
            }
        }
        Ok(())
    }
}
