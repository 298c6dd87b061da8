//! Epoch loop states.

/// Epochs are 0-based here; reports print them 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    TrainingEpoch { epoch: usize },
    EvaluatingEpoch { epoch: usize },
    Reporting { epoch: usize },
    Done,
}

impl LoopState {
    pub fn advance(self, epochs: usize) -> Self {
        match self {
            LoopState::Idle if epochs == 0 => LoopState::Done,
            LoopState::Idle => LoopState::TrainingEpoch { epoch: 0 },
            LoopState::TrainingEpoch { epoch } => LoopState::EvaluatingEpoch { epoch },
            LoopState::EvaluatingEpoch { epoch } => LoopState::Reporting { epoch },
            LoopState::Reporting { epoch } if epoch + 1 < epochs => {
                LoopState::TrainingEpoch { epoch: epoch + 1 }
            }
            LoopState::Reporting { .. } | LoopState::Done => LoopState::Done,
        }
    }
}
