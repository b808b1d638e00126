use serde::{Deserialize, Serialize};

/// Experiment blocks a trial can belong to
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialPhase {
    Practice,
    Threshold,
    Long,
}

/// Questionnaire shown after a stimulation window
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum ResponseForm {
    /// Binary synchrony judgement plus ownership and pleasantness sliders
    Threshold,
    /// Nine-item embodiment questionnaire
    Long,
}

impl TrialPhase {
    pub fn label(&self) -> &'static str {
        match self {
            TrialPhase::Practice => "Practice",
            TrialPhase::Threshold => "Threshold",
            TrialPhase::Long => "Long",
        }
    }

    pub fn is_practice(&self) -> bool {
        matches!(self, TrialPhase::Practice)
    }

    /// Whether the intrinsic pipeline latency is subtracted from the target delay.
    ///
    /// Threshold delays are applied raw so the staircase steps stay equally spaced.
    pub fn compensates_latency(&self) -> bool {
        !matches!(self, TrialPhase::Threshold)
    }

    pub fn response_form(&self) -> ResponseForm {
        match self {
            TrialPhase::Practice | TrialPhase::Threshold => ResponseForm::Threshold,
            TrialPhase::Long => ResponseForm::Long,
        }
    }
}

impl std::fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
