use crate::condition::{Actor, Synchrony};
use crate::phase::TrialPhase;
use serde::{Deserialize, Serialize};

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// Waiting for the researcher to proceed
    AwaitingReady,
    /// Inter-stimulus interval before the video is shown
    Isi,
    Stimulating,
    AwaitingResponse,
    Done,
}

/// One scheduled trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDescriptor {
    pub id: String,
    pub phase: TrialPhase,
    pub actor: Actor,
    /// Target perceived delay
    pub delay_ms: u32,
    pub duration_s: f32,
    pub is_practice: bool,
    /// Condition a long trial was built for; other phases derive it from the delay
    #[serde(default)]
    pub long_synchrony: Option<Synchrony>,
}

impl TrialDescriptor {
    /// `number` is 1-based and keeps practice labels unique.
    pub fn practice(number: usize, duration_s: f32) -> Self {
        Self {
            id: format!("Practice_Self_0_{number}"),
            phase: TrialPhase::Practice,
            actor: Actor::Participant,
            delay_ms: 0,
            duration_s,
            is_practice: true,
            long_synchrony: None,
        }
    }

    pub fn threshold(actor: Actor, delay_ms: u32, duration_s: f32) -> Self {
        Self {
            id: format!("Threshold_{}_{}", actor.label(), delay_ms),
            phase: TrialPhase::Threshold,
            actor,
            delay_ms,
            duration_s,
            is_practice: false,
            long_synchrony: None,
        }
    }

    pub fn long(actor: Actor, synchrony: Synchrony, async_delay_ms: u32, duration_s: f32) -> Self {
        let delay_ms = match synchrony {
            Synchrony::Sync => 0,
            Synchrony::Async => async_delay_ms,
        };
        Self {
            id: format!("Long_{}_{}", actor.label(), synchrony.label()),
            phase: TrialPhase::Long,
            actor,
            delay_ms,
            duration_s,
            is_practice: false,
            long_synchrony: Some(synchrony),
        }
    }

    pub fn target_delay_s(&self) -> f32 {
        self.delay_ms as f32 / 1000.0
    }

    pub fn synchrony(&self) -> Synchrony {
        self.long_synchrony
            .unwrap_or_else(|| Synchrony::from_delay_ms(self.delay_ms))
    }

    /// Marker stem sent alongside the stimulation cues, e.g. `Long_Other_Async`
    /// or `Threshold_Self_132`.
    pub fn marker_stem(&self) -> String {
        match self.phase {
            TrialPhase::Long => format!(
                "{}_{}_{}",
                self.phase.label(),
                self.actor.label(),
                self.synchrony().label()
            ),
            _ => format!(
                "{}_{}_{}",
                self.phase.label(),
                self.actor.label(),
                self.delay_ms
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_carry_phase_actor_and_delay() {
        let t = TrialDescriptor::threshold(Actor::Experimenter, 132, 5.0);
        assert_eq!(t.id, "Threshold_Other_132");
        assert_eq!(t.marker_stem(), "Threshold_Other_132");

        let l = TrialDescriptor::long(Actor::Participant, Synchrony::Async, 1000, 60.0);
        assert_eq!(l.id, "Long_Self_Async");
        assert_eq!(l.delay_ms, 1000);
        assert_eq!(l.marker_stem(), "Long_Self_Async");
    }

    #[test]
    fn sync_long_trial_has_zero_delay() {
        let l = TrialDescriptor::long(Actor::Experimenter, Synchrony::Sync, 1000, 60.0);
        assert_eq!(l.delay_ms, 0);
        assert_eq!(l.synchrony(), Synchrony::Sync);
    }

    #[test]
    fn async_label_survives_zero_async_delay() {
        let l = TrialDescriptor::long(Actor::Participant, Synchrony::Async, 0, 60.0);
        assert_eq!(l.id, "Long_Self_Async");
        assert_eq!(l.delay_ms, 0);
        assert_eq!(l.synchrony(), Synchrony::Async);
        assert_eq!(l.marker_stem(), "Long_Self_Async");
    }

    #[test]
    fn practice_trials_are_flagged() {
        let p = TrialDescriptor::practice(2, 5.0);
        assert!(p.is_practice);
        assert_eq!(p.id, "Practice_Self_0_2");
        assert_eq!(p.target_delay_s(), 0.0);
    }
}
