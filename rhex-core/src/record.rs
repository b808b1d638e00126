use crate::csv;
use crate::phase::TrialPhase;
use serde::{Deserialize, Serialize};

/// One phase transition in the events log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    /// Seconds since session start
    pub timestamp_s: f64,
    pub phase: TrialPhase,
    pub trial_id: String,
    pub event: String,
    pub data: String,
    pub applied_delay_s: f32,
}

impl EventRow {
    pub const HEADER: &'static str = "Timestamp,Phase,TrialID,Event,Data,AppliedDelay";

    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            csv::seconds(self.timestamp_s),
            self.phase.label(),
            csv::field(&self.trial_id),
            csv::field(&self.event),
            csv::field(&self.data),
            csv::seconds(self.applied_delay_s as f64),
        )
    }
}

/// Saved answer for a threshold trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRow {
    pub participant_id: String,
    pub trial_order: u32,
    pub trial_id: String,
    pub owner_condition: String,
    pub delay_ms: u32,
    /// Comma-joined `Q_SyncBinary,Q_Ownership,Q_Pleasantness` as returned by the form
    pub answers: String,
}

impl ThresholdRow {
    pub const HEADER: &'static str = "ParticipantID,TrialOrder,TrialID,OwnerCondition,DelayMS,Q_SyncBinary,Q_Ownership,Q_Pleasantness";

    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            csv::field(&self.participant_id),
            self.trial_order,
            csv::field(&self.trial_id),
            self.owner_condition,
            self.delay_ms,
            self.answers,
        )
    }
}

/// Saved answer for a long-exposure trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRow {
    pub participant_id: String,
    pub trial_order: u32,
    pub trial_id: String,
    pub owner_condition: String,
    pub delay_type: String,
    /// Comma-joined `Q1..Q9`
    pub answers: String,
}

impl LongRow {
    pub const HEADER: &'static str =
        "ParticipantID,TrialOrder,TrialID,OwnerCondition,DelayType,Q1,Q2,Q3,Q4,Q5,Q6,Q7,Q8,Q9";

    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            csv::field(&self.participant_id),
            self.trial_order,
            csv::field(&self.trial_id),
            self.owner_condition,
            self.delay_type,
            self.answers,
        )
    }
}

/// Participant demographics collected once before the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u32,
    pub years_education: u32,
    pub gender: String,
    pub handedness: String,
    pub ethnicity: String,
    pub alcohol_freq: String,
    pub cannabis_freq: String,
}

impl Default for Demographics {
    fn default() -> Self {
        Self {
            age: 0,
            years_education: 0,
            gender: "NA".into(),
            handedness: "NA".into(),
            ethnicity: "NA".into(),
            alcohol_freq: "NA".into(),
            cannabis_freq: "NA".into(),
        }
    }
}

impl Demographics {
    pub const HEADER: &'static str = "ParticipantID,Age,YearsEducation,Gender,Handedness,Ethnicity,AlcoholFreq,CannabisFreq,LatinSquareGroup,SelfFirst,Seed";

    /// Counterbalancing and seed are stored with the demographics so a
    /// session's trial order can be regenerated later.
    pub fn to_csv(&self, participant_id: &str, group: usize, self_first: bool, seed: u64) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            csv::field(participant_id),
            self.age,
            self.years_education,
            csv::field(&self.gender),
            csv::field(&self.handedness),
            csv::field(&self.ethnicity),
            csv::field(&self.alcohol_freq),
            csv::field(&self.cannabis_freq),
            group,
            self_first,
            seed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_row_formats_seconds_and_delay() {
        let row = EventRow {
            timestamp_s: 12.4351,
            phase: TrialPhase::Long,
            trial_id: "Long_Self_Async".into(),
            event: "Stimulation_Start".into(),
            data: "Visuals_On".into(),
            applied_delay_s: 0.866,
        };
        assert_eq!(
            row.to_csv(),
            "12.435,Long,Long_Self_Async,Stimulation_Start,Visuals_On,0.866"
        );
    }

    #[test]
    fn answers_pass_through_verbatim() {
        let row = ThresholdRow {
            participant_id: "P004".into(),
            trial_order: 7,
            trial_id: "Threshold_Other_66".into(),
            owner_condition: "Other".into(),
            delay_ms: 66,
            answers: "1,0.45,0.80".into(),
        };
        assert_eq!(row.to_csv(), "P004,7,Threshold_Other_66,Other,66,1,0.45,0.80");
    }

    #[test]
    fn header_columns_match_row_width() {
        assert_eq!(LongRow::HEADER.split(',').count(), 14);
        assert_eq!(ThresholdRow::HEADER.split(',').count(), 8);
    }

    #[test]
    fn demographics_quote_free_text() {
        let d = Demographics {
            age: 31,
            ethnicity: "Mixed, other".into(),
            ..Default::default()
        };
        let line = d.to_csv("P001", 2, true, 99);
        assert_eq!(line, "P001,31,0,NA,NA,\"Mixed, other\",NA,NA,2,true,99");
    }
}
