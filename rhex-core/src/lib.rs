pub mod condition;
pub mod csv;
pub mod phase;
pub mod record;
pub mod trial;

pub use condition::{Actor, LongCondition, Synchrony};
pub use phase::{ResponseForm, TrialPhase};
pub use record::{Demographics, EventRow, LongRow, ThresholdRow};
pub use trial::{TrialDescriptor, TrialState};
