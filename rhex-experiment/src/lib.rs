pub mod catalog;
pub mod config;
pub mod cue;
pub mod datalog;
pub mod participant;
pub mod response;
pub mod runner;
pub mod session;

pub use catalog::{Counterbalance, TrialCatalog, TrialQueue, LATIN_SQUARE};
pub use config::{ConfigError, ExperimentConfig, LongBlockMode, VideoConfig};
pub use cue::{Cue, CueOutput, LogCues};
pub use datalog::{CsvSessionLog, DataLog, LogTarget, MemoryLog};
pub use participant::ParticipantId;
pub use response::{response_pair, ResponseCollector, ResponseHandle, ResponseTicket, TicketStatus};
pub use runner::{RunnerConfig, RunnerEvent, SessionIo, Signal, TrialRunner};
pub use session::{Session, SessionOutputs};
