/// Stimulation boundaries signalled to the participant and to external recorders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    StimulationStart,
    StimulationEnd,
}

impl Cue {
    pub fn suffix(&self) -> &'static str {
        match self {
            Cue::StimulationStart => "Start",
            Cue::StimulationEnd => "End",
        }
    }
}

/// Plays a cue and forwards its marker, e.g. `Long_Self_Async_Start`.
pub trait CueOutput {
    fn cue(&mut self, cue: Cue, marker: &str);
}

/// Writes markers to the diagnostic log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCues;

impl CueOutput for LogCues {
    fn cue(&mut self, cue: Cue, marker: &str) {
        log::info!("cue {cue:?}: {marker}");
    }
}
