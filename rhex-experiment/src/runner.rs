use crate::catalog::TrialQueue;
use crate::config::ExperimentConfig;
use crate::cue::{Cue, CueOutput};
use crate::datalog::{DataLog, LogTarget};
use crate::response::{response_pair, ResponseCollector, ResponseTicket, TicketStatus};
use anyhow::Result;
use rhex_core::{EventRow, LongRow, ResponseForm, ThresholdRow, TrialDescriptor, TrialPhase, TrialState};
use rhex_timing::Timer;
use rhex_video::VideoDelay;
use std::time::Duration;

/// Input fed to the runner once per host-loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Nothing happened besides time passing
    Tick,
    Proceed,
    TogglePreview,
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    TrialReady { trial_id: String },
    TrialStarted { trial_id: String, applied_delay_s: f32 },
    PreviewToggled(bool),
    StimulationStarted,
    StimulationEnded,
    ResponseRequested(ResponseForm),
    TrialSaved { trial_order: u32 },
    PracticeCompleted,
    TrialAborted,
    SessionComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub isi: Duration,
    pub latency_s: f32,
    pub isi_abortable: bool,
    pub participant_id: String,
}

impl RunnerConfig {
    pub fn from_experiment(config: &ExperimentConfig, participant_id: impl Into<String>) -> Self {
        Self {
            isi: config.isi(),
            latency_s: config.estimated_system_latency_s,
            isi_abortable: config.isi_abortable,
            participant_id: participant_id.into(),
        }
    }
}

/// Collaborators the runner drives during one `advance` call
pub struct SessionIo<'a> {
    pub video: &'a mut VideoDelay,
    pub collector: &'a mut dyn ResponseCollector,
    pub log: &'a mut dyn DataLog,
    pub cues: &'a mut dyn CueOutput,
}

/// Runs the queued trials one at a time.
///
/// Every wait (researcher input, ISI, stimulation, questionnaire) is a state
/// checked on each `advance`; nothing blocks. A session starts in `Done` with
/// no current trial, so the first `advance` pulls trial one.
pub struct TrialRunner<T: Timer<Timestamp = u64>> {
    config: RunnerConfig,
    timer: T,
    queue: TrialQueue,
    session_start: u64,
    state: TrialState,
    state_entered: u64,
    current: Option<TrialDescriptor>,
    applied_delay_s: f32,
    ticket: Option<ResponseTicket>,
    /// Answers taken from the ticket but not yet fully written
    pending_answers: Option<String>,
    /// Order of the data row already written for the current trial
    saved_order: Option<u32>,
    abandon_reported: bool,
    trial_counter: u32,
    aborted: u32,
    finished: bool,
}

impl<T: Timer<Timestamp = u64>> TrialRunner<T> {
    pub fn new(queue: TrialQueue, config: RunnerConfig, timer: T) -> Self {
        let now = timer.now();
        Self {
            config,
            timer,
            queue,
            session_start: now,
            state: TrialState::Done,
            state_entered: now,
            current: None,
            applied_delay_s: 0.0,
            ticket: None,
            pending_answers: None,
            saved_order: None,
            abandon_reported: false,
            trial_counter: 0,
            aborted: 0,
            finished: false,
        }
    }

    /// Delay to commit to the video so the perceived delay matches `target_s`.
    /// Threshold trials show the raw target.
    pub fn applied_delay(phase: TrialPhase, target_s: f32, latency_s: f32) -> f32 {
        if phase.compensates_latency() {
            (target_s - latency_s).max(0.0)
        } else {
            target_s
        }
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn current_trial(&self) -> Option<&TrialDescriptor> {
        self.current.as_ref()
    }

    /// Trials not yet pulled, in run order
    pub fn upcoming(&self) -> impl Iterator<Item = &TrialDescriptor> {
        self.queue.iter()
    }

    /// Saved non-practice trials so far; also the order of the last saved row
    pub fn trial_counter(&self) -> u32 {
        self.trial_counter
    }

    pub fn aborted(&self) -> u32 {
        self.aborted
    }

    pub fn applied_delay_s(&self) -> f32 {
        self.applied_delay_s
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `(started, total)` trials
    pub fn progress(&self) -> (usize, usize) {
        let total = self.queue.total();
        (total - self.queue.len(), total)
    }

    pub fn session_elapsed(&self) -> Duration {
        self.timer.elapsed(self.session_start)
    }

    /// Applies `signal`, then keeps stepping while states complete without
    /// further input.
    pub fn advance(&mut self, signal: Signal, io: &mut SessionIo<'_>) -> Result<Vec<RunnerEvent>> {
        let mut events = Vec::new();
        let mut pending = Some(signal);
        while self.step(pending.take().unwrap_or(Signal::Tick), io, &mut events)? {}
        Ok(events)
    }

    /// Returns true when the state changed.
    fn step(&mut self, signal: Signal, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<bool> {
        match (self.state, signal) {
            (TrialState::Done, _) => self.pull_next(io, events),

            (TrialState::AwaitingReady, Signal::Proceed) => {
                self.begin_trial(io, events)?;
                Ok(true)
            }
            (TrialState::AwaitingReady, Signal::TogglePreview) => {
                let on = io.video.toggle_preview();
                log::info!("preview {}", if on { "on" } else { "off" });
                events.push(RunnerEvent::PreviewToggled(on));
                Ok(false)
            }

            (TrialState::Isi, Signal::Abort) if self.config.isi_abortable => {
                self.abort(io, events)?;
                Ok(true)
            }
            (TrialState::Isi, _) => {
                if self.in_state() < self.config.isi {
                    return Ok(false);
                }
                self.start_stimulation(io, events)?;
                Ok(true)
            }

            (TrialState::Stimulating, Signal::Abort) => {
                self.abort(io, events)?;
                Ok(true)
            }
            (TrialState::Stimulating, _) => {
                let duration = self
                    .current
                    .as_ref()
                    .and_then(|t| Duration::try_from_secs_f32(t.duration_s).ok())
                    .unwrap_or(Duration::ZERO);
                if self.in_state() < duration {
                    return Ok(false);
                }
                self.end_stimulation(io, events)?;
                Ok(true)
            }

            (TrialState::AwaitingResponse, _) => self.poll_response(io, events),

            (state, other) => {
                log::debug!("{other:?} ignored in {state:?}");
                Ok(false)
            }
        }
    }

    fn in_state(&self) -> Duration {
        self.timer.elapsed(self.state_entered)
    }

    fn enter(&mut self, state: TrialState) {
        log::debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
        self.state_entered = self.timer.now();
    }

    fn log_event(&self, io: &mut SessionIo<'_>, event: &str, data: &str) -> Result<()> {
        let Some(trial) = &self.current else {
            return Ok(());
        };
        let row = EventRow {
            timestamp_s: self.session_elapsed().as_secs_f64(),
            phase: trial.phase,
            trial_id: trial.id.clone(),
            event: event.to_owned(),
            data: data.to_owned(),
            applied_delay_s: self.applied_delay_s,
        };
        io.log.append(LogTarget::Events, &row.to_csv())
    }

    fn pull_next(&mut self, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        let previous_was_practice = self.current.take().is_some_and(|t| t.is_practice);
        self.ticket = None;
        self.pending_answers = None;
        self.saved_order = None;
        self.abandon_reported = false;
        self.applied_delay_s = 0.0;

        let Some(next) = self.queue.pop() else {
            self.finished = true;
            log::info!(
                "session complete: {} trials saved, {} aborted",
                self.trial_counter,
                self.aborted
            );
            events.push(RunnerEvent::SessionComplete);
            return Ok(false);
        };

        if previous_was_practice && !next.is_practice {
            log::info!("practice complete");
            events.push(RunnerEvent::PracticeCompleted);
        }

        io.video.hide();
        let (started, total) = self.progress();
        log::info!("trial {started}/{total} ready: {}", next.id);
        events.push(RunnerEvent::TrialReady {
            trial_id: next.id.clone(),
        });
        self.current = Some(next);
        self.enter(TrialState::AwaitingReady);
        Ok(true)
    }

    fn begin_trial(&mut self, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<()> {
        let Some(trial) = &self.current else {
            return Ok(());
        };
        io.video.set_preview(false);
        let applied = Self::applied_delay(trial.phase, trial.target_delay_s(), self.config.latency_s);
        io.video.set_delay(applied);
        self.applied_delay_s = io.video.delay_s();
        if self.applied_delay_s < applied {
            log::warn!(
                "{} wants {applied:.3} s but the ring holds {:.3} s",
                trial.id,
                self.applied_delay_s
            );
        }
        log::info!(
            "{} started, target {:.3} s, applied {:.3} s",
            trial.id,
            trial.target_delay_s(),
            self.applied_delay_s
        );
        events.push(RunnerEvent::TrialStarted {
            trial_id: trial.id.clone(),
            applied_delay_s: self.applied_delay_s,
        });
        self.log_event(io, "Trial_Start", "Intention")?;
        self.enter(TrialState::Isi);
        Ok(())
    }

    fn marker(&self, cue: Cue) -> String {
        self.current
            .as_ref()
            .map(|t| format!("{}_{}", t.marker_stem(), cue.suffix()))
            .unwrap_or_default()
    }

    fn start_stimulation(&mut self, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<()> {
        io.cues.cue(Cue::StimulationStart, &self.marker(Cue::StimulationStart));
        io.video.show();
        self.log_event(io, "Stimulation_Start", "Visuals_On")?;
        events.push(RunnerEvent::StimulationStarted);
        self.enter(TrialState::Stimulating);
        Ok(())
    }

    fn end_stimulation(&mut self, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<()> {
        io.video.hide();
        io.cues.cue(Cue::StimulationEnd, &self.marker(Cue::StimulationEnd));
        self.log_event(io, "Stimulation_End", "Visuals_Off")?;
        events.push(RunnerEvent::StimulationEnded);

        let form = self
            .current
            .as_ref()
            .map_or(ResponseForm::Threshold, |t| t.phase.response_form());
        let (handle, ticket) = response_pair(form);
        self.ticket = Some(ticket);
        self.abandon_reported = false;
        io.collector.show(handle);
        events.push(RunnerEvent::ResponseRequested(form));
        self.enter(TrialState::AwaitingResponse);
        Ok(())
    }

    fn abort(&mut self, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<()> {
        io.video.hide();
        self.log_event(io, "Trial_Aborted", "Researcher")?;
        if let Some(trial) = &self.current {
            log::warn!("{} aborted by researcher", trial.id);
        }
        self.aborted += 1;
        events.push(RunnerEvent::TrialAborted);
        self.enter(TrialState::Done);
        Ok(())
    }

    /// A failed write keeps the answers, and the next `advance` retries the save.
    fn poll_response(&mut self, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<bool> {
        if self.pending_answers.is_none() {
            let status = match &self.ticket {
                Some(ticket) => ticket.poll(),
                None => TicketStatus::Abandoned,
            };
            match status {
                TicketStatus::Pending => return Ok(false),
                TicketStatus::Abandoned => {
                    if !self.abandon_reported {
                        log::error!(
                            "response form for {} was closed without an answer; still waiting",
                            self.current.as_ref().map_or("?", |t| t.id.as_str())
                        );
                        self.abandon_reported = true;
                    }
                    return Ok(false);
                }
                TicketStatus::Answered(answers) => self.pending_answers = Some(answers),
            }
        }

        let answers = self.pending_answers.clone().unwrap_or_default();
        self.save(&answers, io, events)?;
        self.pending_answers = None;
        self.saved_order = None;
        self.enter(TrialState::Done);
        Ok(true)
    }

    fn save(&mut self, answers: &str, io: &mut SessionIo<'_>, events: &mut Vec<RunnerEvent>) -> Result<()> {
        let Some(trial) = &self.current else {
            return Ok(());
        };
        if trial.is_practice {
            log::info!("{} answered (practice, not saved)", trial.id);
            return Ok(());
        }

        if let Some(trial_order) = self.saved_order {
            self.log_event(io, "Data_Saved", trial.phase.label())?;
            events.push(RunnerEvent::TrialSaved { trial_order });
            return Ok(());
        }

        let trial_order = self.trial_counter + 1;
        let participant_id = self.config.participant_id.clone();
        match trial.phase {
            TrialPhase::Long => {
                let row = LongRow {
                    participant_id,
                    trial_order,
                    trial_id: trial.id.clone(),
                    owner_condition: trial.actor.label().to_owned(),
                    delay_type: trial.synchrony().label().to_owned(),
                    answers: answers.to_owned(),
                };
                io.log.append(LogTarget::Long, &row.to_csv())?;
            }
            _ => {
                let row = ThresholdRow {
                    participant_id,
                    trial_order,
                    trial_id: trial.id.clone(),
                    owner_condition: trial.actor.label().to_owned(),
                    delay_ms: trial.delay_ms,
                    answers: answers.to_owned(),
                };
                io.log.append(LogTarget::Threshold, &row.to_csv())?;
            }
        }
        self.trial_counter = trial_order;
        self.saved_order = Some(trial_order);
        self.log_event(io, "Data_Saved", trial.phase.label())?;
        log::info!("{} saved as trial {trial_order}", trial.id);
        events.push(RunnerEvent::TrialSaved { trial_order });
        Ok(())
    }
}
