use crate::catalog::{Counterbalance, TrialCatalog};
use crate::config::ExperimentConfig;
use crate::cue::CueOutput;
use crate::datalog::{DataLog, LogTarget};
use crate::participant::ParticipantId;
use crate::response::ResponseCollector;
use crate::runner::{RunnerConfig, RunnerEvent, SessionIo, Signal, TrialRunner};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rhex_core::Demographics;
use rhex_timing::Timer;
use rhex_video::{CaptureDiagnostics, CaptureStatus, CaptureWatchdog, Frame, VideoDelay};
use std::time::Duration;

/// Where a session sends questionnaires, data rows and cues
pub struct SessionOutputs {
    pub collector: Box<dyn ResponseCollector>,
    pub log: Box<dyn DataLog>,
    pub cues: Box<dyn CueOutput>,
}

/// Everything one participant's run needs, created at session start and
/// dropped at the end.
pub struct Session<T: Timer<Timestamp = u64> + Clone> {
    participant: ParticipantId,
    counterbalance: Counterbalance,
    seed: u64,
    runner: TrialRunner<T>,
    video: VideoDelay,
    watchdog: CaptureWatchdog<T>,
    diagnostics: CaptureDiagnostics<T>,
    outputs: SessionOutputs,
}

impl<T: Timer<Timestamp = u64> + Clone> Session<T> {
    /// Builds the trial queue, writes the demographics row and pulls the first trial.
    pub fn start(
        config: &ExperimentConfig,
        participant: ParticipantId,
        demographics: &Demographics,
        timer: T,
        mut outputs: SessionOutputs,
    ) -> Result<Self> {
        config.validate()?;

        let counterbalance = Counterbalance::resolve(config, participant.number());
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        log::info!(
            "session {participant}: group {}, {} first, seed {seed}",
            counterbalance.group,
            if counterbalance.self_first { "Self" } else { "Other" }
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let queue = TrialCatalog::new(config, counterbalance, &mut rng).build();

        let row = demographics.to_csv(
            &participant.to_string(),
            counterbalance.group,
            counterbalance.self_first,
            seed,
        );
        outputs
            .log
            .append(LogTarget::Demographics, &row)
            .context("writing demographics")?;

        let video = VideoDelay::new(config.video.nominal_fps, config.video.max_delay_s)
            .context("setting up video delay")?;
        let longest_s = config.longest_target_delay_ms() as f32 / 1000.0;
        if longest_s > config.video.max_delay_s {
            log::warn!(
                "trials ask for up to {longest_s:.3} s but video.max_delay_s is {:.3} s; longer delays are clamped",
                config.video.max_delay_s
            );
        }

        let timeout = Duration::try_from_secs_f32(config.video.capture_timeout_s)
            .context("video.capture_timeout_s")?;
        let watchdog = CaptureWatchdog::new(timer.clone(), timeout);
        let diagnostics = CaptureDiagnostics::new(timer.clone(), config.video.nominal_fps);
        let runner = TrialRunner::new(
            queue,
            RunnerConfig::from_experiment(config, participant.to_string()),
            timer,
        );

        let mut session = Self {
            participant,
            counterbalance,
            seed,
            runner,
            video,
            watchdog,
            diagnostics,
            outputs,
        };
        session.advance(Signal::Tick)?;
        Ok(session)
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn counterbalance(&self) -> Counterbalance {
        self.counterbalance
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn runner(&self) -> &TrialRunner<T> {
        &self.runner
    }

    pub fn video(&self) -> &VideoDelay {
        &self.video
    }

    pub fn is_finished(&self) -> bool {
        self.runner.is_finished()
    }

    /// Feeds one captured frame, in capture order.
    pub fn on_frame(&mut self, frame: &Frame) -> Result<CaptureStatus> {
        let status = self.video.on_frame(frame).context("buffering frame")?;
        if status == CaptureStatus::Ready {
            self.diagnostics.on_frame();
        }
        Ok(status)
    }

    pub fn present<'a>(&'a self, live: &'a Frame) -> Option<&'a Frame> {
        self.video.present(live)
    }

    pub fn capture_status(&self) -> CaptureStatus {
        self.video.status()
    }

    pub fn advance(&mut self, signal: Signal) -> Result<Vec<RunnerEvent>> {
        self.watchdog.check(&mut self.video);
        let mut io = SessionIo {
            video: &mut self.video,
            collector: self.outputs.collector.as_mut(),
            log: self.outputs.log.as_mut(),
            cues: self.outputs.cues.as_mut(),
        };
        self.runner.advance(signal, &mut io)
    }

    pub fn capture_summary(&self) -> String {
        self.diagnostics.summary()
    }

    /// Ends the session and hands the outputs back.
    pub fn finish(mut self) -> SessionOutputs {
        self.diagnostics.check_rate();
        log::info!(
            "session {} closed after {:.1} s: {} trials saved, capture {}",
            self.participant,
            self.runner.session_elapsed().as_secs_f32(),
            self.runner.trial_counter(),
            self.diagnostics.summary()
        );
        self.outputs
    }
}
