use rhex_core::{Demographics, ResponseForm};
use rhex_experiment::{
    ExperimentConfig, LogCues, LogTarget, MemoryLog, ParticipantId, ResponseCollector,
    ResponseHandle, RunnerEvent, Session, SessionOutputs, Signal,
};
use rhex_timing::ManualTimer;
use rhex_video::{CaptureStatus, Frame, FrameSize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Default)]
struct OpenForms(Rc<RefCell<VecDeque<ResponseHandle>>>);

impl ResponseCollector for OpenForms {
    fn show(&mut self, handle: ResponseHandle) {
        self.0.borrow_mut().push_back(handle);
    }
}

impl OpenForms {
    fn answer_next(&self) -> bool {
        let Some(handle) = self.0.borrow_mut().pop_front() else {
            return false;
        };
        let answers = match handle.form() {
            ResponseForm::Threshold => "1,0.50,0.25",
            ResponseForm::Long => "5,5,4,3,2,1,0,1,2",
        };
        handle.submit(answers)
    }

    fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

struct Harness {
    clock: ManualTimer,
    forms: OpenForms,
    log: MemoryLog,
    session: Session<ManualTimer>,
}

fn short_config() -> ExperimentConfig {
    ExperimentConfig {
        practice_trials: 1,
        threshold_steps: 2,
        threshold_repetitions: 1,
        practice_duration_s: 1.0,
        threshold_duration_s: 1.0,
        long_duration_s: 2.0,
        isi_s: 0.5,
        seed: Some(7),
        ..Default::default()
    }
}

fn start(config: &ExperimentConfig, participant: u32) -> Harness {
    let clock = ManualTimer::new();
    let forms = OpenForms::default();
    let log = MemoryLog::new();
    let outputs = SessionOutputs {
        collector: Box::new(forms.clone()),
        log: Box::new(log.clone()),
        cues: Box::new(LogCues),
    };
    let session = Session::start(
        config,
        ParticipantId::new(participant),
        &Demographics::default(),
        clock.clone(),
        outputs,
    )
    .unwrap();
    Harness {
        clock,
        forms,
        log,
        session,
    }
}

impl Harness {
    fn tick(&mut self, secs: f64) -> Vec<RunnerEvent> {
        self.clock.advance_secs(secs);
        self.session.advance(Signal::Tick).unwrap()
    }

    fn run_trial(&mut self) -> Vec<RunnerEvent> {
        let duration = self.session.runner().current_trial().unwrap().duration_s as f64;
        let mut events = self.session.advance(Signal::Proceed).unwrap();
        events.extend(self.tick(0.5));
        events.extend(self.tick(duration));
        assert!(self.forms.answer_next());
        events.extend(self.tick(0.0));
        events
    }

    fn run_all(&mut self) {
        while !self.session.is_finished() {
            self.run_trial();
        }
    }

    fn trial_ids(&self) -> Vec<String> {
        let runner = self.session.runner();
        runner
            .current_trial()
            .into_iter()
            .chain(runner.upcoming())
            .map(|t| t.id.clone())
            .collect()
    }
}

#[test]
fn full_session_saves_every_non_practice_trial_in_order() {
    let mut h = start(&short_config(), 3);
    assert_eq!(h.session.runner().progress(), (1, 9));
    h.run_all();

    assert_eq!(h.session.runner().trial_counter(), 8);
    let threshold = h.log.rows(LogTarget::Threshold);
    let long = h.log.rows(LogTarget::Long);
    assert_eq!(threshold.len(), 4);
    assert_eq!(long.len(), 4);

    let orders: Vec<u32> = threshold
        .iter()
        .chain(long.iter())
        .map(|row| row.split(',').nth(1).unwrap().parse().unwrap())
        .collect();
    assert_eq!(orders, (1..=8).collect::<Vec<_>>());

    // participant 3: group 2, Self first
    let long_ids: Vec<&str> = long.iter().map(|r| r.split(',').nth(2).unwrap()).collect();
    assert_eq!(
        long_ids,
        vec!["Long_Other_Sync", "Long_Other_Async", "Long_Self_Async", "Long_Self_Sync"]
    );
    assert!(threshold[..2].iter().all(|r| r.contains(",Self,")));
    assert!(threshold[2..].iter().all(|r| r.contains(",Other,")));

    // practice has no Data_Saved row
    assert_eq!(h.log.rows(LogTarget::Events).len(), 3 + 8 * 4);
    assert_eq!(h.forms.len(), 0);
}

#[test]
fn demographics_row_records_counterbalance_and_seed() {
    let h = start(&short_config(), 6);
    let rows = h.log.rows(LogTarget::Demographics);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("P006,"));
    assert!(rows[0].ends_with(",1,false,7"));
}

#[test]
fn abort_leaves_no_data_and_moves_on() {
    let mut h = start(
        &ExperimentConfig {
            include_practice: false,
            ..short_config()
        },
        1,
    );
    let first = h.session.runner().current_trial().unwrap().id.clone();
    h.session.advance(Signal::Proceed).unwrap();
    h.tick(0.5);
    assert!(h.session.video().is_visible());
    h.clock.advance_secs(0.25);
    let events = h.session.advance(Signal::Abort).unwrap();

    assert_eq!(events[0], RunnerEvent::TrialAborted);
    assert!(!h.session.video().is_visible());
    assert_eq!(h.forms.len(), 0);
    assert!(h.log.rows(LogTarget::Threshold).is_empty());
    assert_ne!(h.session.runner().current_trial().unwrap().id, first);

    let events: Vec<String> = h.log.rows(LogTarget::Events);
    assert_eq!(events.len(), 3);
    assert!(events[2].contains(&format!("{first},Trial_Aborted,Researcher")));

    h.run_all();
    assert_eq!(h.session.runner().trial_counter(), 7);
    assert_eq!(h.session.runner().aborted(), 1);
}

#[test]
fn same_seed_same_trial_order() {
    let a = start(&short_config(), 2);
    let b = start(&short_config(), 2);
    assert_eq!(a.trial_ids(), b.trial_ids());
    assert_eq!(a.session.seed(), 7);
}

#[test]
fn capture_timeout_degrades_to_no_video() {
    let config = ExperimentConfig {
        include_practice: false,
        ..short_config()
    };
    let mut h = start(&config, 1);
    assert_eq!(h.session.capture_status(), CaptureStatus::Waiting);

    let placeholder = Frame::new(FrameSize::new(16, 16));
    assert_eq!(h.session.on_frame(&placeholder).unwrap(), CaptureStatus::Waiting);

    h.tick(11.0);
    assert_eq!(h.session.capture_status(), CaptureStatus::Unavailable);

    // trials still run and save
    h.run_trial();
    assert_eq!(h.session.runner().trial_counter(), 1);
    let live = Frame::new(FrameSize::new(320, 240));
    assert!(h.session.present(&live).is_none());
}

#[test]
fn preview_shows_live_video_before_trial() {
    let mut h = start(&short_config(), 1);
    let mut live = Frame::new(FrameSize::new(320, 240));
    live.set_sequence(42);
    assert_eq!(h.session.on_frame(&live).unwrap(), CaptureStatus::Ready);
    assert!(h.session.present(&live).is_none());

    let events = h.session.advance(Signal::TogglePreview).unwrap();
    assert_eq!(events, vec![RunnerEvent::PreviewToggled(true)]);
    assert_eq!(h.session.present(&live).unwrap().sequence(), 42);
}
