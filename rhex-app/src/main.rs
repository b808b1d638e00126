mod app;
mod camera;
mod console;

use anyhow::{Context, Result};
use app::App;
use console::{prompt_demographics, ConsoleCollector};
use rhex_experiment::{CsvSessionLog, ExperimentConfig, LogCues, ParticipantId, SessionOutputs};
use std::io;

/// `rhex-app [config.json] [participant]`
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ExperimentConfig::load(&path)?,
        None => {
            log::info!("no config given, using defaults");
            ExperimentConfig::default()
        }
    };

    let participant = match args.next() {
        Some(label) => ParticipantId::parse(&label)
            .with_context(|| format!("not a participant id: {label}"))?,
        None => ParticipantId::next(&config.data_root)?,
    };
    log::info!("participant {participant}");

    let demographics = prompt_demographics(&mut io::stdin().lock(), &mut io::stdout())?;
    let log = CsvSessionLog::create(&config.data_root, &participant.to_string())?;
    let outputs = SessionOutputs {
        collector: Box::new(ConsoleCollector::spawn()?),
        log: Box::new(log),
        cues: Box::new(LogCues),
    };

    App::new(&config, participant, &demographics, outputs)?.run()
}
