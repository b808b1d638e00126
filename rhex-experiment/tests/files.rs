use rhex_experiment::{CsvSessionLog, DataLog, LogTarget, ParticipantId};
use std::fs;

#[test]
fn session_files_start_with_headers_and_append_rows() {
    let root = tempfile::tempdir().unwrap();
    let mut log = CsvSessionLog::create(root.path(), "P012").unwrap();
    assert_eq!(log.dir(), root.path().join("P012"));

    log.append(LogTarget::Events, "0.000,Threshold,Threshold_Self_0,Trial_Start,Intention,0.000")
        .unwrap();
    log.append(LogTarget::Events, "2.000,Threshold,Threshold_Self_0,Stimulation_Start,Visuals_On,0.000")
        .unwrap();

    let events = fs::read_to_string(log.path(LogTarget::Events).unwrap()).unwrap();
    let lines: Vec<_> = events.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Timestamp,Phase,TrialID,Event,Data,AppliedDelay");
    assert!(lines[2].contains("Stimulation_Start"));

    let long = fs::read_to_string(log.path(LogTarget::Long).unwrap()).unwrap();
    assert_eq!(long.lines().count(), 1);
    assert!(long.starts_with("ParticipantID,TrialOrder,TrialID,OwnerCondition,DelayType,Q1"));
}

#[test]
fn session_files_are_named_by_participant_and_kind() {
    let root = tempfile::tempdir().unwrap();
    let log = CsvSessionLog::create(root.path(), "P003").unwrap();
    for target in LogTarget::ALL {
        let name = log
            .path(target)
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with(&format!("P003_{}_", target.file_stem())), "{name}");
        assert!(name.ends_with(".csv"));
        // P003_<Kind>_yyyy-MM-dd_HH-mm-ss.csv
        let stamp = &name[name.len() - 4 - 19..name.len() - 4];
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], "_");
    }
}

#[test]
fn next_participant_skips_existing_folders() {
    let root = tempfile::tempdir().unwrap();
    assert_eq!(ParticipantId::next(root.path()).unwrap(), ParticipantId::new(1));

    fs::create_dir(root.path().join("P001")).unwrap();
    fs::create_dir(root.path().join("P004")).unwrap();
    fs::create_dir(root.path().join("Pilot")).unwrap();
    fs::write(root.path().join("P009"), "not a folder").unwrap();

    let next = ParticipantId::next(root.path()).unwrap();
    assert_eq!(next.to_string(), "P005");
}

#[test]
fn missing_root_starts_at_one() {
    let root = tempfile::tempdir().unwrap();
    let next = ParticipantId::next(root.path().join("absent")).unwrap();
    assert_eq!(next.number(), 1);
}
