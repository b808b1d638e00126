use anyhow::{Context, Result};
use rhex_core::{Demographics, EventRow, LongRow, ThresholdRow};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The four per-session CSV outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTarget {
    Events,
    Threshold,
    Long,
    Demographics,
}

impl LogTarget {
    pub const ALL: [LogTarget; 4] = [
        LogTarget::Events,
        LogTarget::Threshold,
        LogTarget::Long,
        LogTarget::Demographics,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            LogTarget::Events => EventRow::HEADER,
            LogTarget::Threshold => ThresholdRow::HEADER,
            LogTarget::Long => LongRow::HEADER,
            LogTarget::Demographics => Demographics::HEADER,
        }
    }

    /// Kind segment of the file name
    pub fn file_stem(&self) -> &'static str {
        match self {
            LogTarget::Events => "Events",
            LogTarget::Threshold => "ThresholdData",
            LogTarget::Long => "LongData",
            LogTarget::Demographics => "Demographics",
        }
    }
}

/// Append-only sink for data rows. Rows must land in call order.
pub trait DataLog {
    fn append(&mut self, target: LogTarget, row: &str) -> Result<()>;
}

/// One CSV file per target under `<root>/<participant>/`, each row flushed on write.
#[derive(Debug)]
pub struct CsvSessionLog {
    dir: PathBuf,
    files: HashMap<LogTarget, (PathBuf, File)>,
}

impl CsvSessionLog {
    /// Creates the participant folder and all four files with their headers.
    pub fn create(root: impl AsRef<Path>, participant_id: &str) -> Result<Self> {
        let dir = root.as_ref().join(participant_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating participant folder {}", dir.display()))?;

        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        let mut files = HashMap::new();
        for target in LogTarget::ALL {
            let path = dir.join(format!(
                "{participant_id}_{}_{stamp}.csv",
                target.file_stem()
            ));
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            if file.metadata()?.len() == 0 {
                writeln!(file, "{}", target.header())
                    .with_context(|| format!("writing header to {}", path.display()))?;
                file.flush()?;
            }
            files.insert(target, (path, file));
        }

        log::info!("writing session data to {}", dir.display());
        Ok(Self { dir, files })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, target: LogTarget) -> Option<&Path> {
        self.files.get(&target).map(|(path, _)| path.as_path())
    }
}

impl DataLog for CsvSessionLog {
    fn append(&mut self, target: LogTarget, row: &str) -> Result<()> {
        let (path, file) = self
            .files
            .get_mut(&target)
            .with_context(|| format!("no open file for {target:?}"))?;
        writeln!(file, "{row}").with_context(|| format!("appending to {}", path.display()))?;
        file.flush()
            .with_context(|| format!("flushing {}", path.display()))?;
        Ok(())
    }
}

/// In-memory log; clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    rows: Arc<Mutex<Vec<(LogTarget, String)>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, target: LogTarget) -> Vec<String> {
        match self.rows.lock() {
            Ok(rows) => rows
                .iter()
                .filter(|(t, _)| *t == target)
                .map(|(_, row)| row.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataLog for MemoryLog {
    fn append(&mut self, target: LogTarget, row: &str) -> Result<()> {
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("memory log poisoned"))?
            .push((target, row.to_owned()));
        Ok(())
    }
}
