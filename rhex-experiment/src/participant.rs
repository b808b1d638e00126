use crate::catalog::Counterbalance;
use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

/// Participant label `P###`, also the name of the data folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId {
    number: u32,
}

impl ParticipantId {
    pub fn new(number: u32) -> Self {
        Self { number }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Accepts `P007`, `p7` or a bare number.
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text
            .trim()
            .strip_prefix(['P', 'p'])
            .unwrap_or(text.trim());
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self::new)
    }

    /// One past the highest participant folder under `root`; `P001` when none exist.
    pub fn next(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Ok(Self::new(1));
        }
        let mut highest = 0;
        for entry in std::fs::read_dir(root)
            .with_context(|| format!("listing participants in {}", root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with('P') {
                continue;
            }
            if let Some(id) = Self::parse(name) {
                highest = highest.max(id.number);
            }
        }
        Ok(Self::new(highest + 1))
    }

    pub fn counterbalance(&self) -> Counterbalance {
        Counterbalance::for_participant(self.number)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:03}", self.number)
    }
}
