use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How the four long-exposure trials are placed in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongBlockMode {
    /// All four conditions after both threshold blocks, ordered by the Latin-square row
    LatinSquare,
    /// Each actor's threshold block is followed by that actor's Sync/Async pair in random order
    ShuffledPerActor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub nominal_fps: u32,
    pub max_delay_s: f32,
    /// Requested capture size; the ring is sized from what the camera actually delivers
    pub width: u32,
    pub height: u32,
    pub capture_timeout_s: f32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            nominal_fps: 30,
            max_delay_s: 5.0,
            width: 640,
            height: 480,
            capture_timeout_s: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data_root: PathBuf,
    pub include_practice: bool,
    pub practice_trials: usize,
    pub max_threshold_delay_ms: u32,
    pub threshold_steps: u32,
    pub threshold_repetitions: u32,
    pub long_async_delay_ms: u32,
    pub practice_duration_s: f32,
    pub threshold_duration_s: f32,
    pub long_duration_s: f32,
    pub isi_s: f32,
    pub estimated_system_latency_s: f32,
    /// Fixed Latin-square row; derived from the participant number when unset
    pub latin_square_group: Option<usize>,
    /// Fixed actor order; derived from the participant number when unset
    pub self_first: Option<bool>,
    pub long_block_mode: LongBlockMode,
    pub isi_abortable: bool,
    pub seed: Option<u64>,
    pub video: VideoConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            include_practice: true,
            practice_trials: 3,
            max_threshold_delay_ms: 594,
            threshold_steps: 10,
            threshold_repetitions: 4,
            long_async_delay_ms: 1000,
            practice_duration_s: 5.0,
            threshold_duration_s: 5.0,
            long_duration_s: 60.0,
            isi_s: 2.0,
            estimated_system_latency_s: 0.134,
            latin_square_group: None,
            self_first: None,
            long_block_mode: LongBlockMode::LatinSquare,
            isi_abortable: false,
            seed: None,
            video: VideoConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let seconds = [
            ("practice_duration_s", self.practice_duration_s),
            ("threshold_duration_s", self.threshold_duration_s),
            ("long_duration_s", self.long_duration_s),
            ("isi_s", self.isi_s),
            ("estimated_system_latency_s", self.estimated_system_latency_s),
            ("video.max_delay_s", self.video.max_delay_s),
            ("video.capture_timeout_s", self.video.capture_timeout_s),
        ];
        for (name, value) in seconds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if self.video.nominal_fps == 0 {
            return Err(ConfigError::Invalid("video.nominal_fps must be at least 1".into()));
        }
        Ok(())
    }

    pub fn isi(&self) -> Duration {
        Duration::from_secs_f32(self.isi_s)
    }

    /// Largest target delay any generated trial can ask for.
    pub fn longest_target_delay_ms(&self) -> u32 {
        self.max_threshold_delay_ms.max(self.long_async_delay_ms)
    }
}
