//! Typed configuration, read once at startup from a JSON file.
//!
//! Every key is enumerated here. Unknown keys, missing required keys and
//! out-of-range values are startup errors.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;
use crate::planner::PlannerConfig;
use crate::vision::ClassifierConfig;

fn default_camera_dir() -> String {
    "camera".to_string()
}

fn default_camera_flush() -> usize {
    30
}

fn default_bucket_format() -> String {
    "%Y%m%d".to_string()
}

fn default_collection() -> String {
    "events".to_string()
}

fn default_max_failures() -> u32 {
    10
}

fn default_backoff_base() -> u64 {
    100
}

fn default_backoff_max() -> u64 {
    5000
}

fn default_bridge_idle() -> u64 {
    60_000
}

fn default_title() -> String {
    "fieldbot".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Transport
    pub brain_addr: String,
    pub request_timeout_ms: u64,
    pub listen_interval_ms: u64,
    pub display_interval_ms: u64,
    #[serde(default = "default_bridge_idle")]
    pub bridge_idle_timeout_ms: u64,

    // Actuator
    pub actuator_dev: String,
    pub actuator_baud: u32,
    pub actuator_timeout_ms: u64,

    // Camera
    pub camera_index: u32,
    #[serde(default = "default_camera_dir")]
    pub camera_dir: String,
    #[serde(default = "default_camera_flush")]
    pub camera_flush: usize,
    pub camera_tall_threshold: u32,

    // Field
    pub num_rows: u32,
    pub num_plants: u32,
    pub slots_per_row: u32,

    // Time budget, seconds
    pub run_time: u64,
    pub give_up_time: u64,

    // Event store
    pub store_dir: String,
    #[serde(default = "default_bucket_format")]
    pub store_bucket_format: String,
    #[serde(default = "default_collection")]
    pub store_collection: String,

    // Robot loop
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_title")]
    pub console_title: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(target: "config", path = %path.display(), "loading config file");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                key,
                reason: reason.into(),
            }
        }

        match self.brain_addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
            _ => return Err(invalid("BRAIN_ADDR", "expected host:port")),
        }

        let positive = [
            ("REQUEST_TIMEOUT_MS", self.request_timeout_ms),
            ("LISTEN_INTERVAL_MS", self.listen_interval_ms),
            ("DISPLAY_INTERVAL_MS", self.display_interval_ms),
            ("BRIDGE_IDLE_TIMEOUT_MS", self.bridge_idle_timeout_ms),
            ("ACTUATOR_TIMEOUT_MS", self.actuator_timeout_ms),
            ("ACTUATOR_BAUD", self.actuator_baud as u64),
            ("NUM_ROWS", self.num_rows as u64),
            ("NUM_PLANTS", self.num_plants as u64),
            ("SLOTS_PER_ROW", self.slots_per_row as u64),
            ("RUN_TIME", self.run_time),
            ("CAMERA_TALL_THRESHOLD", self.camera_tall_threshold as u64),
            ("MAX_CONSECUTIVE_FAILURES", self.max_consecutive_failures as u64),
            ("BACKOFF_BASE_MS", self.backoff_base_ms),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(invalid(key, "must be greater than zero"));
            }
        }

        if self.give_up_time >= self.run_time {
            return Err(invalid("GIVE_UP_TIME", "must be less than RUN_TIME"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(invalid("BACKOFF_MAX_MS", "must be at least BACKOFF_BASE_MS"));
        }
        if self.actuator_dev.is_empty() {
            return Err(invalid("ACTUATOR_DEV", "must not be empty"));
        }
        if self.store_dir.is_empty() {
            return Err(invalid("STORE_DIR", "must not be empty"));
        }
        if self.store_collection.is_empty() || self.store_collection.contains(['/', '\\']) {
            return Err(invalid("STORE_COLLECTION", "must be a plain file name"));
        }
        if let Err(e) = jiff::fmt::strtime::format(&self.store_bucket_format, &jiff::Zoned::now()) {
            return Err(invalid("STORE_BUCKET_FORMAT", e.to_string()));
        }
        Ok(())
    }

    pub fn run_time(&self) -> Duration {
        Duration::from_secs(self.run_time)
    }

    pub fn give_up_time(&self) -> Duration {
        Duration::from_secs(self.give_up_time)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn listen_interval(&self) -> Duration {
        Duration::from_millis(self.listen_interval_ms)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    pub fn bridge_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_idle_timeout_ms)
    }

    pub fn actuator_timeout(&self) -> Duration {
        Duration::from_millis(self.actuator_timeout_ms)
    }

    pub fn camera_path(&self) -> PathBuf {
        Path::new(&self.camera_dir).join(self.camera_index.to_string())
    }

    pub fn planner(&self) -> PlannerConfig {
        PlannerConfig {
            num_rows: self.num_rows,
            num_plants: self.num_plants,
            slots_per_row: self.slots_per_row,
        }
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            tall_threshold: self.camera_tall_threshold,
        }
    }
}
