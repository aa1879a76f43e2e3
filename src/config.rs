use crate::runner::RunnerOptions;
use batcher::BatcherConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BATCHER_ID: &str = "lines";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9898";
pub const DEFAULT_METRICS_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub batcher: BatcherSettings,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub output: LoggingOutput,
    pub level: LogLevel,
    pub include_source: bool,
    pub file: FileLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            // stdout carries the emitted batches.
            output: LoggingOutput::Stderr,
            level: LogLevel::Info,
            include_source: false,
            file: FileLoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingOutput {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    pub dir: String,
    pub file_name: String,
    pub rotation: LogRotationConfig,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            dir: "./logs".to_string(),
            file_name: "microbatch.log".to_string(),
            rotation: LogRotationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogRotationConfig {
    pub keep_days: u64,
    pub max_num: u64,
    pub max_size_mb: u64,
}

impl Default for LogRotationConfig {
    fn default() -> Self {
        Self {
            keep_days: 7,
            max_num: 10,
            max_size_mb: 64,
        }
    }
}

/// Flush policy and plumbing of the line batcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatcherSettings {
    pub id: String,
    pub max_weight: usize,
    pub max_quiet_period_ms: u64,
    pub final_flush_grace_ms: u64,
    pub channel_capacity: usize,
}

impl Default for BatcherSettings {
    fn default() -> Self {
        let defaults = BatcherConfig::default();
        Self {
            id: DEFAULT_BATCHER_ID.to_string(),
            max_weight: defaults.max_weight,
            max_quiet_period_ms: defaults.max_quiet_period.as_millis() as u64,
            final_flush_grace_ms: defaults.final_flush_grace.as_millis() as u64,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl BatcherSettings {
    pub fn to_batcher_config(&self) -> BatcherConfig {
        BatcherConfig::new(
            self.max_weight,
            Duration::from_millis(self.max_quiet_period_ms),
        )
        .with_final_flush_grace(Duration::from_millis(self.final_flush_grace_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub addr: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            addr: Some(DEFAULT_METRICS_ADDR.to_string()),
            poll_interval_secs: Some(DEFAULT_METRICS_POLL_INTERVAL_SECS),
        }
    }
}

impl AppConfig {
    pub fn load_required(
        path: impl AsRef<Path>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| format!("failed to read config file {}: {}", path.display(), err))?;
        let cfg: AppConfig = serde_yaml::from_str(&raw)
            .map_err(|err| format!("failed to parse yaml config {}: {}", path.display(), err))?;
        Ok(cfg)
    }

    pub fn load_optional(
        path: impl AsRef<Path>,
    ) -> Result<Option<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::load_required(path)?))
    }

    pub fn to_runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            batcher_id: self.batcher.id.clone(),
            batcher: self.batcher.to_batcher_config(),
            channel_capacity: self.batcher.channel_capacity,
        }
    }
}
