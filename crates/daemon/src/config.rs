// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed agent configuration, loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use capd_adapters::SourceConfig;
use capd_storage::OutputConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::supervisor::SupervisorSettings;
use crate::worker::WorkerSettings;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorConfig {
    pub base_url: String,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_cache_ttl_ms() -> u64 {
    3_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl CoordinatorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Control loop timing. All values in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    pub poll_interval_ms: u64,
    pub drain_window_ms: u64,
    pub drain_idle_ms: u64,
    pub restart_settle_ms: u64,
    pub stop_poll_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            drain_window_ms: 5_000,
            drain_idle_ms: 1_000,
            restart_settle_ms: 10_000,
            stop_poll_ms: 500,
            stop_timeout_ms: 30_000,
        }
    }
}

/// Where the worker runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// Separate OS process (`capd worker`); a crashed feed cannot take the
    /// supervisor down.
    #[default]
    Process,
    /// Tokio task inside the supervisor process. No crash isolation.
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    pub isolation: Isolation,
    pub update_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { isolation: Isolation::default(), update_interval_ms: 5_000 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Directory for the supervisor's daily log file. Stderr only when unset.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Read, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut config = Self::parse(&content)?;
        if let Some(url) = crate::env::base_url_override() {
            config.coordinator.base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator.base_url.trim().is_empty() {
            return Err(invalid("coordinator.base_url", "must not be empty"));
        }
        if self.source.command.is_empty() {
            return Err(invalid("source.command", "must name a program"));
        }
        self.output.validate().map_err(|e| invalid("output", e.to_string()))?;

        let s = &self.supervisor;
        for (field, value) in [
            ("supervisor.poll_interval_ms", s.poll_interval_ms),
            ("supervisor.drain_window_ms", s.drain_window_ms),
            ("supervisor.drain_idle_ms", s.drain_idle_ms),
            ("supervisor.stop_poll_ms", s.stop_poll_ms),
            ("supervisor.stop_timeout_ms", s.stop_timeout_ms),
            ("worker.update_interval_ms", self.worker.update_interval_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        Ok(())
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        let s = &self.supervisor;
        SupervisorSettings {
            poll_interval: Duration::from_millis(s.poll_interval_ms),
            drain_window: Duration::from_millis(s.drain_window_ms),
            drain_idle: Duration::from_millis(s.drain_idle_ms),
            restart_settle: Duration::from_millis(s.restart_settle_ms),
            stop_poll: Duration::from_millis(s.stop_poll_ms),
            stop_timeout: Duration::from_millis(s.stop_timeout_ms),
        }
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            output: self.output.clone(),
            source: self.source.clone(),
            update_interval: Duration::from_millis(self.worker.update_interval_ms),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}
