//! Configuration management for the collector daemon.
//!
//! Provides hierarchical configuration loading from multiple sources with
//! priority:
//! 1. Default values (hardcoded)
//! 2. Optional TOML config file
//! 3. Environment variables (prefix `SCRIBE`)
//! 4. Explicit command line overrides (highest priority)

use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;


/// Effective daemon settings. Field names double as config file keys and as
/// `SCRIBE__`-prefixed environment variable names.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// etcd endpoint to subscribe to
    #[serde(default = "default_etcd_host")]
    pub etcd_host: String,

    /// Key prefix to watch
    #[serde(default = "default_etcd_path")]
    pub etcd_path: String,

    /// Directory of the local history database
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,

    /// Flush interval in seconds
    #[serde(default = "default_db_time")]
    pub db_time: u64,

    /// Report interval in seconds
    #[serde(default = "default_db_report")]
    pub db_report: u64,
}

/// Optional values taken from the command line; applied on top of every
/// other source.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub etcd_host: Option<String>,
    pub etcd_path: Option<String>,
    pub db_file: Option<String>,
    pub db_time: Option<u64>,
    pub db_report: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            etcd_host: default_etcd_host(),
            etcd_path: default_etcd_path(),
            db_file: default_db_file(),
            db_time: default_db_time(),
            db_report: default_db_report(),
        }
    }
}

impl Settings {
    /// Load configuration with priority:
    /// 1. Built-in defaults
    /// 2. Optional TOML file
    /// 3. `SCRIBE__*` environment variables
    /// 4. Command line overrides
    ///
    /// # Errors
    /// Returns a config error when a source fails to parse or the merged
    /// result fails validation.
    pub fn load(config_file: Option<&str>, overrides: SettingsOverrides) -> Result<Self> {
        let mut config = Config::builder();

        // 1. Optional config file
        if let Some(path) = config_file {
            config = config.add_source(File::with_name(path).required(true));
        }

        // 2. Environment overlay
        config = config.add_source(
            Environment::with_prefix("SCRIBE")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        // 3. Command line overrides (highest priority)
        let settings: Settings = config
            .set_override_option("etcd_host", overrides.etcd_host)?
            .set_override_option("etcd_path", overrides.etcd_path)?
            .set_override_option("db_file", overrides.db_file)?
            .set_override_option("db_time", overrides.db_time)?
            .set_override_option("db_report", overrides.db_report)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validates the merged settings.
    /// # Errors
    /// Returns a config error if any rule is violated.
    pub fn validate(&self) -> Result<()> {
        if self.etcd_host.trim().is_empty() {
            return Err(ConfigError::Message("etcd_host must not be empty".into()).into());
        }
        if self.etcd_path.is_empty() {
            return Err(ConfigError::Message("etcd_path must not be empty".into()).into());
        }
        if self.db_file.as_os_str().is_empty() {
            return Err(ConfigError::Message("db_file must not be empty".into()).into());
        }
        if self.db_time == 0 {
            return Err(ConfigError::Message("db_time must be at least 1 second".into()).into());
        }
        if self.db_report == 0 {
            return Err(ConfigError::Message("db_report must be at least 1 second".into()).into());
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.db_time)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.db_report)
    }
}

fn default_etcd_host() -> String {
    "localhost:2379".to_string()
}
fn default_etcd_path() -> String {
    "/".to_string()
}
fn default_db_file() -> PathBuf {
    PathBuf::from("/opt/storage/etcd/db-localhost")
}
fn default_db_time() -> u64 {
    60
}
fn default_db_report() -> u64 {
    30 * 60
}
