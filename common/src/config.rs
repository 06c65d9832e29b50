//! Daemon configuration.
//!
//! Everything lives in a single HCL file with a `version` attribute checked on
//! load.  All attributes apart from `version` have sensible defaults matching
//! a local `dump1090` feeder, so a minimal file is just the version line.
//!
//! When no file is given, the built-in `config.hcl` is used.
//!

use std::fs;
use std::path::PathBuf;

use eyre::{eyre, Result};
use serde::Deserialize;
use tracing::{debug, trace};

/// Current configuration file version
const CONFIG_FILE_VER: usize = 1;

/// Altitude admission band, in feet.
///
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct FilterConfig {
    /// Reject everything at or above this altitude
    pub below: i32,
    /// Reject everything at or below this altitude
    pub above: i32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            below: 10_000,
            above: -1_000,
        }
    }
}

/// On-disk structure of the configuration file.
///
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Version number for safety
    pub version: usize,
    /// Host the Base Station feed runs on
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the Base Station feed (30003 for `dump1090`)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Socket read timeout in seconds, to detect a silently dead peer
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: u64,
    /// How many times the initial connection is attempted
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: usize,
    /// Fixed delay between connection attempts in seconds
    #[serde(default = "default_connect_backoff")]
    pub connect_backoff: u64,
    /// Capacity of the ingest queue between receiver and processing
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    /// Maximum age in seconds since last seen before a flight leaves the pool
    #[serde(default = "default_max_age")]
    pub max_age: u64,
    /// Minimum delay in seconds between two store commits
    #[serde(default = "default_commit_period")]
    pub commit_period: u64,
    /// Altitude in meters assigned to surface positions without one
    #[serde(default = "default_ground_altitude")]
    pub ground_altitude: f64,
    /// Altitude delta in meters under which a flight is classified as arriving
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f64,
    /// Where the JSON-lines store is written
    #[serde(default = "default_store")]
    pub store: String,
    /// Optional airport table, the built-in one is used when unset
    #[serde(default)]
    pub airports: Option<String>,
    /// Altitude admission band
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Config {
    /// Load the configuration from the given file or fall back on the
    /// built-in defaults.
    ///
    #[tracing::instrument]
    pub fn load(fname: Option<PathBuf>) -> Result<Config> {
        trace!("enter");

        let data = match &fname {
            Some(fname) => fs::read_to_string(fname)?,
            None => include_str!("config.hcl").to_owned(),
        };

        let cfg: Config = hcl::from_str(&data)?;
        debug!("config = {cfg:?}");

        if cfg.version != CONFIG_FILE_VER {
            return Err(eyre!(
                "Bad configuration file version v{}, need v{}",
                cfg.version,
                CONFIG_FILE_VER
            ));
        }
        Ok(cfg)
    }
}

fn default_host() -> String {
    String::from("127.0.0.1")
}

fn default_port() -> u16 {
    30003
}

fn default_socket_timeout() -> u64 {
    30
}

fn default_connect_attempts() -> usize {
    5
}

fn default_connect_backoff() -> u64 {
    1
}

fn default_queue_size() -> usize {
    10_000
}

fn default_max_age() -> u64 {
    300
}

fn default_commit_period() -> u64 {
    1
}

fn default_ground_altitude() -> f64 {
    27.
}

fn default_arrival_threshold() -> f64 {
    -300.
}

fn default_store() -> String {
    String::from("tarmac.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_config_builtin() -> Result<()> {
        let cfg = Config::load(None)?;

        assert_eq!(CONFIG_FILE_VER, cfg.version);
        assert_eq!(30003, cfg.port);
        assert_eq!(10_000, cfg.queue_size);
        assert_eq!(300, cfg.max_age);
        Ok(())
    }

    #[test]
    fn test_config_minimal_file() -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        writeln!(tmp, "version = 1")?;

        let cfg = Config::load(Some(tmp.path().into()))?;
        assert_eq!("127.0.0.1", cfg.host);
        assert_eq!(10_000, cfg.filter.below);
        Ok(())
    }

    #[test]
    fn test_config_bad_version() -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        writeln!(tmp, "version = 42")?;

        let cfg = Config::load(Some(tmp.path().into()));
        assert!(cfg.is_err());
        Ok(())
    }

    #[test]
    fn test_config_overrides() -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        writeln!(
            tmp,
            r##"
version = 1
host = "10.0.0.23"
port = 30004
queue_size = 500

filter {{
  below = 30000
  above = 0
}}
"##
        )?;

        let cfg = Config::load(Some(tmp.path().into()))?;
        assert_eq!("10.0.0.23", cfg.host);
        assert_eq!(30004, cfg.port);
        assert_eq!(500, cfg.queue_size);
        assert_eq!(30_000, cfg.filter.below);
        assert_eq!(0, cfg.filter.above);
        Ok(())
    }
}
