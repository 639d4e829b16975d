//! Daemon configuration, read from a JSON file.

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "RADIODIAL_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "/etc/radiodial.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Every field has a default matching the reference wiring, so a missing
/// config file runs the stock hardware.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub playlist_path: PathBuf,
    pub position_path: PathBuf,
    pub noise_url: String,
    pub clk_pin: u64,
    pub dt_pin: u64,
    pub button_pin: u64,
    pub min_pos: i32,
    pub max_pos: i32,
    pub default_pos: i32,
    pub poll_interval_ms: u64,
    pub button_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            playlist_path: PathBuf::from("/var/lib/radiodial/playlist.csv"),
            position_path: PathBuf::from("/var/lib/radiodial/position.json"),
            noise_url: "file:///var/lib/radiodial/noise.mp3".to_string(),
            clk_pin: 18,
            dt_pin: 17,
            button_pin: 15,
            min_pos: 0,
            max_pos: 1020,
            default_pos: 0,
            poll_interval_ms: 1,
            button_debounce_ms: 300,
        }
    }
}

impl Config {
    /// Load from the path in `RADIODIAL_CONFIG`, falling back to
    /// `/etc/radiodial.json`. A missing file yields the defaults; a file that
    /// exists but does not parse is an error.
    pub fn load() -> Result<Config, ConfigError> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(Path::new(&path))
    }

    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(err) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        };
        let config: Config =
            serde_json::from_reader(BufReader::new(file)).map_err(|err| ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_pos > self.max_pos {
            return Err(ConfigError::Invalid(format!(
                "min_pos {} is above max_pos {}",
                self.min_pos, self.max_pos
            )));
        }
        if self.default_pos < self.min_pos || self.default_pos > self.max_pos {
            return Err(ConfigError::Invalid(format!(
                "default_pos {} is outside [{}, {}]",
                self.default_pos, self.min_pos, self.max_pos
            )));
        }
        Ok(())
    }
}
