//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Program under test
    #[serde(default)]
    pub program: ProgramConfig,

    /// REPL wire contract settings
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Log file settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How commands are delivered to the program under test
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// One subprocess with one open pipe for the whole script
    #[default]
    Persistent,
    /// A fresh subprocess for every command
    PerCommand,
}

/// Configuration for the program under test
#[derive(Debug, Deserialize, Clone)]
pub struct ProgramConfig {
    /// Path to the executable
    #[serde(default = "default_program")]
    pub path: PathBuf,

    /// Arguments passed on launch (the interactive mode flag by default)
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            path: default_program(),
            args: default_args(),
        }
    }
}

fn default_program() -> PathBuf {
    PathBuf::from("./db")
}

fn default_args() -> Vec<String> {
    vec!["r+".to_string()]
}

/// REPL wire contract settings
#[derive(Debug, Deserialize)]
pub struct ProtocolConfig {
    /// Prompt token printed before every command is read
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
        }
    }
}

fn default_prompt() -> String {
    crate::protocol::PROMPT.to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for a single response chunk
    #[serde(default = "default_response")]
    pub response_secs: u64,

    /// Timeout for the program to exit once its input is closed
    #[serde(default = "default_exit")]
    pub exit_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            response_secs: default_response(),
            exit_secs: default_exit(),
        }
    }
}

fn default_response() -> u64 {
    10
}
fn default_exit() -> u64 {
    5
}

/// Session configuration
#[derive(Debug, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub mode: SessionMode,
}

/// Log file configuration
#[derive(Debug, Deserialize, Default)]
pub struct LoggingConfig {
    /// Also write logs to the default log file
    #[serde(default)]
    pub to_file: bool,

    /// Also write logs to this file (implies `to_file`)
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// The log file to write, if file logging is enabled
    pub fn file_path(&self) -> Option<PathBuf> {
        match &self.file {
            Some(path) => Some(path.clone()),
            None if self.to_file => super::logging::default_log_path(),
            None => None,
        }
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
