//! Error types for the REPL harness
//!
//! Launch and communication failures abort a session. Transcript
//! mismatches are ordinary test failures and only become an error in
//! strict mode.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the REPL harness
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Communication with program under test failed: {0}")]
    Communication(String),

    #[error("Timed out after {0} ms waiting for the program under test")]
    Timeout(u64),

    #[error("Command must be a single line: {0:?}")]
    InvalidCommand(String),

    // === Verification Errors ===
    #[error(
        "Transcript mismatch at index {index}: expected {}, got {}",
        side(.expected),
        side(.captured)
    )]
    Mismatch {
        index: usize,
        captured: Option<String>,
        expected: Option<String>,
    },

    #[error("{failed} of {total} scenario(s) failed")]
    ScenariosFailed { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

fn side(text: &Option<String>) -> String {
    match text {
        Some(t) => format!("{:?}", t),
        None => "<missing>".to_string(),
    }
}

impl Error {
    /// Create a launch error for a program path
    pub fn launch(program: &std::path::Path, source: io::Error) -> Self {
        Self::Launch {
            program: program.display().to_string(),
            source,
        }
    }

    /// Stable code used in machine-readable reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::Launch { .. } => "LAUNCH_ERROR",
            Error::Communication(_) => "COMMUNICATION_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::InvalidCommand(_) => "INVALID_COMMAND",
            Error::Mismatch { .. } => "MISMATCH",
            Error::ScenariosFailed { .. } => "SCENARIOS_FAILED",
            Error::Config(_) | Error::ConfigParse(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}
