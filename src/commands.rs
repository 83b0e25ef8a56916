//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::common::SessionMode;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute test scenarios defined in YAML files
    Test {
        /// Paths to the YAML test scenario files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Program under test (overrides scenario and config)
        #[arg(long)]
        program: Option<PathBuf>,

        /// Stop each scenario at its first mismatch
        #[arg(long)]
        strict: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run commands against the program and print the transcript as a scenario
    Record {
        /// Program under test (defaults to the configured program)
        #[arg(long)]
        program: Option<PathBuf>,

        /// Argument to pass to the program
        /// Can be specified multiple times: --arg r+ --arg --readonly
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Option<Vec<String>>,

        /// Session mode (defaults to the configured mode)
        #[arg(long, value_enum)]
        mode: Option<SessionMode>,

        /// Prompt token printed by the program
        #[arg(long)]
        prompt: Option<String>,

        /// Name for the recorded scenario
        #[arg(long, default_value = "recorded")]
        name: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = RecordFormat::Yaml)]
        format: RecordFormat,

        /// Commands to send, in order
        #[arg(required = true)]
        commands: Vec<String>,
    },
}

/// Output format for recorded scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    Yaml,
    Json,
}
