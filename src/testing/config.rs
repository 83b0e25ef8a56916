//! Test scenario configuration types
//!
//! Defines the data structures for YAML test scenarios.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::common::{Error, Result, SessionMode};

/// A complete test scenario loaded from a YAML file
#[derive(Serialize, Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional setup steps to run before the test (e.g., removing a stale db file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Vec<SetupStep>>,
    /// Overrides for the program under test
    #[serde(default, skip_serializing_if = "TargetConfig::is_empty")]
    pub target: TargetConfig,
    /// Commands to send, each with its expected output
    pub steps: Vec<TestStep>,
}

/// A setup step that runs before the test
#[derive(Serialize, Deserialize, Debug)]
pub struct SetupStep {
    /// Shell command to execute
    pub shell: String,
}

/// Program under test, overriding the configuration file
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct TargetConfig {
    /// Path to the program (relative paths resolve against the scenario file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    /// Arguments to pass to the program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Session mode: "persistent" or "per-command"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SessionMode>,
    /// Prompt token printed by the program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl TargetConfig {
    fn is_empty(&self) -> bool {
        self.program.is_none() && self.args.is_none() && self.mode.is_none() && self.prompt.is_none()
    }
}

/// One command and the output it should produce
#[derive(Serialize, Deserialize, Debug)]
pub struct TestStep {
    /// The line sent to the program (e.g., "insert 1 user1 person1@example.com")
    pub command: String,
    /// Expected captured output
    pub expect: Expectation,
}

/// Expected output, as one string or as lines joined with `\n`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Expectation {
    Text(String),
    Lines(Vec<String>),
}

impl Expectation {
    /// The exact text the captured output must equal
    pub fn text(&self) -> String {
        match self {
            Expectation::Text(t) => t.clone(),
            Expectation::Lines(lines) => lines.join("\n"),
        }
    }
}

impl TestScenario {
    /// Load and parse a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test scenario '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse test scenario: {}", e)))
    }

    /// Commands in send order
    pub fn commands(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.command.clone()).collect()
    }

    /// Expected transcript, aligned with `commands()`
    pub fn expected(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.expect.text()).collect()
    }
}
