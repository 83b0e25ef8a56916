//! Test runner implementation
//!
//! Executes a scenario by driving the program under test through its
//! command script, then verifies the captured transcript against the
//! scenario's expectations.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use colored::Colorize;
use serde::Serialize;
use tokio::process::Command as TokioCommand;

use crate::common::{paths, Config, Error, Result, SessionMode};
use crate::session::{run_script, SessionOptions};
use crate::verify::{self, Mismatch, VerificationResult};

use super::config::TestScenario;

/// Result of a test run
#[derive(Debug, Serialize)]
pub struct TestResult {
    pub name: String,
    pub path: PathBuf,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub captured: Vec<String>,
}

impl TestResult {
    pub(crate) fn aborted(name: &str, path: &Path, steps_total: usize, error: &Error) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            passed: false,
            steps_run: 0,
            steps_total,
            mismatches: Vec::new(),
            error: Some(error.to_string()),
            error_code: Some(error.code()),
            captured: Vec::new(),
        }
    }
}

/// Options for running scenarios
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Show setup output and session details
    pub verbose: bool,
    /// Stop at the first mismatch
    pub strict: bool,
    /// Print nothing (for machine-readable output)
    pub quiet: bool,
    /// Program under test, overriding scenario and configuration
    pub program: Option<PathBuf>,
}

/// State of one scenario run
///
/// Holds the commands, the transcript expected for them, and what the
/// program actually printed.
#[derive(Debug, Default)]
pub struct TestRun {
    pub commands: Vec<String>,
    pub expected: Vec<String>,
    pub captured: Vec<String>,
}

impl TestRun {
    pub fn new(commands: Vec<String>, expected: Vec<String>) -> Self {
        Self {
            commands,
            expected,
            captured: Vec::new(),
        }
    }

    pub fn from_scenario(scenario: &TestScenario) -> Self {
        Self::new(scenario.commands(), scenario.expected())
    }

    /// Drive the program through the commands
    ///
    /// Launch failures are returned as errors. A session that stopped early
    /// keeps its partial output and its error is returned in `Ok`.
    pub async fn execute(
        &mut self,
        options: &SessionOptions,
        mode: SessionMode,
    ) -> Result<Option<Error>> {
        let outcome = run_script(options, mode, &self.commands).await?;
        self.captured = outcome.captured;
        Ok(outcome.error)
    }

    pub fn verify(&self) -> VerificationResult {
        verify::verify(&self.captured, &self.expected)
    }

    pub fn verify_strict(&self) -> Result<()> {
        verify::verify_strict(&self.captured, &self.expected)
    }
}

/// Prints the human-readable report unless quiet
struct Reporter {
    quiet: bool,
}

impl Reporter {
    fn say(&self, line: impl Display) {
        if !self.quiet {
            println!("{}", line);
        }
    }
}

/// Run a test scenario from a YAML file
pub async fn run_scenario(path: &Path, config: &Config, opts: &RunOptions) -> Result<TestResult> {
    let scenario = TestScenario::load(path)?;
    let steps_total = scenario.steps.len();
    let out = Reporter { quiet: opts.quiet };

    out.say(format!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    ));

    if let Some(desc) = &scenario.description {
        out.say(format!("  {}", desc.dimmed()));
    }

    let scenario_dir = scenario_dir(path)?;

    // Run setup steps
    if let Some(setup_steps) = &scenario.setup {
        out.say(format!("\n{}", "Setup:".cyan()));
        for step in setup_steps {
            if opts.verbose {
                out.say(format!("  $ {}", step.shell.dimmed()));
            }

            let show_output = opts.verbose && !opts.quiet;
            let status = TokioCommand::new("sh")
                .arg("-c")
                .arg(&step.shell)
                .current_dir(&scenario_dir)
                .stdin(Stdio::null())
                .stdout(if show_output {
                    Stdio::inherit()
                } else {
                    Stdio::null()
                })
                .stderr(if show_output {
                    Stdio::inherit()
                } else {
                    Stdio::null()
                })
                .status()
                .await
                .map_err(|e| Error::Config(format!("Setup command failed to execute: {}", e)))?;

            if !status.success() {
                let error = Error::Config(format!(
                    "Setup command '{}' failed with exit code {:?}",
                    step.shell,
                    status.code()
                ));
                out.say(format!("  {} {}", "✗".red(), error));
                return Ok(TestResult::aborted(&scenario.name, path, steps_total, &error));
            }
            out.say(format!("  {} {}", "✓".green(), step.shell.dimmed()));
        }
    }

    let options = session_options(&scenario, &scenario_dir, config, opts)?;
    let mode = scenario.target.mode.unwrap_or(config.session.mode);

    out.say(format!("\n{}", "Session:".cyan()));
    if opts.verbose {
        out.say(format!(
            "  Program: {}",
            options.program.display().to_string().dimmed()
        ));
        out.say(format!("  Args: {}", format!("{:?}", options.args).dimmed()));
    }
    out.say(format!(
        "  Mode: {}",
        match mode {
            SessionMode::Persistent => "persistent",
            SessionMode::PerCommand => "per-command",
        }
        .dimmed()
    ));

    let mut run = TestRun::from_scenario(&scenario);
    let session_error = match run.execute(&options, mode).await {
        Ok(session_error) => session_error,
        Err(e) => {
            out.say(format!("  {} {}", "✗".red(), e));
            return Ok(TestResult::aborted(&scenario.name, path, steps_total, &e));
        }
    };

    // Per-step report
    out.say(format!("\n{}", "Steps:".cyan()));
    for (i, command) in run.commands.iter().enumerate() {
        let step_num = i + 1;
        match run.captured.get(i) {
            Some(captured) if run.expected.get(i) == Some(captured) => {
                out.say(format!(
                    "  {} Step {}: {}",
                    "✓".green(),
                    step_num,
                    command.dimmed()
                ));
            }
            Some(_) => {
                out.say(format!("  {} Step {}: {}", "✗".red(), step_num, command));
            }
            None => {
                out.say(format!(
                    "  {} Step {}: {} (not run)",
                    "-".yellow(),
                    step_num,
                    command.dimmed()
                ));
            }
        }
    }

    if let Some(e) = &session_error {
        out.say(format!("\n  {} Session stopped early: {}", "✗".red(), e));
    }

    let mismatches = if opts.strict {
        match run.verify_strict() {
            Ok(()) => Vec::new(),
            Err(Error::Mismatch {
                index,
                captured,
                expected,
            }) => vec![Mismatch {
                index,
                captured,
                expected,
            }],
            Err(e) => return Err(e),
        }
    } else {
        run.verify().mismatches().to_vec()
    };

    if !mismatches.is_empty() {
        out.say(format!("\n{}", "Mismatches:".cyan()));
        for mismatch in &mismatches {
            out.say(format!("  {} index {}", "✗".red(), mismatch.index));
            out.say(format!(
                "    expected: {}",
                show(mismatch.expected.as_deref()).green()
            ));
            out.say(format!(
                "    actual:   {}",
                show(mismatch.captured.as_deref()).red()
            ));
        }
    }

    let passed = session_error.is_none() && mismatches.is_empty();
    if passed {
        out.say(format!(
            "\n{} {}\n",
            "✓".green().bold(),
            "Test Passed".green().bold()
        ));
    } else {
        out.say(format!(
            "\n{} {}\n",
            "✗".red().bold(),
            "Test Failed".red().bold()
        ));
    }

    Ok(TestResult {
        name: scenario.name,
        path: path.to_path_buf(),
        passed,
        steps_run: run.captured.len(),
        steps_total,
        mismatches,
        error: session_error.as_ref().map(|e| e.to_string()),
        error_code: session_error.as_ref().map(|e| e.code()),
        captured: run.captured,
    })
}

/// Absolute directory containing the scenario file
fn scenario_dir(path: &Path) -> Result<PathBuf> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

/// Session options for a scenario
///
/// Program precedence: command line, then scenario, then configuration.
/// The program runs inside the scenario's directory.
fn session_options(
    scenario: &TestScenario,
    scenario_dir: &Path,
    config: &Config,
    opts: &RunOptions,
) -> Result<SessionOptions> {
    let mut options = SessionOptions::from_config(config).with_working_dir(scenario_dir);

    if let Some(program) = &opts.program {
        options.program = paths::resolve_program(program, &std::env::current_dir()?);
    } else if let Some(program) = &scenario.target.program {
        options.program = paths::resolve_program(program, scenario_dir);
    }

    if let Some(args) = &scenario.target.args {
        options.args = args.clone();
    }

    if let Some(prompt) = &scenario.target.prompt {
        options.prompt = prompt.clone();
    }

    Ok(options)
}

/// Render one side of a mismatch for the terminal
fn show(text: Option<&str>) -> String {
    match text {
        Some(t) => format!("{:?}", t),
        None => "<missing>".to_string(),
    }
}
