//! End-to-end integration tests for the REPL harness
//!
//! These tests drive the `mock-db` binary, which speaks the same line
//! protocol as the `db` storage engine:
//! 1. Through the library API (sessions, scripts and verification)
//! 2. Through the `repl-harness` CLI with the YAML scenarios in
//!    `tests/fixtures/`

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use repl_harness::protocol::{framed, Row, EXECUTED, PROMPT};
use repl_harness::testing::{self, RunOptions, TestScenario};
use repl_harness::{run_script, verify, Config, Error, SessionMode, SessionOptions};

const INSERT_1: &str = "insert 1 user1 person1@example.com";
const INSERT_2: &str = "insert 2 user2 person2@example.com";

/// Test context with a scratch directory for the database file
struct TestContext {
    /// Scratch directory, removed on drop
    temp_dir: tempfile::TempDir,
    /// Path to the mock database binary
    mock_db: PathBuf,
    /// Path to the harness binary
    harness_bin: PathBuf,
    /// Path to fixtures directory
    fixtures_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        Self {
            temp_dir: tempfile::tempdir().expect("Failed to create temp dir"),
            mock_db: PathBuf::from(env!("CARGO_BIN_EXE_mock-db")),
            harness_bin: PathBuf::from(env!("CARGO_BIN_EXE_repl-harness")),
            fixtures_dir: PathBuf::from(manifest_dir).join("tests").join("fixtures"),
        }
    }

    fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Session options for the mock database with a fresh store in the
    /// scratch directory
    fn options(&self) -> SessionOptions {
        SessionOptions::new(&self.mock_db)
            .with_args(["r+"])
            .with_working_dir(self.dir())
    }

    /// Copy a YAML fixture into the scratch directory
    fn fixture(&self, name: &str) -> PathBuf {
        let dest = self.dir().join(name);
        fs::copy(self.fixtures_dir.join(name), &dest).expect("Failed to copy fixture");
        dest
    }

    /// Write a config file pointing at the mock database
    fn create_config(&self) -> PathBuf {
        let config_content = format!(
            r#"
[program]
path = "{}"
args = ["r+"]

[timeouts]
response_secs = 5
exit_secs = 5
"#,
            self.mock_db.display()
        );

        let config_path = self.dir().join("config.toml");
        fs::write(&config_path, config_content).expect("Failed to write config");
        config_path
    }

    /// Run a harness command inside the scratch directory
    fn run_harness(&self, args: &[&str]) -> HarnessOutput {
        let config = self.create_config();
        let output = Command::new(&self.harness_bin)
            .arg("--config")
            .arg(&config)
            .args(args)
            .current_dir(self.dir())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run harness");

        HarnessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Output from a harness command
#[derive(Debug)]
struct HarnessOutput {
    stdout: String,
    stderr: String,
    success: bool,
    code: Option<i32>,
}

fn row_1() -> String {
    Row::new(1, "user1", "person1@example.com").to_string()
}

fn row_2() -> String {
    Row::new(2, "user2", "person2@example.com").to_string()
}

// ============== Library tests ==============

#[tokio::test]
async fn test_insert_then_select() {
    let ctx = TestContext::new();
    let commands = [INSERT_1, "select", ".exit"];

    let outcome = run_script(&ctx.options(), SessionMode::Persistent, &commands)
        .await
        .unwrap();

    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    assert_eq!(
        outcome.captured,
        vec![framed(EXECUTED), framed(&row_1()), PROMPT.to_string()]
    );
    assert_eq!(outcome.exit_codes, vec![Some(0)]);
}

#[tokio::test]
async fn test_select_returns_rows_in_order() {
    let ctx = TestContext::new();
    let commands = [INSERT_1, INSERT_2, "select"];

    let outcome = run_script(&ctx.options(), SessionMode::Persistent, &commands)
        .await
        .unwrap();

    assert_eq!(
        outcome.captured[2],
        "db > (1, user1, person1@example.com)\n(2, user2, person2@example.com)"
    );
    assert_eq!(outcome.captured[2], framed(&format!("{}\n{}", row_1(), row_2())));
}

#[tokio::test]
async fn test_misspelled_expectation_fails_verification() {
    let ctx = TestContext::new();
    let commands = [INSERT_1, INSERT_2, "select"];
    let expected = [
        "db > Executed",
        "db > Executed",
        "db > (1, user1, person1@example.com)\n(2, user2, person2@exmample.com)",
    ];

    let outcome = run_script(&ctx.options(), SessionMode::Persistent, &commands)
        .await
        .unwrap();

    let result = verify(&outcome.captured, &expected);
    assert!(!result.is_match());
    assert_eq!(result.mismatches().len(), 1);
    assert_eq!(result.mismatches()[0].index, 2);

    let err = repl_harness::verify_strict(&outcome.captured, &expected).unwrap_err();
    assert!(matches!(err, Error::Mismatch { index: 2, .. }));
}

#[tokio::test]
async fn test_fresh_store_is_idempotent() {
    let commands = [INSERT_1, "select", ".exit"];

    let first_ctx = TestContext::new();
    let first = run_script(&first_ctx.options(), SessionMode::Persistent, &commands)
        .await
        .unwrap();

    let second_ctx = TestContext::new();
    let second = run_script(&second_ctx.options(), SessionMode::Persistent, &commands)
        .await
        .unwrap();

    assert_eq!(first.captured, second.captured);
}

#[tokio::test]
async fn test_empty_script() {
    let ctx = TestContext::new();
    let commands: [&str; 0] = [];

    let outcome = run_script(&ctx.options(), SessionMode::Persistent, &commands)
        .await
        .unwrap();

    assert!(outcome.captured.is_empty());
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_launch_failure() {
    let ctx = TestContext::new();
    let options = SessionOptions::new(ctx.dir().join("no-such-db")).with_args(["r+"]);

    let err = run_script(&options, SessionMode::Persistent, &["select"])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Launch { .. }));
    assert_eq!(err.code(), "LAUNCH_ERROR");
}

#[tokio::test]
async fn test_commands_after_exit_fail() {
    let ctx = TestContext::new();
    let commands = [".exit", "select"];

    let outcome = run_script(&ctx.options(), SessionMode::Persistent, &commands)
        .await
        .unwrap();

    assert_eq!(outcome.captured, vec![PROMPT.to_string()]);
    assert!(matches!(outcome.error, Some(Error::Communication(_))));
}

#[tokio::test]
async fn test_per_command_mode_loses_unsaved_state() {
    let ctx = TestContext::new();
    let commands = [INSERT_1, "select"];

    let outcome = run_script(&ctx.options(), SessionMode::PerCommand, &commands)
        .await
        .unwrap();

    // Every command gets a fresh process, and nothing was saved with .exit
    assert_eq!(outcome.captured, vec![framed(EXECUTED), PROMPT.to_string()]);
    assert_eq!(outcome.exit_codes.len(), 2);
}

#[tokio::test]
async fn test_store_persists_across_sessions() {
    let ctx = TestContext::new();

    let first = run_script(&ctx.options(), SessionMode::Persistent, &[INSERT_1, ".exit"])
        .await
        .unwrap();
    assert!(first.error.is_none());
    assert!(ctx.dir().join("r+").exists());

    let second = run_script(&ctx.options(), SessionMode::Persistent, &["select", ".exit"])
        .await
        .unwrap();
    assert_eq!(second.captured[0], framed(&row_1()));
}

#[tokio::test]
async fn test_run_scenario_from_yaml() {
    let ctx = TestContext::new();
    let path = ctx.fixture("insert_select.yaml");
    let opts = RunOptions {
        quiet: true,
        program: Some(ctx.mock_db.clone()),
        ..Default::default()
    };

    let result = testing::run_scenario(&path, &Config::default(), &opts)
        .await
        .unwrap();

    assert!(result.passed, "scenario failed: {:?}", result);
    assert_eq!(result.steps_run, 3);
    assert_eq!(result.steps_total, 3);
    assert!(result.mismatches.is_empty());
}

#[tokio::test]
async fn test_run_scenario_reports_mismatch() {
    let ctx = TestContext::new();
    let path = ctx.fixture("misspelled_email.yaml");
    let opts = RunOptions {
        quiet: true,
        strict: true,
        program: Some(ctx.mock_db.clone()),
        ..Default::default()
    };

    let result = testing::run_scenario(&path, &Config::default(), &opts)
        .await
        .unwrap();

    assert!(!result.passed);
    assert_eq!(result.mismatches.len(), 1);
    assert_eq!(result.mismatches[0].index, 2);
    assert!(result.error.is_none());
}

// ============== Mock database tests ==============

#[test]
fn test_mock_db_requires_filename() {
    let ctx = TestContext::new();
    let output = Command::new(&ctx.mock_db)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to run mock-db");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Must supply a database filename\n"
    );
}

#[test]
fn test_mock_db_end_of_input() {
    let ctx = TestContext::new();
    let output = Command::new(&ctx.mock_db)
        .arg("r+")
        .current_dir(ctx.dir())
        .stdin(Stdio::null())
        .output()
        .expect("Failed to run mock-db");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "db > Invalid input\n");
}

// ============== CLI tests ==============

#[test]
fn test_cli_passing_scenarios() {
    let ctx = TestContext::new();
    let a = ctx.fixture("insert_select.yaml");
    let b = ctx.fixture("two_rows.yaml");
    let errors = ctx.fixture("errors.yaml");

    let output = ctx.run_harness(&[
        "test",
        a.to_str().unwrap(),
        b.to_str().unwrap(),
        errors.to_str().unwrap(),
    ]);

    assert!(
        output.success,
        "harness failed:\nstdout: {}\nstderr: {}",
        output.stdout,
        output.stderr
    );
    assert_eq!(output.stdout.matches("Test Passed").count(), 3);
    assert!(output.stdout.contains("3 passed, 0 failed, 3 total"));
}

#[test]
fn test_cli_program_override() {
    let ctx = TestContext::new();
    let path = ctx.fixture("insert_select.yaml");
    let mock_db = ctx.mock_db.to_str().unwrap().to_string();

    let output = ctx.run_harness(&["test", "--program", &mock_db, path.to_str().unwrap()]);

    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Test Passed"));
}

#[test]
fn test_cli_failing_scenario() {
    let ctx = TestContext::new();
    let path = ctx.fixture("misspelled_email.yaml");

    let output = ctx.run_harness(&["test", path.to_str().unwrap()]);

    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    assert!(output.stdout.contains("Test Failed"));
    assert!(output.stdout.contains("exmample"));
    assert!(output.stderr.contains("1 of 1 scenario(s) failed"));
}

#[test]
fn test_cli_json_output() {
    let ctx = TestContext::new();
    let good = ctx.fixture("two_rows.yaml");
    let bad = ctx.fixture("misspelled_email.yaml");

    let output = ctx.run_harness(&[
        "test",
        "--json",
        good.to_str().unwrap(),
        bad.to_str().unwrap(),
    ]);

    assert_eq!(output.code, Some(1));
    let results: serde_json::Value =
        serde_json::from_str(&output.stdout).expect("stdout should be JSON");
    assert_eq!(results[0]["passed"], true);
    assert_eq!(results[1]["passed"], false);
    assert_eq!(results[1]["mismatches"][0]["index"], 2);
}

#[test]
fn test_cli_missing_program() {
    let ctx = TestContext::new();
    let path = ctx.fixture("insert_select.yaml");
    let missing = ctx.dir().join("no-such-db");

    let output = ctx.run_harness(&[
        "test",
        "--json",
        "--program",
        missing.to_str().unwrap(),
        path.to_str().unwrap(),
    ]);

    assert_eq!(output.code, Some(1));
    let results: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(results[0]["error_code"], "LAUNCH_ERROR");
}

#[test]
fn test_cli_record() {
    let ctx = TestContext::new();
    let mock_db = ctx.mock_db.to_str().unwrap().to_string();

    let output = ctx.run_harness(&[
        "record",
        "--program",
        &mock_db,
        "--arg",
        "r+",
        INSERT_1,
        INSERT_2,
        "select",
        ".exit",
    ]);

    assert!(output.success, "stderr: {}", output.stderr);
    let scenario: TestScenario =
        serde_yaml::from_str(&output.stdout).expect("stdout should be a scenario");
    assert_eq!(scenario.commands(), vec![INSERT_1, INSERT_2, "select", ".exit"]);
    assert_eq!(
        scenario.expected(),
        vec![
            framed(EXECUTED),
            framed(EXECUTED),
            framed(&format!("{}\n{}", row_1(), row_2())),
            PROMPT.to_string(),
        ]
    );
}

#[test]
fn test_cli_record_failure_shows_partial_transcript() {
    let ctx = TestContext::new();
    let mock_db = ctx.mock_db.to_str().unwrap().to_string();

    let output = ctx.run_harness(&[
        "record",
        "--program",
        &mock_db,
        "--arg",
        "r+",
        INSERT_1,
        ".exit",
        "select",
    ]);

    assert_eq!(output.code, Some(1));
    assert!(output.stdout.is_empty(), "stdout: {}", output.stdout);
    assert!(output.stderr.contains("Captured before the failure:"));
    assert!(output.stderr.contains(&format!("$ {}", INSERT_1)));
    assert!(output.stderr.contains("db > Executed"));
    assert!(output.stderr.contains("has already exited"));
}

#[test]
fn test_config_loading() {
    let config = Config::parse(
        r#"
[program]
path = "./db"
args = ["r+"]

[protocol]
prompt = "db > "

[session]
mode = "per-command"
"#,
    )
    .unwrap();

    assert_eq!(config.session.mode, SessionMode::PerCommand);
    let options = SessionOptions::from_config(&config);
    assert!(options.program.ends_with("db"));
    assert_eq!(options.args, vec!["r+".to_string()]);
}
