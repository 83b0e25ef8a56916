//! Running a whole command script
//!
//! A launch failure aborts the script and is returned as an error. A
//! failing send stops the remaining commands; everything captured so far,
//! including the output of a command the program died on, is kept in the
//! [`ScriptOutcome`] along with the error.

use crate::common::{Error, Result, SessionMode};

use super::driver::{Session, SessionOptions};

/// Everything a script run produced
#[derive(Debug, Default)]
pub struct ScriptOutcome {
    /// One entry per command that got a response, in order
    pub captured: Vec<String>,
    /// The error that stopped the script early
    pub error: Option<Error>,
    /// Exit code of every session that was closed
    pub exit_codes: Vec<Option<i32>>,
}

impl ScriptOutcome {
    /// Whether every one of `commands` got a response
    pub fn is_complete(&self, commands: usize) -> bool {
        self.error.is_none() && self.captured.len() == commands
    }
}

/// Run `commands` against the program and capture one output per command
pub async fn run_script<S: AsRef<str>>(
    options: &SessionOptions,
    mode: SessionMode,
    commands: &[S],
) -> Result<ScriptOutcome> {
    tracing::debug!(
        program = %options.program.display(),
        ?mode,
        commands = commands.len(),
        "Running script"
    );

    match mode {
        SessionMode::Persistent => run_persistent(options, commands).await,
        SessionMode::PerCommand => run_per_command(options, commands).await,
    }
}

/// One subprocess for the whole script
async fn run_persistent<S: AsRef<str>>(
    options: &SessionOptions,
    commands: &[S],
) -> Result<ScriptOutcome> {
    let mut session = Session::start(options).await?;
    let mut outcome = ScriptOutcome::default();

    for command in commands {
        match session.send(command.as_ref()).await {
            Ok(captured) => outcome.captured.push(captured),
            Err(e) => {
                tracing::warn!(command = command.as_ref(), "Send failed: {}", e);
                outcome.captured.extend(session.take_partial());
                outcome.error = Some(e);
                break;
            }
        }
    }

    outcome.exit_codes.push(close(session).await);
    Ok(outcome)
}

/// A fresh subprocess for every command
async fn run_per_command<S: AsRef<str>>(
    options: &SessionOptions,
    commands: &[S],
) -> Result<ScriptOutcome> {
    let mut outcome = ScriptOutcome::default();

    for command in commands {
        let mut session = Session::start(options).await?;
        let result = session.send(command.as_ref()).await;
        let partial = session.take_partial();
        outcome.exit_codes.push(close(session).await);

        match result {
            Ok(captured) => outcome.captured.push(captured),
            Err(e) => {
                tracing::warn!(command = command.as_ref(), "Send failed: {}", e);
                outcome.captured.extend(partial);
                outcome.error = Some(e);
                break;
            }
        }
    }

    Ok(outcome)
}

async fn close(session: Session) -> Option<i32> {
    match session.close().await {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!("Failed to close session: {}", e);
            None
        }
    }
}
