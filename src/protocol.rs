//! REPL wire contract
//!
//! The program under test prints [`PROMPT`] before reading each line.
//! Inserts answer with [`EXECUTED`], selects with one rendered [`Row`] per
//! line, and `.exit` terminates the process without printing another
//! prompt. Malformed statements answer with a [`PrepareError`] message.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prompt token printed before every command is read
pub const PROMPT: &str = "db > ";

/// Success marker for statements that return no rows
pub const EXECUTED: &str = "Executed";

/// Session-termination directive
pub const EXIT: &str = ".exit";

/// Maximum username length in characters
pub const COLUMN_USERNAME_SIZE: usize = 32;

/// Maximum email length in characters
pub const COLUMN_EMAIL_SIZE: usize = 255;

/// A table row: `(<id>, <username>, <email>)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

/// Render the body of a select response: one row per line
pub fn render_rows(rows: &[Row]) -> String {
    rows.iter()
        .map(Row::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix a response body with the prompt that preceded its command
pub fn framed(body: &str) -> String {
    format!("{}{}", PROMPT, body)
}

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `insert <id> <username> <email>`
    Insert(Row),
    /// `select`
    Select,
    /// `.exit`
    Exit,
}

/// Why an input line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    #[error("Syntax error. Could not parse statement")]
    Syntax,

    #[error("ID must be a positive number")]
    NegativeId,

    #[error("String is too long")]
    StringTooLong,

    #[error("Unrecognized command {0}")]
    UnrecognizedCommand(String),

    #[error("Unrecognized keyword at start of '{0}'")]
    UnrecognizedKeyword(String),
}

impl Statement {
    /// Parse one input line (without its line terminator)
    pub fn parse(line: &str) -> Result<Self, PrepareError> {
        if line.starts_with('.') {
            return if line == EXIT {
                Ok(Statement::Exit)
            } else {
                Err(PrepareError::UnrecognizedCommand(line.to_string()))
            };
        }

        if line.starts_with("insert") {
            return parse_insert(line);
        }

        if line == "select" {
            return Ok(Statement::Select);
        }

        Err(PrepareError::UnrecognizedKeyword(line.to_string()))
    }
}

fn parse_insert(line: &str) -> Result<Statement, PrepareError> {
    let mut parts = line.split_whitespace().skip(1);
    let (Some(id), Some(username), Some(email)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(PrepareError::Syntax);
    };

    let id: i64 = id.parse().map_err(|_| PrepareError::Syntax)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::Syntax)?;

    if username.chars().count() > COLUMN_USERNAME_SIZE
        || email.chars().count() > COLUMN_EMAIL_SIZE
    {
        return Err(PrepareError::StringTooLong);
    }

    Ok(Statement::Insert(Row::new(id, username, email)))
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Insert(row) => {
                write!(f, "insert {} {} {}", row.id, row.username, row.email)
            }
            Statement::Select => f.write_str("select"),
            Statement::Exit => f.write_str(EXIT),
        }
    }
}
