//! REPL harness - scripted end-to-end testing for line-oriented REPL programs
//!
//! This library drives a program under test through its stdin/stdout,
//! captures one response per command and verifies the transcript.

pub mod cli;
pub mod commands;
pub mod common;
pub mod protocol;
pub mod session;
pub mod testing;
pub mod verify;

// Re-export commonly used types for tests
pub use common::{Config, Error, Result, SessionMode};
pub use session::{run_script, ScriptOutcome, Session, SessionOptions};
pub use verify::{verify, verify_strict, Mismatch, VerificationResult};
