//! Session driver
//!
//! Launches the program under test, writes scripted commands to its stdin
//! and captures one response chunk per command from its stdout.

mod driver;
pub mod framing;
mod script;

pub use crate::common::SessionMode;
pub use driver::{Session, SessionOptions};
pub use script::{run_script, ScriptOutcome};
