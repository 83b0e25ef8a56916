//! Scenario test runner
//!
//! Reads YAML test scenarios, runs their command scripts against the
//! program under test and reports transcript mismatches.

mod config;
mod runner;

pub use config::*;
pub use runner::{run_scenario, RunOptions, TestResult, TestRun};
