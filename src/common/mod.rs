//! Common utilities: configuration, errors, logging and paths

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use config::{Config, SessionMode};
pub use error::{Error, Result};
