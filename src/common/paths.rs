//! Configuration, log and program paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/repl-harness/`
//! - macOS: `~/Library/Application Support/repl-harness/`
//! - Windows: `%APPDATA%\repl-harness\`

use std::path::{Path, PathBuf};

/// Name used for the configuration and data directories
const APP_NAME: &str = "repl-harness";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Resolve the program under test
///
/// Absolute paths are kept as-is. Paths with a directory component are
/// taken relative to `base`. A bare name is looked up in PATH first and
/// falls back to `base` when it isn't found there.
pub fn resolve_program(program: &Path, base: &Path) -> PathBuf {
    if program.is_absolute() {
        return program.to_path_buf();
    }

    if program.components().count() == 1 {
        if let Ok(found) = which::which(program) {
            return found;
        }
    }

    base.join(program)
}
