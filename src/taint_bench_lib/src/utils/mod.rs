//! This module contains various utility modules and helper functions.

pub mod command;
pub mod git;
pub mod log;

use crate::prelude::*;
use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the directories where configuration and data files of the harness are stored.
pub fn get_project_dirs() -> Result<ProjectDirs, Error> {
    ProjectDirs::from("", "", "taint_bench")
        .context("Could not discern location of configuration files.")
}

/// Get the contents of a configuration file.
pub fn read_config_file(filename: &str) -> Result<serde_json::Value, Error> {
    let config_path = get_project_dirs()?.config_dir().join(filename);
    let config_file = std::fs::read_to_string(&config_path).with_context(|| {
        format!(
            "Could not read configuration file {}",
            config_path.display()
        )
    })?;
    Ok(serde_json::from_str(&config_file)?)
}

/// Get a unique identifier for a run of the harness.
///
/// The identifier is derived from the current time
/// so that two runs on the same project and revision do not overwrite each other's reports.
pub fn new_run_id() -> Result<String, Error> {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)?
        .as_millis();
    Ok(format!("{millis}"))
}

/// Create the given directory (and all its parents) if it does not exist yet.
pub fn ensure_dir(path: impl Into<PathBuf>) -> Result<PathBuf, Error> {
    let path = path.into();
    if !path.exists() {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Unable to create directory {}", path.display()))?;
    }
    Ok(path)
}
