//! This crate automates the installation of taint_bench.
//! It creates the config file, searches for the external analysis tools at commonly used locations
//! and records the found tools in the config file.

use anyhow::{anyhow, Context, Error};
use directories::{BaseDirs, ProjectDirs};
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How deep the tool search descends into each search location.
const MAX_SEARCH_DEPTH: usize = 6;

/// External tools that are usually not found on the `PATH`, keyed by their entry in the `tools` config.
const SEARCHED_TOOLS: [(&str, &str); 2] = [("filecheck", "FileCheck"), ("phasar", "phasar-llvm")];

/// Copies src/config.json to specified location, unless a config file already exists there.
fn copy_config_json(location: &Path) -> Result<PathBuf, Error> {
    let target = location.join("config.json");
    if target.exists() {
        println!("found config.json at {}, keeping it.", location.display());
        return Ok(target);
    }
    let repo_dir = env::current_dir()?;
    std::fs::copy(repo_dir.join("src/config.json"), &target)
        .with_context(|| format!("Copy to {} failed", location.display()))?;
    Ok(target)
}

/// Returns vector of os-specific locations
fn get_search_locations() -> Result<Vec<PathBuf>, Error> {
    let mut locations: Vec<PathBuf> = Vec::new();
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("Could not derive BaseDirs"))?;

    locations.push(base_dirs.data_local_dir().to_path_buf());
    locations.push(base_dirs.home_dir().to_path_buf());
    if let Some(path) = base_dirs.executable_dir() {
        locations.push(path.to_path_buf());
    }

    for candidate in ["/opt", "/usr/local", "/usr/lib"] {
        let candidate = Path::new(candidate);
        if candidate.exists() {
            locations.push(candidate.to_path_buf());
        }
    }
    Ok(locations)
}

/// Returns `true` if an executable with the given name is found in a directory of the `PATH`.
fn is_on_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Searches for a file with the given name at provided path recursively.
fn search_for_file(entry_path: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(entry_path)
        .max_depth(MAX_SEARCH_DEPTH)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| entry.file_name().to_str() == Some(file_name))
        .map(|entry| entry.into_path())
}

/// Returns the locations of tools that are neither configured with an absolute path nor on the `PATH`.
fn find_tools(config: &serde_json::Value) -> Result<Vec<(&'static str, PathBuf)>, Error> {
    let mut found = Vec::new();
    let search_locations = get_search_locations()?;
    for (key, default_name) in SEARCHED_TOOLS {
        let configured = config["tools"][key].as_str().unwrap_or(default_name);
        if Path::new(configured).is_absolute() || is_on_path(configured) {
            continue;
        }
        println!("searching for {configured}...");
        match search_locations
            .iter()
            .find_map(|location| search_for_file(location, configured))
        {
            Some(path) => found.push((key, path)),
            None => println!("could not find {configured}, please set tools.{key} in the config file."),
        }
    }
    Ok(found)
}

/// Writes the found tool locations into the config file.
fn record_tools(config_path: &Path, tools: &[(&str, PathBuf)]) -> Result<(), Error> {
    let mut config: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(config_path)?)
        .with_context(|| format!("Parsing of {} failed", config_path.display()))?;
    for (key, path) in tools {
        println!("using {} for tools.{key}", path.display());
        config["tools"][*key] = serde_json::Value::String(path.to_string_lossy().to_string());
    }
    std::fs::write(config_path, serde_json::to_string_pretty(&config)? + "\n")?;
    Ok(())
}

/// Runs Cargo install to install taint_bench.
fn install_taint_bench() -> Result<(), Error> {
    let status = std::process::Command::new("cargo")
        .args(["install", "--path", "src/caller", "--locked"])
        .status()
        .context("Failed to install taint_bench")?;
    if !status.success() {
        return Err(anyhow!("cargo install failed with {status}"));
    }
    Ok(())
}

fn run() -> Result<(), Error> {
    let conf_dir = ProjectDirs::from("", "", "taint_bench")
        .ok_or_else(|| anyhow!("Could not discern location of configuration files."))?;
    std::fs::create_dir_all(conf_dir.config_dir())
        .with_context(|| format!("Could not create {}", conf_dir.config_dir().display()))?;

    println!("creating config.json...");
    let config_path = copy_config_json(conf_dir.config_dir())?;

    let config: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
    let tools = find_tools(&config)?;
    if !tools.is_empty() {
        record_tools(&config_path, &tools)?;
    }

    println!("installing taint_bench...");
    install_taint_bench()
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(101);
    }
}
