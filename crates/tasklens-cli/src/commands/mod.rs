pub mod analyze;
pub mod search;
pub mod terms;

use anyhow::{Context, Result};
use std::path::Path;
use tasklens_core::types::Task;

/// Load the task snapshot the external vault indexer exported.
pub fn load_tasks(path: &str) -> Result<Vec<Task>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task snapshot: {path}"))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid task snapshot JSON: {path}"))
}

pub fn today() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}

pub fn load_config(config_file: Option<&Path>) -> Result<tasklens_core::config::Config> {
    let cwd = std::env::current_dir()?;
    Ok(tasklens_core::config::Config::load_with_file(
        Some(&cwd),
        config_file,
    )?)
}
