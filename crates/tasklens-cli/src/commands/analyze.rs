use anyhow::Result;
use std::path::Path;
use tasklens_core::terms::TermRegistry;
use tasklens_core::types::VaguenessMode;
use tasklens_query::{QueryOptions, run_query};

/// Conversational analysis: vagueness is forced, time phrases stay context,
/// and keyword filtering relaxes when property filters are present.
pub fn run(
    query: &str,
    tasks_path: &str,
    limit: Option<usize>,
    json: bool,
    config_file: Option<&Path>,
) -> Result<()> {
    let config = super::load_config(config_file)?;
    let tasks = super::load_tasks(tasks_path)?;
    let registry = TermRegistry::new(&config.terms);
    let snapshot = registry.snapshot();

    let response = run_query(
        &tasks,
        query,
        &config,
        &snapshot,
        None,
        &QueryOptions {
            semantic: false,
            vagueness_override: Some(VaguenessMode::ForcedGeneric),
            sort_override: None,
            limit,
        },
        super::today(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if let Some(context) = &response.parsed.time_context {
        println!("context: {context}");
    }
    super::search::print_response(&response, false)
}
