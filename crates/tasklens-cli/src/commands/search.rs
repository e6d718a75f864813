use anyhow::Result;
use std::path::Path;
use tasklens_core::terms::TermRegistry;
use tasklens_core::types::SortCriterion;
use tasklens_query::semantic::{HttpSemanticParser, SemanticParse};
use tasklens_query::{QueryOptions, QueryResponse, run_query};
use tracing::warn;

pub fn run(
    query: &str,
    tasks_path: &str,
    semantic: bool,
    sort: Option<&str>,
    limit: Option<usize>,
    json: bool,
    config_file: Option<&Path>,
) -> Result<()> {
    let config = super::load_config(config_file)?;
    let tasks = super::load_tasks(tasks_path)?;
    let registry = TermRegistry::new(&config.terms);
    let snapshot = registry.snapshot();

    let sort_override = sort.map(parse_sort_list).transpose()?;

    // A missing/disabled semantic configuration is not fatal: the engine
    // degrades to the deterministic parser and says so in diagnostics.
    let http_parser = if semantic {
        match HttpSemanticParser::from_config(&config.semantic) {
            Ok(parser) => Some(parser),
            Err(err) => {
                warn!(error = %err, "semantic parser unavailable");
                None
            }
        }
    } else {
        None
    };
    let semantic_parser = http_parser.as_ref().map(|p| p as &dyn SemanticParse);

    let response = run_query(
        &tasks,
        query,
        &config,
        &snapshot,
        semantic_parser,
        &QueryOptions {
            semantic,
            vagueness_override: None,
            sort_override,
            limit,
        },
        super::today(),
    );

    print_response(&response, json)
}

fn parse_sort_list(raw: &str) -> Result<Vec<SortCriterion>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            SortCriterion::parse_criterion(s)
                .ok_or_else(|| anyhow::anyhow!("unknown sort criterion: {s}"))
        })
        .collect()
}

pub fn print_response(response: &QueryResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    if let Some(fallback) = &response.diagnostics.parser_fallback {
        println!(
            "note: {} parser failed ({}), used {} parser",
            fallback.failed.as_str(),
            fallback.reason,
            fallback.used.as_str()
        );
    }
    for dropped in &response.diagnostics.dropped_terms {
        println!(
            "note: dropped unresolvable {} value \"{}\"",
            dropped.property, dropped.value
        );
    }

    if response.results.is_empty() {
        match response.diagnostics.no_match {
            Some(tasklens_core::types::NoMatchKind::WithPropertyFilters) => {
                println!("No tasks match the requested property filters.");
            }
            _ => println!("No tasks match this query. Try broader terms."),
        }
        return Ok(());
    }

    println!(
        "{} result(s) · {} query · sort: {}",
        response.results.len(),
        response.query_kind.as_str(),
        response
            .resolved_sort
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    );
    for scored in &response.results {
        let due = scored
            .task
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let priority = scored
            .task
            .priority
            .map(|p| format!("P{p}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{:>5.2}] {}  (due {due}, {priority}, {})",
            scored.final_score,
            scored.task.text,
            scored.task.status.as_str()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_list_parses_aliases() {
        let parsed = parse_sort_list("due, priority").unwrap();
        assert_eq!(parsed, vec![SortCriterion::DueDate, SortCriterion::Priority]);
        assert!(parse_sort_list("due, bogus").is_err());
    }
}
