use tasklens_core::config::Config;
use tasklens_core::error::SemanticError;
use tasklens_core::terms::TermSnapshot;
use tasklens_core::types::{
    NoMatchKind, ParserStrategy, QueryKind, SortCriterion, Task, VaguenessMode,
};
use tasklens_query::semantic::{SemanticParse, SemanticParseOutcome, SemanticParseRequest};
use tasklens_query::{QueryOptions, QueryResponse, run_query};
use time::Date;
use time::macros::date;

const TODAY: Date = date!(2026 - 08 - 07);

fn fixture_tasks() -> Vec<Task> {
    let path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../testdata/fixtures/tasks.json"
    );
    let content = std::fs::read_to_string(path).expect("fixture snapshot readable");
    serde_json::from_str(&content).expect("fixture snapshot parses")
}

fn run(raw: &str, options: &QueryOptions) -> QueryResponse {
    let tasks = fixture_tasks();
    let snapshot = TermSnapshot::builtin();
    run_query(&tasks, raw, &Config::default(), &snapshot, None, options, TODAY)
}

fn ids(response: &QueryResponse) -> Vec<&str> {
    response
        .results
        .iter()
        .map(|scored| scored.task.id.as_str())
        .collect()
}

struct FailingParser;

impl SemanticParse for FailingParser {
    fn parse(
        &self,
        _request: &SemanticParseRequest<'_>,
    ) -> Result<SemanticParseOutcome, SemanticError> {
        Err(SemanticError::transport("connection reset by peer"))
    }

    fn expand(
        &self,
        _keywords: &[String],
        _language: &str,
        _limit: usize,
    ) -> Result<Vec<String>, SemanticError> {
        Err(SemanticError::transport("connection reset by peer"))
    }
}

struct ExpandingParser;

impl SemanticParse for ExpandingParser {
    fn parse(
        &self,
        request: &SemanticParseRequest<'_>,
    ) -> Result<SemanticParseOutcome, SemanticError> {
        Ok(SemanticParseOutcome {
            core_keywords: vec![request.query.to_string()],
            is_vague: Some(false),
            confidence: Some(0.85),
            ..SemanticParseOutcome::default()
        })
    }

    fn expand(
        &self,
        _keywords: &[String],
        language: &str,
        _limit: usize,
    ) -> Result<Vec<String>, SemanticError> {
        match language {
            "zh" => Ok(vec!["故障".to_string()]),
            _ => Ok(vec!["defect".to_string()]),
        }
    }
}

#[test]
fn properties_only_query_passes_dynamic_threshold_with_full_sort_order() {
    // Query "priority 1", sort [relevance, dueDate, priority]: task X with an
    // overdue due date and P1 scores 0×20 + 1.5×4 + 1.0×1 = 7, max is 7,
    // threshold at 30% is 2.1, so it passes.
    let response = run(
        "priority 1",
        &QueryOptions {
            sort_override: Some(vec![
                SortCriterion::Relevance,
                SortCriterion::DueDate,
                SortCriterion::Priority,
            ]),
            ..QueryOptions::default()
        },
    );

    assert_eq!(response.query_kind, QueryKind::PropertiesOnly);
    assert!((response.max_possible_score - 7.0).abs() < 1e-9);
    assert!((response.threshold - 2.1).abs() < 1e-9);

    // All three P1 tasks are overdue, score exactly 7, and survive.
    for scored in &response.results {
        assert_eq!(scored.task.priority, Some(1));
        assert!((scored.final_score - 7.0).abs() < 1e-9);
        assert_eq!(scored.relevance_score, 0.0);
    }
    // Relevance ties across the board, so the cascade falls through to due
    // date ascending.
    assert_eq!(ids(&response), vec!["t6", "t1", "t3"]);
}

#[test]
fn failed_semantic_call_falls_back_to_tokenized_parse() {
    let tasks = fixture_tasks();
    let snapshot = TermSnapshot::builtin();
    let parser = FailingParser;
    let response = run_query(
        &tasks,
        "修复 bug",
        &Config::default(),
        &snapshot,
        Some(&parser),
        &QueryOptions {
            semantic: true,
            ..QueryOptions::default()
        },
        TODAY,
    );

    let fallback = response
        .diagnostics
        .parser_fallback
        .as_ref()
        .expect("fallback diagnostic attached");
    assert_eq!(fallback.failed, ParserStrategy::Semantic);
    assert_eq!(fallback.used, ParserStrategy::Deterministic);

    // Never one opaque keyword: the raw text is tokenized.
    assert_ne!(response.parsed.keywords, vec!["修复 bug".to_string()]);
    assert!(response.parsed.core_keywords.contains(&"bug".to_string()));
    assert!(response.parsed.core_keywords.contains(&"修".to_string()));

    assert_eq!(ids(&response), vec!["t3"]);
}

#[test]
fn vague_query_keeps_today_as_context() {
    let response = run("What should I do today?", &QueryOptions::default());

    assert!(response.parsed.is_vague);
    assert_eq!(response.parsed.time_context.as_deref(), Some("today"));
    assert!(response.parsed.due_date_range.is_none());
    assert!(response.parsed.keywords.is_empty());

    // No keyword stage ran; the query degraded to urgency ranking.
    assert!(response.stage_counts.iter().all(|s| s.stage != "keywords"));
    assert_eq!(response.resolved_sort, vec![SortCriterion::DueDate]);
    assert!(!response.results.is_empty());

    // Due dates ascend and undated tasks fall below the quality threshold.
    let dues: Vec<_> = response
        .results
        .iter()
        .map(|scored| scored.task.due_date.expect("undated tasks were cut"))
        .collect();
    let mut sorted = dues.clone();
    sorted.sort();
    assert_eq!(dues, sorted);
}

#[test]
fn status_alias_filter_is_case_insensitive() {
    let lower = run("s:o", &QueryOptions::default());
    let upper = run("S:O", &QueryOptions::default());
    assert_eq!(lower.parsed.status, Some(vec!["open".to_string()]));
    assert_eq!(upper.parsed.status, Some(vec!["open".to_string()]));
    assert_eq!(ids(&lower), ids(&upper));
    assert!(lower
        .results
        .iter()
        .all(|scored| scored.task.status.as_str() == "open"));
}

#[test]
fn explicit_filters_with_no_matches_are_terminal() {
    let response = run("p:1 s:completed", &QueryOptions::default());
    assert!(response.results.is_empty());
    assert_eq!(
        response.diagnostics.no_match,
        Some(NoMatchKind::WithPropertyFilters)
    );
}

#[test]
fn single_criterion_ties_preserve_snapshot_order() {
    // All P1 tasks tie under [priority]; the pre-sort (snapshot) order of
    // t1, t3, t6 must survive.
    let response = run(
        "priority 1",
        &QueryOptions {
            sort_override: Some(vec![SortCriterion::Priority]),
            ..QueryOptions::default()
        },
    );
    assert_eq!(ids(&response), vec!["t1", "t3", "t6"]);
}

#[test]
fn time_phrase_in_specific_query_becomes_due_filter() {
    let response = run("review this week", &QueryOptions::default());
    assert!(!response.parsed.is_vague);
    let range = response.parsed.due_date_range.expect("filter form");
    assert_eq!(range.date, date!(2026 - 08 - 09));
    // Undated and overdue tasks pass the `<=` window; the keyword stage then
    // narrows to the review task.
    assert_eq!(ids(&response), vec!["t5"]);
}

#[test]
fn mixed_query_combines_property_and_keyword_stages() {
    let response = run("s:open bug", &QueryOptions::default());
    assert_eq!(response.query_kind, QueryKind::Mixed);
    assert_eq!(ids(&response), vec!["t3"]);
    let status_stage = response
        .stage_counts
        .iter()
        .find(|s| s.stage == "status")
        .expect("status stage recorded");
    assert!(status_stage.after < status_stage.before);
}

#[test]
fn semantic_expansion_enriches_keywords_across_languages() {
    let tasks = fixture_tasks();
    let snapshot = TermSnapshot::builtin();
    let mut config = Config::default();
    config.languages.list = vec!["en".to_string(), "zh".to_string()];
    let parser = ExpandingParser;

    let response = run_query(
        &tasks,
        "bug",
        &config,
        &snapshot,
        Some(&parser),
        &QueryOptions {
            semantic: true,
            ..QueryOptions::default()
        },
        TODAY,
    );

    assert!(response.diagnostics.parser_fallback.is_none());
    assert_eq!(response.parsed.confidence, Some(0.85));
    assert!(response.parsed.keywords.contains(&"defect".to_string()));
    assert!(response.parsed.keywords.contains(&"故障".to_string()));
    // Core set stays pre-expansion.
    assert_eq!(response.parsed.core_keywords, vec!["bug".to_string()]);
    assert_eq!(ids(&response), vec!["t3"]);
}

#[test]
fn forced_generic_mode_skips_keyword_filter_when_properties_present() {
    let response = run(
        "groceries p:1",
        &QueryOptions {
            vagueness_override: Some(VaguenessMode::ForcedGeneric),
            ..QueryOptions::default()
        },
    );
    assert!(response.parsed.is_vague);
    // "groceries" matches no P1 task, but the keyword stage was skipped, so
    // the property filter alone decides.
    assert!(response.stage_counts.iter().all(|s| s.stage != "keywords"));
    assert_eq!(ids(&response).len(), 3);
}

#[test]
fn folder_and_tag_filters_compose() {
    let response = run("#dev folder:Work", &QueryOptions::default());
    assert_eq!(ids(&response), vec!["t3", "t5"]);
}
