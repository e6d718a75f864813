use crate::filter::{FilterInput, apply_filters};
use crate::parser::{ParserContext, parse_query};
use crate::quality::{apply_quality_filter, classify_query, compute_threshold};
use crate::scoring::{FactorActivation, ScoreContext, score_task};
use crate::semantic::{ParseExecution, SemanticParse, parse_with_semantic};
use crate::sort::{resolve_sort_order, sort_tasks};
use serde::Serialize;
use tasklens_core::config::Config;
use tasklens_core::constants;
use tasklens_core::terms::TermSnapshot;
use tasklens_core::types::{
    NoMatchKind, ParsedQuery, ParserFallback, ParserStrategy, QueryDiagnostics, QueryKind,
    ScoredTask, SortCriterion, StageCount, Task, VaguenessMode,
};
use time::Date;
use tracing::debug;

/// Per-request knobs layered over the session configuration.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Use the AI-assisted parse strategy (falls back on failure).
    pub semantic: bool,
    /// Per-query override of the session vagueness mode.
    pub vagueness_override: Option<VaguenessMode>,
    /// Per-query override of the configured sort order.
    pub sort_override: Option<Vec<SortCriterion>>,
    pub limit: Option<usize>,
}

/// Everything one query run produces: the ordered results plus enough
/// structure for a caller to explain them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub results: Vec<ScoredTask>,
    pub parsed: ParsedQuery,
    pub query_kind: QueryKind,
    pub resolved_sort: Vec<SortCriterion>,
    pub max_possible_score: f64,
    pub threshold: f64,
    pub total_candidates: usize,
    pub stage_counts: Vec<StageCount>,
    pub diagnostics: QueryDiagnostics,
}

/// Run the full pipeline: parse -> filter -> score -> quality-cut -> sort.
///
/// Pure and synchronous apart from the optional semantic call; `tasks` is an
/// immutable snapshot and nothing is cached across queries.
pub fn run_query(
    tasks: &[Task],
    raw: &str,
    config: &Config,
    snapshot: &TermSnapshot,
    semantic_parser: Option<&dyn SemanticParse>,
    options: &QueryOptions,
    today: Date,
) -> QueryResponse {
    let mut ctx = ParserContext::from_config(config);
    if let Some(mode) = options.vagueness_override {
        ctx = ctx.with_mode(mode);
    }

    let execution = match (options.semantic, semantic_parser) {
        (true, Some(parser)) => parse_with_semantic(
            raw,
            snapshot,
            &ctx,
            &config.languages.list,
            config.languages.expansions_per_language,
            parser,
            today,
        ),
        (true, None) => {
            // Semantic requested but unavailable: degrade like a failed call.
            let mut execution = ParseExecution::deterministic(parse_query(raw, snapshot, &ctx, today));
            execution.fallback = Some(ParserFallback {
                failed: ParserStrategy::Semantic,
                reason: "semantic_disabled".to_string(),
                used: ParserStrategy::Deterministic,
            });
            execution
        }
        (false, _) => ParseExecution::deterministic(parse_query(raw, snapshot, &ctx, today)),
    };
    let parsed = execution.parsed;

    let query_kind = classify_query(&parsed);
    let sort_order = options
        .sort_override
        .clone()
        .unwrap_or_else(|| config.sort_order());
    let resolved_sort = resolve_sort_order(&sort_order, query_kind, &parsed);
    let activation = FactorActivation::resolve(&parsed, &resolved_sort);

    // Forced-generic queries skip keyword-substring filtering whenever any
    // property filter is present, so context keywords cannot empty the result.
    let keyword_filtering =
        !(ctx.mode == VaguenessMode::ForcedGeneric && parsed.has_property_filters());
    let (survivors, stage_counts) = apply_filters(
        tasks,
        &FilterInput {
            parsed: &parsed,
            keyword_filtering,
            today,
        },
    );
    let total_candidates = survivors.len();

    let score_ctx = ScoreContext {
        scoring: &config.scoring,
        activation,
        today,
    };
    let scored: Vec<ScoredTask> = survivors
        .into_iter()
        .map(|task| score_task(task, &parsed, &score_ctx))
        .collect();

    let threshold = compute_threshold(
        &parsed,
        activation,
        keyword_filtering,
        &config.scoring,
        &config.quality,
    );
    let mut results = apply_quality_filter(scored, &threshold, &config.scoring, &config.quality);

    sort_tasks(&mut results, &resolved_sort);
    results.truncate(options.limit.unwrap_or(constants::DEFAULT_RESULT_LIMIT));

    let no_match = if results.is_empty() {
        Some(if parsed.has_property_filters() {
            NoMatchKind::WithPropertyFilters
        } else {
            NoMatchKind::NoFilters
        })
    } else {
        None
    };

    debug!(
        query = raw,
        ?query_kind,
        results = results.len(),
        total_candidates,
        threshold = threshold.threshold,
        "run_query"
    );

    QueryResponse {
        results,
        parsed,
        query_kind,
        resolved_sort,
        max_possible_score: threshold.max_possible_score,
        threshold: threshold.threshold,
        total_candidates,
        stage_counts,
        diagnostics: QueryDiagnostics {
            parser_fallback: execution.fallback,
            dropped_terms: execution.dropped,
            expansion_degraded: execution.expansion_degraded,
            no_match,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tasklens_core::types::StatusCategory;
    use time::macros::date;

    const TODAY: Date = date!(2026 - 08 - 07);

    fn task(id: &str, text: &str, priority: Option<u8>, due: Option<Date>) -> Task {
        Task {
            id: id.to_string(),
            text: text.to_string(),
            status: StatusCategory::Open,
            priority,
            due_date: due,
            tags: BTreeSet::new(),
            folder: String::new(),
        }
    }

    fn run(tasks: &[Task], raw: &str, options: &QueryOptions) -> QueryResponse {
        let snapshot = TermSnapshot::builtin();
        run_query(tasks, raw, &Config::default(), &snapshot, None, options, TODAY)
    }

    #[test]
    fn keyword_query_filters_and_ranks() {
        let tasks = vec![
            task("t1", "Write the launch report", None, None),
            task("t2", "Buy groceries", None, None),
        ];
        let response = run(&tasks, "launch report", &QueryOptions::default());
        assert_eq!(response.query_kind, QueryKind::KeywordsOnly);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].task.id, "t1");
        assert_eq!(response.resolved_sort, vec![SortCriterion::Relevance]);
    }

    #[test]
    fn empty_result_with_filters_is_a_valid_terminal_outcome() {
        let tasks = vec![task("t1", "Anything", Some(3), None)];
        let response = run(&tasks, "p:1", &QueryOptions::default());
        assert!(response.results.is_empty());
        assert_eq!(
            response.diagnostics.no_match,
            Some(NoMatchKind::WithPropertyFilters)
        );
    }

    #[test]
    fn empty_result_without_filters_is_reported_distinctly() {
        let tasks = vec![task("t1", "Anything", None, None)];
        let response = run(&tasks, "quixotic zanzibar", &QueryOptions::default());
        assert!(response.results.is_empty());
        assert_eq!(response.diagnostics.no_match, Some(NoMatchKind::NoFilters));
    }

    #[test]
    fn semantic_request_without_parser_degrades_with_note() {
        let tasks = vec![task("t1", "Fix login bug", None, None)];
        let response = run(
            &tasks,
            "login",
            &QueryOptions {
                semantic: true,
                ..QueryOptions::default()
            },
        );
        assert_eq!(response.results.len(), 1);
        let fallback = response.diagnostics.parser_fallback.expect("note");
        assert_eq!(fallback.reason, "semantic_disabled");
        assert_eq!(fallback.used, ParserStrategy::Deterministic);
    }

    #[test]
    fn limit_truncates_after_sorting() {
        let tasks: Vec<Task> = (0..10)
            .map(|i| task(&format!("t{i}"), "report", None, None))
            .collect();
        let response = run(
            &tasks,
            "report",
            &QueryOptions {
                limit: Some(3),
                ..QueryOptions::default()
            },
        );
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.total_candidates, 10);
    }
}
