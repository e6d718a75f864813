use tasklens_core::types::{ParsedQuery, StageCount, Task};
use time::Date;
use tracing::debug;

/// Inputs of one compound-filter pass.
#[derive(Debug, Clone, Copy)]
pub struct FilterInput<'a> {
    pub parsed: &'a ParsedQuery,
    /// Keyword-substring filtering can be skipped (vague/conversational
    /// queries with property filters present).
    pub keyword_filtering: bool,
    pub today: Date,
}

/// Apply property filters then keyword matching, in order, recording the
/// before/after count of every stage.
///
/// Property filters are strict: an empty result with explicit filters is a
/// valid terminal outcome, never relaxed or retried.
pub fn apply_filters<'a>(
    tasks: &'a [Task],
    input: &FilterInput<'_>,
) -> (Vec<&'a Task>, Vec<StageCount>) {
    let parsed = input.parsed;
    let mut survivors: Vec<&Task> = tasks.iter().collect();
    let mut stages = Vec::new();

    if let Some(priorities) = parsed.priority.as_deref().filter(|p| !p.is_empty()) {
        run_stage("priority", &mut survivors, &mut stages, |task| {
            task.priority
                .is_some_and(|p| priorities.iter().any(|key| key == &p.to_string()))
        });
    }

    if let Some(statuses) = parsed.status.as_deref().filter(|s| !s.is_empty()) {
        run_stage("status", &mut survivors, &mut stages, |task| {
            statuses.iter().any(|key| key == task.status.as_str())
        });
    }

    if let Some(token) = parsed.due_date_filter.as_deref() {
        let today = input.today;
        run_stage("due_token", &mut survivors, &mut stages, |task| {
            match token {
                "any" => task.due_date.is_some(),
                "none" => task.due_date.is_none(),
                "overdue" => task.due_date.is_some_and(|d| d < today),
                _ => true,
            }
        });
    }

    if let Some(range) = parsed.due_date_range {
        run_stage("due_range", &mut survivors, &mut stages, |task| {
            range.matches(task.due_date)
        });
    }

    if let Some(tags) = parsed.tags.as_deref().filter(|t| !t.is_empty()) {
        run_stage("tags", &mut survivors, &mut stages, |task| {
            task.tags
                .iter()
                .any(|tag| tags.iter().any(|filter| tag.eq_ignore_ascii_case(filter)))
        });
    }

    if let Some(folder) = parsed.folder.as_deref() {
        let folder_lower = folder.to_lowercase();
        run_stage("folder", &mut survivors, &mut stages, |task| {
            task.folder.to_lowercase().starts_with(&folder_lower)
        });
    }

    // Union semantics: any keyword occurring anywhere in the text keeps the
    // task.
    if input.keyword_filtering && !parsed.keywords.is_empty() {
        let keywords: Vec<String> = parsed.keywords.iter().map(|k| k.to_lowercase()).collect();
        run_stage("keywords", &mut survivors, &mut stages, |task| {
            let text = task.text.to_lowercase();
            keywords.iter().any(|keyword| text.contains(keyword))
        });
    }

    (survivors, stages)
}

fn run_stage<'a, F: Fn(&Task) -> bool>(
    stage: &'static str,
    survivors: &mut Vec<&'a Task>,
    stages: &mut Vec<StageCount>,
    keep: F,
) {
    let before = survivors.len();
    survivors.retain(|&task| keep(task));
    let after = survivors.len();
    debug!(stage, before, after, "filter stage");
    stages.push(StageCount {
        stage: stage.to_string(),
        before,
        after,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tasklens_core::types::{DueDateRange, StatusCategory};
    use time::macros::date;

    const TODAY: Date = date!(2026 - 08 - 07);

    fn task(id: &str, text: &str) -> Task {
        Task {
            id: id.to_string(),
            text: text.to_string(),
            status: StatusCategory::Open,
            priority: None,
            due_date: None,
            tags: BTreeSet::new(),
            folder: String::new(),
        }
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task {
                priority: Some(1),
                due_date: Some(date!(2026 - 08 - 01)),
                ..task("t1", "Pay the invoice")
            },
            Task {
                priority: Some(3),
                due_date: Some(date!(2026 - 08 - 20)),
                status: StatusCategory::InProgress,
                ..task("t2", "Write launch report")
            },
            Task {
                tags: BTreeSet::from(["Home".to_string()]),
                folder: "Projects/Home".to_string(),
                ..task("t3", "Fix the login bug")
            },
        ]
    }

    fn filter(parsed: &ParsedQuery, tasks: &[Task]) -> Vec<String> {
        let (kept, _) = apply_filters(
            tasks,
            &FilterInput {
                parsed,
                keyword_filtering: true,
                today: TODAY,
            },
        );
        kept.into_iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn priority_filter_is_strict() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            priority: Some(vec!["1".to_string()]),
            ..ParsedQuery::default()
        };
        assert_eq!(filter(&parsed, &tasks), vec!["t1"]);

        // No relaxation when nothing matches.
        let parsed = ParsedQuery {
            priority: Some(vec!["2".to_string()]),
            ..ParsedQuery::default()
        };
        assert!(filter(&parsed, &tasks).is_empty());
    }

    #[test]
    fn status_filter_matches_canonical_keys() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            status: Some(vec!["in_progress".to_string()]),
            ..ParsedQuery::default()
        };
        assert_eq!(filter(&parsed, &tasks), vec!["t2"]);
    }

    #[test]
    fn overdue_token_compares_against_today() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            due_date_filter: Some("overdue".to_string()),
            ..ParsedQuery::default()
        };
        assert_eq!(filter(&parsed, &tasks), vec!["t1"]);
    }

    #[test]
    fn due_range_on_or_before_keeps_undated_tasks() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            due_date_range: Some(DueDateRange::on_or_before(date!(2026 - 08 - 09))),
            ..ParsedQuery::default()
        };
        // t1 is overdue, t3 undated; t2 is beyond the anchor.
        assert_eq!(filter(&parsed, &tasks), vec!["t1", "t3"]);
    }

    #[test]
    fn keyword_matching_is_case_insensitive_union() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            keywords: vec!["LOGIN".to_lowercase(), "invoice".to_string()],
            ..ParsedQuery::default()
        };
        assert_eq!(filter(&parsed, &tasks), vec!["t1", "t3"]);
    }

    #[test]
    fn keyword_stage_can_be_skipped() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            keywords: vec!["nonexistent".to_string()],
            priority: Some(vec!["1".to_string()]),
            ..ParsedQuery::default()
        };
        let (kept, stages) = apply_filters(
            &tasks,
            &FilterInput {
                parsed: &parsed,
                keyword_filtering: false,
                today: TODAY,
            },
        );
        assert_eq!(kept.len(), 1);
        assert!(stages.iter().all(|s| s.stage != "keywords"));
    }

    #[test]
    fn tag_and_folder_filters_are_case_insensitive() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            tags: Some(vec!["home".to_string()]),
            ..ParsedQuery::default()
        };
        assert_eq!(filter(&parsed, &tasks), vec!["t3"]);

        let parsed = ParsedQuery {
            folder: Some("projects/".to_string()),
            ..ParsedQuery::default()
        };
        assert_eq!(filter(&parsed, &tasks), vec!["t3"]);
    }

    #[test]
    fn stage_counts_record_the_funnel() {
        let tasks = sample_tasks();
        let parsed = ParsedQuery {
            status: Some(vec!["open".to_string()]),
            keywords: vec!["login".to_string()],
            ..ParsedQuery::default()
        };
        let (_, stages) = apply_filters(
            &tasks,
            &FilterInput {
                parsed: &parsed,
                keyword_filtering: true,
                today: TODAY,
            },
        );
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].stage, "status");
        assert_eq!(stages[0].before, 3);
        assert_eq!(stages[0].after, 2);
        assert_eq!(stages[1].stage, "keywords");
        assert_eq!(stages[1].after, 1);
    }
}
