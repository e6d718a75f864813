use tasklens_core::config::ScoringConfig;
use tasklens_core::types::{ParsedQuery, ScoredTask, SortCriterion, Task};
use time::{Date, Duration};

/// Which scoring factors participate in this query's final score.
///
/// A factor is active when the query references it or the active sort order
/// depends on it, so sorting never operates on a silently-zeroed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorActivation {
    pub relevance: bool,
    pub due_date: bool,
    pub priority: bool,
}

impl FactorActivation {
    pub fn resolve(parsed: &ParsedQuery, resolved_sort: &[SortCriterion]) -> Self {
        Self {
            relevance: parsed.has_keywords()
                || resolved_sort.contains(&SortCriterion::Relevance),
            due_date: parsed.has_due_filter() || resolved_sort.contains(&SortCriterion::DueDate),
            priority: parsed.has_priority_filter()
                || resolved_sort.contains(&SortCriterion::Priority),
        }
    }

    fn coefficient(active: bool) -> f64 {
        if active { 1.0 } else { 0.0 }
    }
}

/// Everything one scoring pass needs. Scores are keyword-set-dependent and
/// must not be reused for a different query.
#[derive(Debug, Clone)]
pub struct ScoreContext<'a> {
    pub scoring: &'a ScoringConfig,
    pub activation: FactorActivation,
    pub today: Date,
}

/// Compute the three component scores and the weighted final score.
pub fn score_task(task: &Task, parsed: &ParsedQuery, ctx: &ScoreContext<'_>) -> ScoredTask {
    let relevance_score = relevance_score(
        &task.text,
        &parsed.core_keywords,
        &parsed.keywords,
        ctx.scoring,
    );
    let due_date_score = due_bucket_score(task.due_date, ctx.today, ctx.scoring);
    let priority_score = priority_bucket_score(task.priority, ctx.scoring);

    let final_score = relevance_score
        * FactorActivation::coefficient(ctx.activation.relevance)
        * ctx.scoring.relevance_weight
        + due_date_score
            * FactorActivation::coefficient(ctx.activation.due_date)
            * ctx.scoring.due_date_weight
        + priority_score
            * FactorActivation::coefficient(ctx.activation.priority)
            * ctx.scoring.priority_weight;

    ScoredTask {
        task: task.clone(),
        relevance_score,
        due_date_score,
        priority_score,
        final_score,
    }
}

/// Text relevance: weighted blend of the core-keyword and all-keyword match
/// ratios. Zero when the query carries no keywords.
fn relevance_score(text: &str, core: &[String], all: &[String], scoring: &ScoringConfig) -> f64 {
    let text_lower = text.to_lowercase();
    let core_ratio = match_ratio(&text_lower, core);
    let all_ratio = match_ratio(&text_lower, all);
    core_ratio * scoring.core_weight + all_ratio * scoring.all_weight
}

fn match_ratio(text_lower: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matched = keywords
        .iter()
        .filter(|keyword| text_lower.contains(keyword.as_str()))
        .count();
    matched as f64 / keywords.len() as f64
}

/// Bucketed urgency: overdue > within-week > within-month > later > none,
/// each bucket weight independently configurable.
fn due_bucket_score(due: Option<Date>, today: Date, scoring: &ScoringConfig) -> f64 {
    let buckets = &scoring.due_buckets;
    match due {
        None => buckets.none,
        Some(date) if date < today => buckets.overdue,
        Some(date) if date <= today + Duration::days(7) => buckets.within_week,
        Some(date) if date <= today + Duration::days(30) => buckets.within_month,
        Some(_) => buckets.later,
    }
}

fn priority_bucket_score(priority: Option<u8>, scoring: &ScoringConfig) -> f64 {
    let buckets = &scoring.priority_buckets;
    match priority {
        Some(1) => buckets.p1,
        Some(2) => buckets.p2,
        Some(3) => buckets.p3,
        Some(4) => buckets.p4,
        _ => buckets.none,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tasklens_core::types::StatusCategory;
    use time::macros::date;

    const TODAY: Date = date!(2026 - 08 - 07);

    fn task(text: &str, priority: Option<u8>, due: Option<Date>) -> Task {
        Task {
            id: "t".to_string(),
            text: text.to_string(),
            status: StatusCategory::Open,
            priority,
            due_date: due,
            tags: BTreeSet::new(),
            folder: String::new(),
        }
    }

    fn all_active() -> FactorActivation {
        FactorActivation {
            relevance: true,
            due_date: true,
            priority: true,
        }
    }

    #[test]
    fn relevance_blends_core_and_all_ratios() {
        let scoring = ScoringConfig::default();
        let parsed = ParsedQuery {
            core_keywords: vec!["login".to_string(), "bug".to_string()],
            keywords: vec![
                "login".to_string(),
                "bug".to_string(),
                "signin".to_string(),
                "defect".to_string(),
            ],
            ..ParsedQuery::default()
        };
        let ctx = ScoreContext {
            scoring: &scoring,
            activation: all_active(),
            today: TODAY,
        };
        let scored = score_task(&task("Fix the login bug", None, None), &parsed, &ctx);
        // core 2/2, all 2/4: 1.0 × 0.7 + 0.5 × 0.3
        assert!((scored.relevance_score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn relevance_is_zero_without_keywords() {
        let scoring = ScoringConfig::default();
        let ctx = ScoreContext {
            scoring: &scoring,
            activation: all_active(),
            today: TODAY,
        };
        let scored = score_task(
            &task("Anything at all", Some(1), None),
            &ParsedQuery::default(),
            &ctx,
        );
        assert_eq!(scored.relevance_score, 0.0);
    }

    #[test]
    fn due_buckets_order_overdue_first() {
        let scoring = ScoringConfig::default();
        let overdue = due_bucket_score(Some(date!(2026 - 08 - 01)), TODAY, &scoring);
        let week = due_bucket_score(Some(date!(2026 - 08 - 10)), TODAY, &scoring);
        let month = due_bucket_score(Some(date!(2026 - 08 - 25)), TODAY, &scoring);
        let later = due_bucket_score(Some(date!(2026 - 12 - 01)), TODAY, &scoring);
        let none = due_bucket_score(None, TODAY, &scoring);
        assert!(overdue > week && week > month && month > later && later > none);
    }

    #[test]
    fn inactive_factor_contributes_nothing() {
        let scoring = ScoringConfig::default();
        let ctx = ScoreContext {
            scoring: &scoring,
            activation: FactorActivation {
                relevance: false,
                due_date: false,
                priority: true,
            },
            today: TODAY,
        };
        let scored = score_task(
            &task("Overdue thing", Some(1), Some(date!(2026 - 08 - 01))),
            &ParsedQuery::default(),
            &ctx,
        );
        // Only priority participates: 1.0 × 1.0 (p1 bucket × main weight).
        assert!((scored.final_score - 1.0).abs() < 1e-9);
        // Component scores are still computed for diagnostics.
        assert!(scored.due_date_score > 0.0);
    }

    #[test]
    fn properties_only_final_score_combines_due_and_priority() {
        // R=20, D=4, P=1; overdue bucket 1.5, none 0.1, P1 bucket 1.0.
        let scoring = ScoringConfig::default();
        let parsed = ParsedQuery {
            priority: Some(vec!["1".to_string()]),
            ..ParsedQuery::default()
        };
        let sort = [
            SortCriterion::Relevance,
            SortCriterion::DueDate,
            SortCriterion::Priority,
        ];
        let activation = FactorActivation::resolve(&parsed, &sort);
        assert!(activation.relevance && activation.due_date && activation.priority);

        let ctx = ScoreContext {
            scoring: &scoring,
            activation,
            today: TODAY,
        };
        let scored = score_task(
            &task("Renew passport", Some(1), Some(date!(2026 - 08 - 01))),
            &parsed,
            &ctx,
        );
        assert_eq!(scored.relevance_score, 0.0);
        assert!((scored.final_score - 7.0).abs() < 1e-9);
    }

    #[test]
    fn activation_follows_query_and_sort_order() {
        let parsed = ParsedQuery {
            keywords: vec!["report".to_string()],
            ..ParsedQuery::default()
        };
        let activation = FactorActivation::resolve(&parsed, &[SortCriterion::Relevance]);
        assert!(activation.relevance);
        assert!(!activation.due_date);
        assert!(!activation.priority);

        let activation =
            FactorActivation::resolve(&parsed, &[SortCriterion::Relevance, SortCriterion::DueDate]);
        assert!(activation.due_date);
    }
}
