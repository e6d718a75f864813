use crate::scoring::FactorActivation;
use tasklens_core::config::{QualityConfig, ScoringConfig};
use tasklens_core::types::{ParsedQuery, QueryKind, ScoredTask};
use tracing::debug;

/// Classify a query by what it actually references. Classification ignores
/// sort-order activation on purpose: a factor that is only active because the
/// user sorts by it does not change the query's nature.
pub fn classify_query(parsed: &ParsedQuery) -> QueryKind {
    match (parsed.has_keywords(), parsed.has_property_filters()) {
        (true, true) => QueryKind::Mixed,
        (true, false) => QueryKind::KeywordsOnly,
        (false, true) => QueryKind::PropertiesOnly,
        (false, false) => QueryKind::Empty,
    }
}

/// Threshold computation outcome for one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThreshold {
    pub max_possible_score: f64,
    pub strength: f64,
    pub threshold: f64,
    /// Whether the relevance component participated in the maximum.
    pub relevance_counted: bool,
}

/// Compute the best final score any task could reach under the active
/// coefficients, then derive the quality threshold from it.
///
/// Relevance only counts toward the maximum when the query has keywords and
/// keyword matching is actually in effect: with an empty keyword set the
/// relevance component is identically zero even when the sort order keeps its
/// coefficient active, and a skipped keyword stage (vague/conversational
/// queries with property filters) must not inflate the bar past what any
/// surviving task can reach.
pub fn compute_threshold(
    parsed: &ParsedQuery,
    activation: FactorActivation,
    keyword_filtering: bool,
    scoring: &ScoringConfig,
    quality: &QualityConfig,
) -> QualityThreshold {
    let relevance_counted = activation.relevance && parsed.has_keywords() && keyword_filtering;
    let mut max_possible_score = 0.0;
    if relevance_counted {
        max_possible_score += (scoring.core_weight + scoring.all_weight) * scoring.relevance_weight;
    }
    if activation.due_date {
        max_possible_score += scoring.due_buckets.max_weight() * scoring.due_date_weight;
    }
    if activation.priority {
        max_possible_score += scoring.priority_buckets.max_weight() * scoring.priority_weight;
    }

    let strength = if quality.adaptive {
        adaptive_strength(quality.strength, parsed.keywords.len())
    } else {
        quality.strength
    };
    let threshold = strength * max_possible_score;
    debug!(max_possible_score, strength, threshold, "quality threshold");

    QualityThreshold {
        max_possible_score,
        strength,
        threshold,
        relevance_counted,
    }
}

/// Fewer keywords means exact matches are rarer, so the relative bar drops
/// proportionally. Monotone in the keyword count, capped at the base.
fn adaptive_strength(base: f64, keyword_count: usize) -> f64 {
    if keyword_count == 0 {
        return base;
    }
    base * (0.4 + 0.15 * keyword_count as f64).min(1.0)
}

/// Discard tasks below the dynamic threshold, then apply the optional
/// independent minimum-relevance cut.
///
/// The relevance cut is expressed as a fraction of the relevance component's
/// own theoretical maximum (`core_weight + all_weight`) and keeps an
/// urgent-but-irrelevant task from surviving purely on date/priority weight.
pub fn apply_quality_filter(
    scored: Vec<ScoredTask>,
    threshold: &QualityThreshold,
    scoring: &ScoringConfig,
    quality: &QualityConfig,
) -> Vec<ScoredTask> {
    let before = scored.len();
    let mut kept: Vec<ScoredTask> = scored
        .into_iter()
        .filter(|task| task.final_score >= threshold.threshold)
        .collect();

    if quality.min_relevance > 0.0 && threshold.relevance_counted {
        let relevance_floor = quality.min_relevance * (scoring.core_weight + scoring.all_weight);
        kept.retain(|task| task.relevance_score >= relevance_floor);
    }

    debug!(before, after = kept.len(), "quality filter");
    kept
}
