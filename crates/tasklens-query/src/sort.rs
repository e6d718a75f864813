use std::cmp::Ordering;
use tasklens_core::types::{ParsedQuery, QueryKind, ScoredTask, SortCriterion};

/// Replace `auto` placeholders with a concrete criterion, once per query.
///
/// keywords-only → relevance; properties-only → whichever of due-date or
/// priority the query actually carries (due-date preferred when both);
/// mixed → relevance; empty → due-date.
pub fn resolve_sort_order(
    order: &[SortCriterion],
    kind: QueryKind,
    parsed: &ParsedQuery,
) -> Vec<SortCriterion> {
    let mut resolved = Vec::with_capacity(order.len());
    for criterion in order {
        let concrete = match criterion {
            SortCriterion::Auto => resolve_auto(kind, parsed),
            other => *other,
        };
        if !resolved.contains(&concrete) {
            resolved.push(concrete);
        }
    }
    resolved
}

fn resolve_auto(kind: QueryKind, parsed: &ParsedQuery) -> SortCriterion {
    match kind {
        QueryKind::KeywordsOnly | QueryKind::Mixed => SortCriterion::Relevance,
        QueryKind::PropertiesOnly => {
            if parsed.has_due_filter() {
                SortCriterion::DueDate
            } else if parsed.has_priority_filter() {
                SortCriterion::Priority
            } else {
                SortCriterion::DueDate
            }
        }
        QueryKind::Empty => SortCriterion::DueDate,
    }
}

/// Order tasks by the resolved comparator cascade. The underlying sort is
/// stable: tasks equal under every criterion keep their pre-sort order.
pub fn sort_tasks(tasks: &mut [ScoredTask], resolved: &[SortCriterion]) {
    tasks.sort_by(|a, b| {
        for criterion in resolved {
            let ordering = compare(a, b, *criterion);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare(a: &ScoredTask, b: &ScoredTask, criterion: SortCriterion) -> Ordering {
    match criterion {
        // Descending by relevance score.
        SortCriterion::Relevance => b
            .relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal),
        // Ascending chronologically; undated tasks after all dated ones.
        SortCriterion::DueDate => match (a.task.due_date, b.task.due_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        // Ascending by numeric rank; "none" ranks lowest.
        SortCriterion::Priority => priority_rank(a).cmp(&priority_rank(b)),
        // Resolved before sorting; treat defensively as a tie if it leaks.
        SortCriterion::Auto => Ordering::Equal,
    }
}

fn priority_rank(task: &ScoredTask) -> u8 {
    task.task.priority.unwrap_or(u8::MAX)
}
