use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::Date;

/// A task record supplied by the external vault index.
///
/// Treated as an immutable snapshot for the duration of one query; the engine
/// never mutates task records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub status: StatusCategory,
    /// 1 = highest, 4 = lowest; absent when the task carries no priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub folder: String,
}

/// Status categories recognized by TaskLens.
///
/// The built-in variants cover the common vault conventions; user-configured
/// categories round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Open,
    InProgress,
    Completed,
    Cancelled,
    #[serde(untagged)]
    Other(String),
}

impl StatusCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Other(key) => key,
        }
    }

    /// Map a canonical category key back to a status. Unknown keys become
    /// `Other` so configuration-defined categories keep working.
    pub fn from_key(key: &str) -> Self {
        match key {
            "open" => Self::Open,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Properties the term registry resolves raw tokens against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Priority,
    Status,
    DueDate,
    TimeContext,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Status => "status",
            Self::DueDate => "due_date",
            Self::TimeContext => "time_context",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "priority" | "p" | "pri" => Some(Self::Priority),
            "status" | "s" => Some(Self::Status),
            "due_date" | "due" => Some(Self::DueDate),
            "time_context" | "time" => Some(Self::TimeContext),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a due-date range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeOperator {
    #[serde(rename = "<=")]
    OnOrBefore,
    #[serde(rename = ">=")]
    OnOrAfter,
    #[serde(rename = "between")]
    Between,
}

/// A concrete, filterable due-date window produced by the time-context
/// resolver or an explicit `due:` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateRange {
    pub operator: RangeOperator,
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Date>,
}

impl DueDateRange {
    pub fn on_or_before(date: Date) -> Self {
        Self {
            operator: RangeOperator::OnOrBefore,
            date,
            end_date: None,
        }
    }

    pub fn on_or_after(date: Date) -> Self {
        Self {
            operator: RangeOperator::OnOrAfter,
            date,
            end_date: None,
        }
    }

    pub fn between(start: Date, end: Date) -> Self {
        Self {
            operator: RangeOperator::Between,
            date: start,
            end_date: Some(end),
        }
    }

    /// Whether a task due date falls inside this window.
    ///
    /// `<=` means "everything needing attention by this point": undated tasks
    /// and tasks already overdue relative to the anchor are both included.
    /// `between` and `>=` describe explicit windows and exclude undated tasks.
    pub fn matches(&self, due: Option<Date>) -> bool {
        match self.operator {
            RangeOperator::OnOrBefore => due.is_none_or(|d| d <= self.date),
            RangeOperator::OnOrAfter => due.is_some_and(|d| d >= self.date),
            RangeOperator::Between => {
                let end = self.end_date.unwrap_or(self.date);
                due.is_some_and(|d| d >= self.date && d <= end)
            }
        }
    }
}

/// The structured result of parsing one free-text query.
///
/// Created fresh per query and never persisted or reused. Every field keeps
/// explicit absent-vs-empty semantics because the AI strategy may return a
/// partial object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Keywords as extracted from the query, post-stopword, pre-expansion.
    #[serde(default)]
    pub core_keywords: Vec<String>,
    /// Final expanded, substring-deduplicated set used for matching.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Canonical priority category keys ("1".."4").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Vec<String>>,
    /// Canonical status category keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,
    /// Canonical due token: "any", "none" or "overdue".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_range: Option<DueDateRange>,
    /// Present only when a time phrase was *not* converted into a filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_context: Option<String>,
    #[serde(default)]
    pub is_vague: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl ParsedQuery {
    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }

    pub fn has_priority_filter(&self) -> bool {
        self.priority.as_ref().is_some_and(|v| !v.is_empty())
    }

    pub fn has_status_filter(&self) -> bool {
        self.status.as_ref().is_some_and(|v| !v.is_empty())
    }

    pub fn has_due_filter(&self) -> bool {
        self.due_date_filter.is_some() || self.due_date_range.is_some()
    }

    /// Any explicit property filter (priority/status/due/tags/folder).
    pub fn has_property_filters(&self) -> bool {
        self.has_priority_filter()
            || self.has_status_filter()
            || self.has_due_filter()
            || self.tags.as_ref().is_some_and(|v| !v.is_empty())
            || self.folder.is_some()
    }
}

/// One task with the component scores of a single scoring pass.
///
/// Ephemeral: scores depend on the query's keyword set and must never be
/// cached across queries.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTask {
    pub task: Task,
    pub relevance_score: f64,
    pub due_date_score: f64,
    pub priority_score: f64,
    pub final_score: f64,
}

/// User-configurable sort criteria. `Auto` is resolved once per query before
/// sorting and never reaches the comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriterion {
    Relevance,
    DueDate,
    Priority,
    Auto,
}

impl SortCriterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::DueDate => "due_date",
            Self::Priority => "priority",
            Self::Auto => "auto",
        }
    }

    pub fn parse_criterion(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(Self::Relevance),
            "due_date" | "due-date" | "duedate" | "due" => Some(Self::DueDate),
            "priority" => Some(Self::Priority),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query classification driving auto-sort resolution and threshold math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    KeywordsOnly,
    PropertiesOnly,
    Mixed,
    Empty,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordsOnly => "keywords_only",
            Self::PropertiesOnly => "properties_only",
            Self::Mixed => "mixed",
            Self::Empty => "empty",
        }
    }
}

/// Which parser produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserStrategy {
    Deterministic,
    Semantic,
}

impl ParserStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Semantic => "semantic",
        }
    }
}

/// Vagueness detection mode: detect (`Auto`) or force every query to be
/// treated as generic (`ForcedGeneric`, the conversational mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaguenessMode {
    #[default]
    Auto,
    ForcedGeneric,
}

impl VaguenessMode {
    pub fn parse_mode(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "forced-generic" | "forced_generic" | "forced" => Some(Self::ForcedGeneric),
            _ => None,
        }
    }
}

/// Structured note describing a parser fallback. Attached to diagnostics,
/// never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserFallback {
    pub failed: ParserStrategy,
    pub reason: String,
    pub used: ParserStrategy,
}

/// A property value that resolved to no canonical category and was dropped
/// from its filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedTerm {
    pub property: PropertyKind,
    pub value: String,
}

/// Distinguishes the two empty-result terminal states so callers can present
/// different guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchKind {
    /// Explicit property filters were present; an empty set is a valid answer.
    WithPropertyFilters,
    /// Nothing matched a plain keyword query.
    NoFilters,
}

/// Non-fatal findings accumulated while answering one query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryDiagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_fallback: Option<ParserFallback>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_terms: Vec<DroppedTerm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion_degraded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_match: Option<NoMatchKind>,
}

/// Before/after count of one compound-filter stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: String,
    pub before: usize,
    pub after: usize,
}
