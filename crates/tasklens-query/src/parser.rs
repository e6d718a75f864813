use crate::expansion::dedupe_substring_overlap;
use crate::timectx::{self, TimeResolution};
use crate::tokenize::{generic_ratio, tokenize};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tasklens_core::config::Config;
use tasklens_core::terms::{PropertyTable, TermSnapshot};
use tasklens_core::types::{DroppedTerm, ParsedQuery, PropertyKind, VaguenessMode};
use time::Date;
use tracing::{debug, warn};

static EXPLICIT_FOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:folder|path)\s*:\s*(\S+)").expect("folder regex must compile")
});
static EXPLICIT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)tag\s*:\s*(\S+)").expect("tag regex must compile")
});
static HASH_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\p{L}\p{N}/_-]+)").expect("hashtag regex must compile"));
static EXPLICIT_DUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)due\s*:\s*(\S+)").expect("due regex must compile")
});
static EXPLICIT_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:status|s)\s*:\s*(\S+)").expect("status regex must compile")
});
static EXPLICIT_PRIORITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:priority|pri|p)\s*:\s*(\S+)").expect("priority regex must compile")
});
static PRIORITY_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:priority|pri)\s+([\p{L}\p{N}]+)")
        .expect("priority phrase regex must compile")
});

const BUILTIN_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "do", "does", "did", "i", "me",
    "my", "we", "our", "you", "your", "it", "its", "of", "in", "on", "at", "to", "for", "with",
    "and", "or", "not", "no", "this", "that", "these", "those", "what", "which", "when", "where",
    "who", "how", "why", "should", "shall", "can", "could", "would", "will", "need", "want",
    "please", "show", "all", "any", "some", "的", "了", "吗", "呢",
];

const BUILTIN_GENERIC_WORDS: &[&str] = &[
    "what", "which", "when", "where", "how", "why", "should", "shall", "do", "does", "can",
    "could", "would", "i", "me", "my", "need", "want", "now", "things", "stuff", "task", "tasks",
    "work", "item", "items", "something", "anything", "everything", "list", "show", "find",
    "tell", "give", "some", "any", "all", "please", "next", "first", "focus", "on", "什", "么",
    "做", "吗", "我", "该", "哪",
];

/// Parser inputs derived from configuration: thresholds, mode, and the merged
/// stop/generic word lists.
#[derive(Debug, Clone)]
pub struct ParserContext {
    pub vagueness_threshold: f64,
    pub mode: VaguenessMode,
    stop_words: HashSet<String>,
    generic_words: HashSet<String>,
}

impl ParserContext {
    pub fn from_config(config: &Config) -> Self {
        let mut stop_words: HashSet<String> =
            BUILTIN_STOP_WORDS.iter().map(|s| s.to_string()).collect();
        stop_words.extend(config.parser.stop_words.iter().map(|s| s.to_lowercase()));
        let mut generic_words: HashSet<String> =
            BUILTIN_GENERIC_WORDS.iter().map(|s| s.to_string()).collect();
        generic_words.extend(config.parser.generic_words.iter().map(|s| s.to_lowercase()));

        Self {
            vagueness_threshold: config.parser.vagueness_threshold,
            mode: config.vagueness_mode(),
            stop_words,
            generic_words,
        }
    }

    /// Per-query override of the session-level vagueness mode.
    pub fn with_mode(mut self, mode: VaguenessMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    pub fn generic_words(&self) -> &HashSet<String> {
        &self.generic_words
    }
}

impl Default for ParserContext {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Output of one deterministic parse: the query plus any property values that
/// resolved to nothing and were dropped from their filter.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub parsed: ParsedQuery,
    pub dropped: Vec<DroppedTerm>,
}

/// Deterministic query parsing: explicit property syntax, then a
/// natural-language term scan, then tokenization of the remainder.
///
/// Vagueness is computed over the raw token list before stop-word removal;
/// filtering the list first would destroy the signal the heuristic needs.
pub fn parse_query(
    raw: &str,
    snapshot: &TermSnapshot,
    ctx: &ParserContext,
    today: Date,
) -> ParseResult {
    let mut dropped = Vec::new();
    let mut text = raw.to_string();

    let folder = extract_values(&EXPLICIT_FOLDER_RE, &mut text)
        .into_iter()
        .next();
    let mut tags: Vec<String> = extract_values(&EXPLICIT_TAG_RE, &mut text)
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();
    for tag in extract_values(&HASH_TAG_RE, &mut text) {
        let tag = tag.to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let due_raw = extract_values(&EXPLICIT_DUE_RE, &mut text).into_iter().next();
    let status_raw = extract_values(&EXPLICIT_STATUS_RE, &mut text);
    let mut priority_raw = extract_values(&EXPLICIT_PRIORITY_RE, &mut text);
    priority_raw.extend(extract_values(&PRIORITY_PHRASE_RE, &mut text));

    let mut priority = resolve_values(snapshot, PropertyKind::Priority, &priority_raw, &mut dropped);
    let mut status = resolve_values(snapshot, PropertyKind::Status, &status_raw, &mut dropped);

    // Explicit due value: either a literal token (any/none/overdue) or a
    // relative phrase to resolve into a window below.
    let mut due_date_filter = None;
    let mut explicit_due_phrase = None;
    if let Some(raw_due) = due_raw {
        match snapshot.resolve(PropertyKind::DueDate, &raw_due) {
            Some(key @ ("any" | "none" | "overdue")) => due_date_filter = Some(key.to_string()),
            Some(key) => explicit_due_phrase = Some(key.to_string()),
            None => {
                warn!(value = %raw_due, "dropping unresolvable due filter value");
                dropped.push(DroppedTerm {
                    property: PropertyKind::DueDate,
                    value: raw_due,
                });
            }
        }
    }

    // Natural-language scan over the remaining text, skipped per property
    // when an explicit filter of that kind is already present.
    let mut rest = text.to_lowercase();
    if priority.is_none() {
        let scanned = scan_terms(&mut rest, snapshot.table(PropertyKind::Priority));
        if !scanned.is_empty() {
            priority = Some(scanned);
        }
    }
    if status.is_none() {
        let scanned = scan_terms(&mut rest, snapshot.table(PropertyKind::Status));
        if !scanned.is_empty() {
            status = Some(scanned);
        }
    }
    let time_phrase = scan_terms(&mut rest, snapshot.table(PropertyKind::TimeContext))
        .into_iter()
        .next();

    // Raw token list first: vagueness detection must see stop words.
    let raw_tokens = tokenize(&rest);
    let is_vague = match ctx.mode {
        VaguenessMode::ForcedGeneric => true,
        VaguenessMode::Auto => {
            !raw_tokens.is_empty()
                && generic_ratio(&raw_tokens, &ctx.generic_words) >= ctx.vagueness_threshold
        }
    };

    let mut core_keywords = Vec::new();
    for token in &raw_tokens {
        if !ctx.is_stop_word(token) && !core_keywords.contains(token) {
            core_keywords.push(token.clone());
        }
    }
    let keywords = dedupe_substring_overlap(core_keywords.clone());

    let mut due_date_range = None;
    let mut time_context = None;
    let force_context = ctx.mode == VaguenessMode::ForcedGeneric;
    if let Some(key) = explicit_due_phrase {
        // Explicit `due:` syntax states specific intent; only the forced
        // conversational mode downgrades it to context.
        match timectx::resolve_time_phrase(&key, today, force_context) {
            TimeResolution::Filter(range) => due_date_range = Some(range),
            TimeResolution::Context(label) => time_context = Some(label),
        }
    } else if let Some(key) = time_phrase {
        match timectx::resolve_time_phrase(&key, today, is_vague || force_context) {
            TimeResolution::Filter(range) => due_date_range = Some(range),
            TimeResolution::Context(label) => time_context = Some(label),
        }
    }

    debug!(
        raw_tokens = raw_tokens.len(),
        keywords = keywords.len(),
        is_vague,
        "deterministic parse"
    );

    ParseResult {
        parsed: ParsedQuery {
            core_keywords,
            keywords,
            priority,
            status,
            due_date_filter,
            due_date_range,
            time_context,
            is_vague,
            confidence: None,
            tags: if tags.is_empty() { None } else { Some(tags) },
            folder,
        },
        dropped,
    }
}

/// Capture every value of `re` in `text` and blank the matched spans.
fn extract_values(re: &Regex, text: &mut String) -> Vec<String> {
    let mut values = Vec::new();
    for caps in re.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            values.push(m.as_str().to_string());
        }
    }
    if !values.is_empty() {
        *text = re.replace_all(text, " ").into_owned();
    }
    values
}

/// Resolve comma-separated raw values through the registry. Unresolvable
/// tokens are dropped from the filter (and recorded), never fatal.
fn resolve_values(
    snapshot: &TermSnapshot,
    kind: PropertyKind,
    raw_values: &[String],
    dropped: &mut Vec<DroppedTerm>,
) -> Option<Vec<String>> {
    let split: Vec<String> = raw_values
        .iter()
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if split.is_empty() {
        return None;
    }

    let resolved = snapshot.resolve_many(kind, &split);
    for value in &split {
        if snapshot.resolve(kind, value).is_none() {
            warn!(property = %kind, value = %value, "dropping unresolvable property value");
            dropped.push(DroppedTerm {
                property: kind,
                value: value.clone(),
            });
        }
    }

    if resolved.is_empty() { None } else { Some(resolved) }
}

/// Find registry terms in lowercased free text, longest term first, and blank
/// each matched span. ASCII word edges require a word boundary; unspaced
/// scripts match as substrings.
fn scan_terms(text: &mut String, table: &PropertyTable) -> Vec<String> {
    let mut found = Vec::new();
    for (token, key) in table.scan_tokens() {
        let mut search_from = 0;
        while search_from < text.len() {
            let Some(pos) = text[search_from..].find(token.as_str()) else {
                break;
            };
            let start = search_from + pos;
            let end = start + token.len();
            if word_boundary_ok(text, start, end, token) {
                text.replace_range(start..end, &" ".repeat(end - start));
                if !found.contains(key) {
                    found.push(key.clone());
                }
            }
            search_from = end;
        }
    }
    found
}

fn word_boundary_ok(text: &str, start: usize, end: usize, token: &str) -> bool {
    let first_ascii_word = token.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let last_ascii_word = token.chars().next_back().is_some_and(|c| c.is_ascii_alphanumeric());

    if first_ascii_word
        && text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric())
    {
        return false;
    }
    if last_ascii_word
        && text[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric())
    {
        return false;
    }
    true
}
