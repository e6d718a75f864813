use crate::types::PropertyKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Terms attached to one canonical category: plain aliases, single-character
/// symbols, and per-language synonym lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
}

/// User-authored term additions, layered over the built-in tables.
///
/// Editable at any time; callers must rebuild the registry synchronously
/// before the next parse (a stale merged table is a correctness bug).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTermConfig {
    #[serde(default)]
    pub priority: BTreeMap<String, TermEntry>,
    #[serde(default)]
    pub status: BTreeMap<String, TermEntry>,
    #[serde(default)]
    pub due_date: BTreeMap<String, TermEntry>,
    #[serde(default)]
    pub time_context: BTreeMap<String, TermEntry>,
}

impl UserTermConfig {
    fn table(&self, kind: PropertyKind) -> &BTreeMap<String, TermEntry> {
        match kind {
            PropertyKind::Priority => &self.priority,
            PropertyKind::Status => &self.status,
            PropertyKind::DueDate => &self.due_date,
            PropertyKind::TimeContext => &self.time_context,
        }
    }
}

/// Merged lookup table for one property.
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    entries: BTreeMap<String, TermEntry>,
    /// Lowercased raw token -> canonical key. Insertion precedence: canonical
    /// keys, then aliases and synonyms, then symbols; first insertion wins.
    lookup: HashMap<String, String>,
    /// Tokens usable by the natural-language scan, longest first. Symbols and
    /// single-letter ASCII aliases are excluded (too noisy in free text).
    scan_tokens: Vec<(String, String)>,
}

impl PropertyTable {
    fn build(builtin: &BTreeMap<String, TermEntry>, user: &BTreeMap<String, TermEntry>) -> Self {
        let mut entries = builtin.clone();
        let canonical_lower: Vec<String> = entries
            .keys()
            .chain(user.keys())
            .map(|k| k.to_lowercase())
            .collect();

        for (key, addition) in user {
            let merged = entries.entry(key.clone()).or_default();
            for alias in &addition.aliases {
                // A user alias never shadows a canonical category key.
                if canonical_lower.iter().any(|k| k == &alias.to_lowercase()) {
                    debug!(property_key = %key, alias = %alias, "skipping alias that shadows a category key");
                    continue;
                }
                if !merged.aliases.contains(alias) {
                    merged.aliases.push(alias.clone());
                }
            }
            for symbol in &addition.symbols {
                if !merged.symbols.contains(symbol) {
                    merged.symbols.push(symbol.clone());
                }
            }
            for (language, synonyms) in &addition.synonyms {
                let slot = merged.synonyms.entry(language.clone()).or_default();
                for synonym in synonyms {
                    if !slot.contains(synonym) {
                        slot.push(synonym.clone());
                    }
                }
            }
        }

        let mut lookup = HashMap::new();
        let mut insert = |token: &str, key: &str| {
            let token = token.trim().to_lowercase();
            if !token.is_empty() {
                lookup.entry(token).or_insert_with(|| key.to_string());
            }
        };
        for key in entries.keys() {
            insert(key, key);
        }
        for (key, entry) in &entries {
            for alias in &entry.aliases {
                insert(alias, key);
            }
            for synonyms in entry.synonyms.values() {
                for synonym in synonyms {
                    insert(synonym, key);
                }
            }
        }
        for (key, entry) in &entries {
            for symbol in &entry.symbols {
                insert(symbol, key);
            }
        }

        let mut scan_tokens: Vec<(String, String)> = lookup
            .iter()
            .filter(|(token, _)| {
                let single_ascii = token.chars().count() == 1 && token.is_ascii();
                let is_symbol = entries
                    .values()
                    .any(|entry| entry.symbols.iter().any(|s| s.to_lowercase() == **token));
                !single_ascii && !is_symbol
            })
            .map(|(token, key)| (token.clone(), key.clone()))
            .collect();
        scan_tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            entries,
            lookup,
            scan_tokens,
        }
    }

    /// Resolve one raw token to its canonical category key.
    ///
    /// Precedence: exact canonical key, then aliases/synonyms, then symbols.
    /// Case-insensitive; canonical keys resolve to themselves.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.lookup.get(&raw.trim().to_lowercase()).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, TermEntry> {
        &self.entries
    }

    pub fn scan_tokens(&self) -> &[(String, String)] {
        &self.scan_tokens
    }
}

/// Immutable merged view of all property tables.
///
/// Every query captures one snapshot and parses against it for its entire
/// lifetime; registry rebuilds never mutate a published snapshot.
#[derive(Debug, Clone)]
pub struct TermSnapshot {
    version: u64,
    fingerprint: String,
    tables: BTreeMap<PropertyKind, PropertyTable>,
}

const ALL_PROPERTIES: [PropertyKind; 4] = [
    PropertyKind::Priority,
    PropertyKind::Status,
    PropertyKind::DueDate,
    PropertyKind::TimeContext,
];

impl TermSnapshot {
    fn build(user: &UserTermConfig, version: u64) -> Arc<Self> {
        let mut tables = BTreeMap::new();
        let mut hasher = blake3::Hasher::new();
        for kind in ALL_PROPERTIES {
            let table = PropertyTable::build(&builtin_table(kind), user.table(kind));
            hasher.update(kind.as_str().as_bytes());
            // entries is a BTreeMap, so the serialization is order-stable.
            if let Ok(serialized) = serde_json::to_vec(&table.entries) {
                hasher.update(&serialized);
            }
            tables.insert(kind, table);
        }
        Arc::new(Self {
            version,
            fingerprint: hasher.finalize().to_hex()[..16].to_string(),
            tables,
        })
    }

    /// Built-in tables only, no user layer.
    pub fn builtin() -> Arc<Self> {
        Self::build(&UserTermConfig::default(), 1)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn table(&self, kind: PropertyKind) -> &PropertyTable {
        &self.tables[&kind]
    }

    pub fn resolve(&self, kind: PropertyKind, raw: &str) -> Option<&str> {
        self.table(kind).resolve(raw)
    }

    /// Resolve a list of raw tokens, deduplicated, original order preserved.
    /// Unresolvable tokens are skipped; the caller decides whether that is
    /// worth a diagnostic.
    pub fn resolve_many<S: AsRef<str>>(&self, kind: PropertyKind, values: &[S]) -> Vec<String> {
        let mut resolved = Vec::new();
        for value in values {
            if let Some(key) = self.resolve(kind, value.as_ref())
                && !resolved.iter().any(|existing| existing == key)
            {
                resolved.push(key.to_string());
            }
        }
        resolved
    }
}

/// Read-many/write-rare holder of the current merged snapshot.
///
/// `rebuild` constructs a complete replacement off to the side and swaps it
/// in one store, so an in-flight query never observes a half-updated table.
#[derive(Debug)]
pub struct TermRegistry {
    current: RwLock<Arc<TermSnapshot>>,
}

impl TermRegistry {
    pub fn new(user: &UserTermConfig) -> Self {
        Self {
            current: RwLock::new(TermSnapshot::build(user, 1)),
        }
    }

    /// The snapshot queries should capture. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<TermSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rebuild the merged table from changed user configuration. Must be
    /// called synchronously before the next parse after any term edit.
    pub fn rebuild(&self, user: &UserTermConfig) {
        let next_version = self.snapshot().version() + 1;
        let next = TermSnapshot::build(user, next_version);
        debug!(
            version = next.version(),
            fingerprint = %next.fingerprint(),
            "term snapshot rebuilt"
        );
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = next;
    }
}

impl Default for TermRegistry {
    fn default() -> Self {
        Self::new(&UserTermConfig::default())
    }
}

fn entry(aliases: &[&str], symbols: &[&str], synonyms: &[(&str, &[&str])]) -> TermEntry {
    TermEntry {
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        synonyms: synonyms
            .iter()
            .map(|(language, words)| {
                (
                    language.to_string(),
                    words.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect(),
    }
}

fn builtin_table(kind: PropertyKind) -> BTreeMap<String, TermEntry> {
    match kind {
        PropertyKind::Priority => builtin_priority(),
        PropertyKind::Status => builtin_status(),
        PropertyKind::DueDate => builtin_due_date(),
        PropertyKind::TimeContext => builtin_time_context(),
    }
}

fn builtin_priority() -> BTreeMap<String, TermEntry> {
    BTreeMap::from([
        (
            "1".to_string(),
            entry(
                &["p1", "highest", "urgent", "critical"],
                &["🔺"],
                &[("zh", &["紧急", "最高"]), ("es", &["urgente"])],
            ),
        ),
        (
            "2".to_string(),
            entry(
                &["p2", "high", "important"],
                &["⏫"],
                &[("zh", &["高"]), ("es", &["alta"])],
            ),
        ),
        (
            "3".to_string(),
            entry(
                &["p3", "medium", "normal"],
                &["🔼"],
                &[("zh", &["中"]), ("es", &["media"])],
            ),
        ),
        (
            "4".to_string(),
            entry(
                &["p4", "low", "minor"],
                &["🔽", "⏬"],
                &[("zh", &["低"]), ("es", &["baja"])],
            ),
        ),
    ])
}

fn builtin_status() -> BTreeMap<String, TermEntry> {
    BTreeMap::from([
        (
            "open".to_string(),
            entry(
                &["todo", "o", "pending", "incomplete"],
                &[" "],
                &[("zh", &["待办"]), ("es", &["pendiente"])],
            ),
        ),
        (
            "in_progress".to_string(),
            entry(
                &["doing", "wip", "in-progress", "started", "active"],
                &["/"],
                &[("zh", &["进行中"]), ("es", &["en curso"])],
            ),
        ),
        (
            "completed".to_string(),
            entry(
                &["done", "complete", "finished", "closed"],
                &["x"],
                &[("zh", &["完成", "已完成"]), ("es", &["hecho"])],
            ),
        ),
        (
            "cancelled".to_string(),
            entry(
                &["canceled", "dropped", "abandoned"],
                &["-"],
                &[("zh", &["取消"]), ("es", &["cancelada"])],
            ),
        ),
    ])
}

fn builtin_due_date() -> BTreeMap<String, TermEntry> {
    BTreeMap::from([
        ("any".to_string(), entry(&["all", "scheduled"], &[], &[])),
        (
            "none".to_string(),
            entry(&["no-due", "undated", "unscheduled"], &[], &[]),
        ),
        (
            "overdue".to_string(),
            entry(&["late", "past-due", "expired"], &[], &[("zh", &["逾期", "过期"])]),
        ),
        ("today".to_string(), entry(&["tod"], &[], &[])),
        ("tomorrow".to_string(), entry(&["tom", "tmr"], &[], &[])),
        ("this_week".to_string(), entry(&["this-week", "week"], &[], &[])),
        ("next_week".to_string(), entry(&["next-week"], &[], &[])),
        ("this_month".to_string(), entry(&["this-month", "month"], &[], &[])),
        ("next_month".to_string(), entry(&["next-month"], &[], &[])),
        ("last_week".to_string(), entry(&["last-week"], &[], &[])),
        ("last_month".to_string(), entry(&["last-month"], &[], &[])),
        ("this_year".to_string(), entry(&["this-year"], &[], &[])),
    ])
}

fn builtin_time_context() -> BTreeMap<String, TermEntry> {
    BTreeMap::from([
        (
            "today".to_string(),
            entry(&["today", "tonight"], &[], &[("zh", &["今天"]), ("es", &["hoy"])]),
        ),
        (
            "tomorrow".to_string(),
            entry(&["tomorrow"], &[], &[("zh", &["明天"]), ("es", &["mañana"])]),
        ),
        (
            "this_week".to_string(),
            entry(
                &["this week"],
                &[],
                &[("zh", &["本周", "这周"]), ("es", &["esta semana"])],
            ),
        ),
        (
            "next_week".to_string(),
            entry(&["next week"], &[], &[("zh", &["下周"]), ("es", &["próxima semana"])]),
        ),
        (
            "this_month".to_string(),
            entry(&["this month"], &[], &[("zh", &["本月"]), ("es", &["este mes"])]),
        ),
        (
            "next_month".to_string(),
            entry(&["next month"], &[], &[("zh", &["下个月"])]),
        ),
        (
            "last_week".to_string(),
            entry(&["last week"], &[], &[("zh", &["上周"])]),
        ),
        (
            "last_month".to_string(),
            entry(&["last month"], &[], &[("zh", &["上个月"])]),
        ),
        (
            "this_year".to_string(),
            entry(&["this year"], &[], &[("zh", &["今年"])]),
        ),
    ])
}
