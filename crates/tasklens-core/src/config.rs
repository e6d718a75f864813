use crate::constants;
use crate::error::ConfigError;
use crate::terms::UserTermConfig;
use crate::types::{SortCriterion, VaguenessMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub languages: LanguageConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub sort: SortConfig,
    #[serde(default)]
    pub semantic: SemanticConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub terms: UserTermConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default = "default_languages")]
    pub list: Vec<String>,
    #[serde(default = "default_expansions_per_language")]
    pub expansions_per_language: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Generic-word ratio at or above which a query counts as vague.
    /// Clamped to 0.5..=0.9 after loading.
    #[serde(default = "default_vagueness_threshold")]
    pub vagueness_threshold: f64,
    /// "auto" or "forced-generic".
    #[serde(default = "default_vagueness_mode")]
    pub vagueness_mode: String,
    /// User additions to the built-in stop-word list.
    #[serde(default)]
    pub stop_words: Vec<String>,
    /// User additions to the built-in generic/question-word list.
    #[serde(default)]
    pub generic_words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Main multiplier for the text-relevance component.
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f64,
    /// Main multiplier for the due-date urgency component.
    #[serde(default = "default_due_date_weight")]
    pub due_date_weight: f64,
    /// Main multiplier for the priority component.
    #[serde(default = "default_priority_weight")]
    pub priority_weight: f64,
    /// Relevance split between core-keyword and all-keyword match ratios.
    #[serde(default = "default_core_weight")]
    pub core_weight: f64,
    #[serde(default = "default_all_weight")]
    pub all_weight: f64,
    #[serde(default)]
    pub due_buckets: DueBucketWeights,
    #[serde(default)]
    pub priority_buckets: PriorityBucketWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueBucketWeights {
    #[serde(default = "default_due_overdue")]
    pub overdue: f64,
    #[serde(default = "default_due_within_week")]
    pub within_week: f64,
    #[serde(default = "default_due_within_month")]
    pub within_month: f64,
    #[serde(default = "default_due_later")]
    pub later: f64,
    #[serde(default = "default_due_none")]
    pub none: f64,
}

impl DueBucketWeights {
    pub fn max_weight(&self) -> f64 {
        [self.overdue, self.within_week, self.within_month, self.later, self.none]
            .into_iter()
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityBucketWeights {
    #[serde(default = "default_priority_p1")]
    pub p1: f64,
    #[serde(default = "default_priority_p2")]
    pub p2: f64,
    #[serde(default = "default_priority_p3")]
    pub p3: f64,
    #[serde(default = "default_priority_p4")]
    pub p4: f64,
    #[serde(default = "default_priority_none")]
    pub none: f64,
}

impl PriorityBucketWeights {
    pub fn max_weight(&self) -> f64 {
        [self.p1, self.p2, self.p3, self.p4, self.none]
            .into_iter()
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Fraction of the query's maximum possible score a task must reach.
    #[serde(default = "default_quality_strength")]
    pub strength: f64,
    /// Scale the strength down for queries with few keywords.
    #[serde(default)]
    pub adaptive: bool,
    /// Independent minimum-relevance cut, as a fraction of the relevance
    /// component's own theoretical maximum. 0 disables the cut.
    #[serde(default)]
    pub min_relevance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    /// Ordered criteria; "auto" is resolved per query.
    #[serde(default = "default_sort_order")]
    pub order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the semantic parse service; required when enabled.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_semantic_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_languages() -> Vec<String> {
    vec!["en".into()]
}
fn default_expansions_per_language() -> usize {
    constants::DEFAULT_EXPANSIONS_PER_LANGUAGE
}
fn default_vagueness_threshold() -> f64 {
    constants::DEFAULT_VAGUENESS_THRESHOLD
}
fn default_vagueness_mode() -> String {
    "auto".into()
}
fn default_relevance_weight() -> f64 {
    20.0
}
fn default_due_date_weight() -> f64 {
    4.0
}
fn default_priority_weight() -> f64 {
    1.0
}
fn default_core_weight() -> f64 {
    0.7
}
fn default_all_weight() -> f64 {
    0.3
}
fn default_due_overdue() -> f64 {
    1.5
}
fn default_due_within_week() -> f64 {
    1.2
}
fn default_due_within_month() -> f64 {
    1.0
}
fn default_due_later() -> f64 {
    0.5
}
fn default_due_none() -> f64 {
    0.1
}
fn default_priority_p1() -> f64 {
    1.0
}
fn default_priority_p2() -> f64 {
    0.8
}
fn default_priority_p3() -> f64 {
    0.5
}
fn default_priority_p4() -> f64 {
    0.3
}
fn default_priority_none() -> f64 {
    0.1
}
fn default_quality_strength() -> f64 {
    constants::DEFAULT_QUALITY_STRENGTH
}
fn default_sort_order() -> Vec<String> {
    vec!["auto".into()]
}
fn default_semantic_timeout_ms() -> u64 {
    constants::DEFAULT_SEMANTIC_TIMEOUT_MS
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            list: default_languages(),
            expansions_per_language: default_expansions_per_language(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            vagueness_threshold: default_vagueness_threshold(),
            vagueness_mode: default_vagueness_mode(),
            stop_words: Vec::new(),
            generic_words: Vec::new(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            relevance_weight: default_relevance_weight(),
            due_date_weight: default_due_date_weight(),
            priority_weight: default_priority_weight(),
            core_weight: default_core_weight(),
            all_weight: default_all_weight(),
            due_buckets: DueBucketWeights::default(),
            priority_buckets: PriorityBucketWeights::default(),
        }
    }
}

impl Default for DueBucketWeights {
    fn default() -> Self {
        Self {
            overdue: default_due_overdue(),
            within_week: default_due_within_week(),
            within_month: default_due_within_month(),
            later: default_due_later(),
            none: default_due_none(),
        }
    }
}

impl Default for PriorityBucketWeights {
    fn default() -> Self {
        Self {
            p1: default_priority_p1(),
            p2: default_priority_p2(),
            p3: default_priority_p3(),
            p4: default_priority_p4(),
            none: default_priority_none(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            strength: default_quality_strength(),
            adaptive: false,
            min_relevance: 0.0,
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            order: default_sort_order(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_ms: default_semantic_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with layered precedence:
    /// 1. Explicit config file (from `--config` flag, highest priority)
    /// 2. Vault config: `<vault_root>/.tasklens/config.toml`
    /// 3. Global config: `~/.tasklens/config.toml`
    /// 4. Built-in defaults (lowest priority)
    ///
    /// Only fields explicitly set in a higher-priority file override lower
    /// layers; environment variables (`TASKLENS_<SECTION>_<KEY>`) override
    /// everything.
    pub fn load(vault_root: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_file(vault_root, None)
    }

    pub fn load_with_file(
        vault_root: Option<&Path>,
        config_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        if let Some(home) = dirs::home_dir() {
            let global_path = home.join(constants::DEFAULT_DATA_DIR).join("config.toml");
            if global_path.exists() {
                let raw = load_toml_value(&global_path)?;
                merge_toml_values(&mut merged, &raw);
            }
        }

        if let Some(root) = vault_root {
            let vault_path = root.join(constants::PROJECT_CONFIG_FILE);
            if vault_path.exists() {
                let raw = load_toml_value(&vault_path)?;
                merge_toml_values(&mut merged, &raw);
            }
        }

        if let Some(cf) = config_file {
            if !cf.exists() {
                return Err(ConfigError::NotFound {
                    path: cf.display().to_string(),
                });
            }
            let raw = load_toml_value(cf)?;
            merge_toml_values(&mut merged, &raw);
        }

        let config_str =
            toml::to_string(&merged).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        apply_env_overrides(&mut config);
        config.normalize();
        Ok(config)
    }

    /// Clamp and repair values after merging all layers.
    fn normalize(&mut self) {
        self.parser.vagueness_threshold = self.parser.vagueness_threshold.clamp(
            constants::VAGUENESS_THRESHOLD_MIN,
            constants::VAGUENESS_THRESHOLD_MAX,
        );
        if VaguenessMode::parse_mode(&self.parser.vagueness_mode).is_none() {
            warn!(mode = %self.parser.vagueness_mode, "unknown vagueness mode, using auto");
            self.parser.vagueness_mode = default_vagueness_mode();
        }
        self.quality.strength = self.quality.strength.clamp(0.0, 1.0);
        self.quality.min_relevance = self.quality.min_relevance.clamp(0.0, 1.0);
        for weight in [
            &mut self.scoring.relevance_weight,
            &mut self.scoring.due_date_weight,
            &mut self.scoring.priority_weight,
            &mut self.scoring.core_weight,
            &mut self.scoring.all_weight,
        ] {
            if !weight.is_finite() || *weight < 0.0 {
                *weight = 0.0;
            }
        }
        if self.languages.list.is_empty() {
            self.languages.list = default_languages();
        }
        if self.sort_order().is_empty() {
            self.sort.order = default_sort_order();
        }
        if self.semantic.timeout_ms == 0 {
            self.semantic.timeout_ms = default_semantic_timeout_ms();
        }
    }

    pub fn vagueness_mode(&self) -> VaguenessMode {
        VaguenessMode::parse_mode(&self.parser.vagueness_mode).unwrap_or_default()
    }

    /// Configured sort order with invalid entries dropped.
    pub fn sort_order(&self) -> Vec<SortCriterion> {
        self.sort
            .order
            .iter()
            .filter_map(|raw| {
                let criterion = SortCriterion::parse_criterion(raw);
                if criterion.is_none() {
                    warn!(criterion = %raw, "dropping unknown sort criterion");
                }
                criterion
            })
            .collect()
    }
}

fn load_toml_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Value>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Deep-merge `overlay` into `base`. Only keys present in `overlay` are written.
fn merge_toml_values(base: &mut toml::Value, overlay: &toml::Value) {
    if let (toml::Value::Table(base_map), toml::Value::Table(overlay_map)) = (base, overlay) {
        for (key, overlay_val) in overlay_map {
            if let Some(base_val) = base_map.get_mut(key) {
                if base_val.is_table() && overlay_val.is_table() {
                    merge_toml_values(base_val, overlay_val);
                } else {
                    *base_val = overlay_val.clone();
                }
            } else {
                base_map.insert(key.clone(), overlay_val.clone());
            }
        }
    }
}

/// Apply environment variable overrides.
/// Convention: `TASKLENS_<SECTION>_<KEY>` in UPPER_SNAKE_CASE.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("TASKLENS_PARSER_VAGUENESS_THRESHOLD")
        && let Ok(n) = v.parse()
    {
        config.parser.vagueness_threshold = n;
    }
    if let Ok(v) = std::env::var("TASKLENS_PARSER_VAGUENESS_MODE") {
        config.parser.vagueness_mode = v;
    }
    if let Ok(v) = std::env::var("TASKLENS_QUALITY_STRENGTH")
        && let Ok(n) = v.parse()
    {
        config.quality.strength = n;
    }
    if let Ok(v) = std::env::var("TASKLENS_QUALITY_MIN_RELEVANCE")
        && let Ok(n) = v.parse()
    {
        config.quality.min_relevance = n;
    }
    if let Ok(v) = std::env::var("TASKLENS_SORT_ORDER") {
        config.sort.order = v.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(v) = std::env::var("TASKLENS_SEMANTIC_ENABLED") {
        config.semantic.enabled = v == "true" || v == "1";
    }
    if let Ok(v) = std::env::var("TASKLENS_SEMANTIC_ENDPOINT") {
        config.semantic.endpoint = Some(v);
    }
    if let Ok(v) = std::env::var("TASKLENS_SEMANTIC_TIMEOUT_MS")
        && let Ok(n) = v.parse()
    {
        config.semantic.timeout_ms = n;
    }
    if let Ok(v) = std::env::var("TASKLENS_LOGGING_LEVEL") {
        config.logging.level = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.parser.vagueness_threshold, 0.7);
        assert_eq!(config.scoring.relevance_weight, 20.0);
        assert_eq!(config.scoring.due_date_weight, 4.0);
        assert_eq!(config.scoring.priority_weight, 1.0);
        assert_eq!(config.quality.strength, 0.3);
        assert_eq!(config.sort_order(), vec![SortCriterion::Auto]);
    }

    #[test]
    fn vagueness_threshold_is_clamped_to_documented_range() {
        let mut config = Config::default();
        config.parser.vagueness_threshold = 0.2;
        config.normalize();
        assert_eq!(config.parser.vagueness_threshold, 0.5);
        config.parser.vagueness_threshold = 0.95;
        config.normalize();
        assert_eq!(config.parser.vagueness_threshold, 0.9);
    }

    #[test]
    fn explicit_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[scoring]\nrelevance_weight = 5.0\n\n[sort]\norder = [\"due_date\", \"priority\"]"
        )
        .unwrap();

        let config = Config::load_with_file(None, Some(&path)).unwrap();
        assert_eq!(config.scoring.relevance_weight, 5.0);
        // Unset fields keep defaults.
        assert_eq!(config.scoring.due_date_weight, 4.0);
        assert_eq!(
            config.sort_order(),
            vec![SortCriterion::DueDate, SortCriterion::Priority]
        );
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = Config::load_with_file(None, Some(&missing));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn invalid_sort_entries_are_dropped() {
        let mut config = Config::default();
        config.sort.order = vec!["relevance".into(), "bogus".into(), "due".into()];
        assert_eq!(
            config.sort_order(),
            vec![SortCriterion::Relevance, SortCriterion::DueDate]
        );
    }

    #[test]
    fn user_terms_deserialize_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [terms.status.waiting]
            aliases = ["blocked", "on-hold"]

            [terms.priority."1"]
            synonyms = { de = ["dringend"] }
            "#,
        )
        .unwrap();
        assert!(config.terms.status.contains_key("waiting"));
        assert_eq!(
            config.terms.priority["1"].synonyms["de"],
            vec!["dringend".to_string()]
        );
    }
}
