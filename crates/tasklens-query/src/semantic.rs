use crate::expansion::{dedupe_substring_overlap, expand_keywords};
use crate::parser::{ParseResult, ParserContext, parse_query};
use crate::timectx::{self, TimeResolution};
use crate::tokenize::{generic_ratio, tokenize};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tasklens_core::config::SemanticConfig;
use tasklens_core::constants;
use tasklens_core::error::SemanticError;
use tasklens_core::terms::TermSnapshot;
use tasklens_core::types::{
    DroppedTerm, ParsedQuery, ParserFallback, ParserStrategy, PropertyKind, VaguenessMode,
};
use time::Date;
use tracing::{debug, warn};

/// Request payload for one semantic parse call: the raw query plus the term
/// tables and language configuration the model should resolve against.
#[derive(Debug, Clone)]
pub struct SemanticParseRequest<'a> {
    pub query: &'a str,
    pub languages: &'a [String],
    pub terms: &'a TermSnapshot,
}

/// A value the model may return either as a single string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Partial parse returned by the external model. Every field is optional;
/// validation happens at the parser boundary before anything reaches scoring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SemanticParseOutcome {
    #[serde(default)]
    pub core_keywords: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub priority: Option<StringOrList>,
    #[serde(default)]
    pub status: Option<StringOrList>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub time_context: Option<String>,
    #[serde(default)]
    pub is_vague: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// The external semantic understanding service.
///
/// Implementations may suspend on network calls; everything else in the
/// engine is synchronous. Any error (including timeout/cancellation) triggers
/// the deterministic fallback path.
pub trait SemanticParse: Send + Sync {
    fn parse(&self, request: &SemanticParseRequest<'_>)
    -> Result<SemanticParseOutcome, SemanticError>;

    /// Expand core keywords into up to `limit` synonyms for one language.
    fn expand(
        &self,
        keywords: &[String],
        language: &str,
        limit: usize,
    ) -> Result<Vec<String>, SemanticError>;
}

/// HTTP-backed semantic parser. Bounded by the configured request timeout;
/// a timed-out call is reported exactly like a transport failure.
pub struct HttpSemanticParser {
    endpoint: String,
    client: Client,
}

impl HttpSemanticParser {
    pub fn from_config(config: &SemanticConfig) -> Result<Self, SemanticError> {
        if !config.enabled {
            return Err(SemanticError::Disabled);
        }
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(SemanticError::Disabled)?
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()
            .map_err(SemanticError::transport)?;
        Ok(Self { endpoint, client })
    }

    fn api_key() -> Result<String, SemanticError> {
        std::env::var(constants::SEMANTIC_API_KEY_ENV).map_err(|_| SemanticError::MissingApiKey {
            env: constants::SEMANTIC_API_KEY_ENV.to_string(),
        })
    }

    fn post(&self, path: &str, payload: &serde_json::Value) -> Result<serde_json::Value, SemanticError> {
        let api_key = Self::api_key()?;
        let response = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            return Err(SemanticError::Http {
                status: response.status().as_u16(),
            });
        }
        response.json().map_err(SemanticError::malformed)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> SemanticError {
    if err.is_timeout() {
        SemanticError::Timeout
    } else {
        SemanticError::transport(err)
    }
}

impl SemanticParse for HttpSemanticParser {
    fn parse(
        &self,
        request: &SemanticParseRequest<'_>,
    ) -> Result<SemanticParseOutcome, SemanticError> {
        let properties: serde_json::Value = serde_json::json!({
            "priority": request.terms.table(PropertyKind::Priority).entries(),
            "status": request.terms.table(PropertyKind::Status).entries(),
            "due_date": request.terms.table(PropertyKind::DueDate).entries(),
            "time_context": request.terms.table(PropertyKind::TimeContext).entries(),
        });
        let payload = serde_json::json!({
            "query": request.query,
            "languages": request.languages,
            "properties": properties,
        });

        let body = self.post("parse", &payload)?;
        if body.is_null() {
            return Err(SemanticError::EmptyResponse);
        }
        serde_json::from_value(body).map_err(SemanticError::malformed)
    }

    fn expand(
        &self,
        keywords: &[String],
        language: &str,
        limit: usize,
    ) -> Result<Vec<String>, SemanticError> {
        let payload = serde_json::json!({
            "keywords": keywords,
            "language": language,
            "limit": limit,
        });
        let body = self.post("expand", &payload)?;
        let expansions: Vec<String> =
            serde_json::from_value(body).map_err(SemanticError::malformed)?;
        if expansions.is_empty() {
            return Err(SemanticError::EmptyResponse);
        }
        Ok(expansions)
    }
}

/// Result of running one parse strategy, including how it was arrived at.
#[derive(Debug, Clone)]
pub struct ParseExecution {
    pub parsed: ParsedQuery,
    pub strategy: ParserStrategy,
    pub fallback: Option<ParserFallback>,
    pub dropped: Vec<DroppedTerm>,
    pub expansion_degraded: Option<String>,
}

impl ParseExecution {
    pub fn deterministic(result: ParseResult) -> Self {
        Self {
            parsed: result.parsed,
            strategy: ParserStrategy::Deterministic,
            fallback: None,
            dropped: result.dropped,
            expansion_degraded: None,
        }
    }
}

/// Run the AI-assisted strategy with deterministic fallback.
///
/// A failed or cancelled semantic call re-parses the same raw text with the
/// deterministic parser (never treating the whole query as one opaque
/// keyword) and reports the fallback as a non-fatal diagnostic.
pub fn parse_with_semantic(
    raw: &str,
    snapshot: &TermSnapshot,
    ctx: &ParserContext,
    languages: &[String],
    expansions_per_language: usize,
    parser: &dyn SemanticParse,
    today: Date,
) -> ParseExecution {
    let request = SemanticParseRequest {
        query: raw,
        languages,
        terms: snapshot,
    };

    match parser.parse(&request) {
        Ok(outcome) => {
            let mut dropped = Vec::new();
            let parsed = validate_outcome(outcome, raw, snapshot, ctx, today, &mut dropped);
            let (keywords, expansion_degraded) = expand_keywords(
                &parsed.core_keywords,
                parser,
                languages,
                expansions_per_language,
            );
            debug!(
                keywords = keywords.len(),
                is_vague = parsed.is_vague,
                "semantic parse succeeded"
            );
            ParseExecution {
                parsed: ParsedQuery { keywords, ..parsed },
                strategy: ParserStrategy::Semantic,
                fallback: None,
                dropped,
                expansion_degraded,
            }
        }
        Err(err) => {
            warn!(reason = err.reason_code(), error = %err, "semantic parse failed, using deterministic parser");
            let result = parse_query(raw, snapshot, ctx, today);
            ParseExecution {
                fallback: Some(ParserFallback {
                    failed: ParserStrategy::Semantic,
                    reason: err.reason_code().to_string(),
                    used: ParserStrategy::Deterministic,
                }),
                ..ParseExecution::deterministic(result)
            }
        }
    }
}

/// Validate a partial model response into a `ParsedQuery`.
///
/// Property values are re-resolved through the registry (the model is not
/// trusted to emit canonical keys), confidence is clamped, and a missing
/// `is_vague` falls back to the heuristic over the raw text.
fn validate_outcome(
    outcome: SemanticParseOutcome,
    raw: &str,
    snapshot: &TermSnapshot,
    ctx: &ParserContext,
    today: Date,
    dropped: &mut Vec<DroppedTerm>,
) -> ParsedQuery {
    let heuristic_vague = {
        let raw_tokens = tokenize(raw);
        !raw_tokens.is_empty()
            && generic_ratio(&raw_tokens, ctx.generic_words()) >= ctx.vagueness_threshold
    };
    let is_vague = match ctx.mode {
        VaguenessMode::ForcedGeneric => true,
        // The model's judgment takes priority over the heuristic when present.
        VaguenessMode::Auto => outcome.is_vague.unwrap_or(heuristic_vague),
    };

    let core_keywords = {
        let mut core: Vec<String> = if !outcome.core_keywords.is_empty() {
            outcome.core_keywords
        } else {
            outcome.keywords
        };
        core = core
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if core.is_empty() {
            // Absent keywords in a partial response: derive them locally.
            tokenize(raw)
                .into_iter()
                .filter(|token| !ctx.is_stop_word(token))
                .collect()
        } else {
            core
        }
    };
    let keywords = dedupe_substring_overlap(core_keywords.clone());

    let priority = resolve_model_values(snapshot, PropertyKind::Priority, outcome.priority, dropped);
    let status = resolve_model_values(snapshot, PropertyKind::Status, outcome.status, dropped);

    let mut due_date_filter = None;
    let mut due_date_range = None;
    let mut time_context = None;
    if let Some(raw_due) = outcome.due_date {
        match snapshot.resolve(PropertyKind::DueDate, &raw_due) {
            Some(key @ ("any" | "none" | "overdue")) => due_date_filter = Some(key.to_string()),
            Some(key) => match timectx::resolve_time_phrase(key, today, is_vague) {
                TimeResolution::Filter(range) => due_date_range = Some(range),
                TimeResolution::Context(label) => time_context = Some(label),
            },
            None => {
                dropped.push(DroppedTerm {
                    property: PropertyKind::DueDate,
                    value: raw_due,
                });
            }
        }
    }
    if time_context.is_none()
        && let Some(label) = outcome.time_context
    {
        let key = snapshot
            .resolve(PropertyKind::TimeContext, &label)
            .map(str::to_string)
            .unwrap_or(label);
        if due_date_range.is_none() && due_date_filter.is_none() {
            match timectx::resolve_time_phrase(&key, today, is_vague) {
                TimeResolution::Filter(range) => due_date_range = Some(range),
                TimeResolution::Context(label) => time_context = Some(label),
            }
        } else {
            time_context = Some(key);
        }
    }

    ParsedQuery {
        core_keywords,
        keywords,
        priority,
        status,
        due_date_filter,
        due_date_range,
        time_context,
        is_vague,
        confidence: outcome.confidence.map(|c| c.clamp(0.0, 1.0)),
        tags: None,
        folder: None,
    }
}

fn resolve_model_values(
    snapshot: &TermSnapshot,
    kind: PropertyKind,
    values: Option<StringOrList>,
    dropped: &mut Vec<DroppedTerm>,
) -> Option<Vec<String>> {
    let values = values?.into_vec();
    let resolved = snapshot.resolve_many(kind, &values);
    for value in &values {
        if snapshot.resolve(kind, value).is_none() {
            warn!(property = %kind, value = %value, "dropping unresolvable model property value");
            dropped.push(DroppedTerm {
                property: kind,
                value: value.clone(),
            });
        }
    }
    if resolved.is_empty() { None } else { Some(resolved) }
}
