use crate::semantic::SemanticParse;
use tracing::{debug, warn};

/// Remove tokens that are substrings of a longer token in the same set, so
/// one textual occurrence never counts as multiple independent matches during
/// scoring. Exact duplicates collapse first; original order is preserved.
pub fn dedupe_substring_overlap(keywords: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for keyword in keywords {
        if !unique.contains(&keyword) {
            unique.push(keyword);
        }
    }

    let survivors: Vec<String> = unique
        .iter()
        .filter(|candidate| {
            !unique
                .iter()
                .any(|other| other.len() > candidate.len() && other.contains(candidate.as_str()))
        })
        .cloned()
        .collect();
    survivors
}

/// Expand core keywords into a bounded multilingual synonym set, batched per
/// configured language. Expansion failure is non-fatal: the set degrades to
/// the unexpanded keywords and the reason is reported to the caller.
pub fn expand_keywords(
    core_keywords: &[String],
    parser: &dyn SemanticParse,
    languages: &[String],
    expansions_per_language: usize,
) -> (Vec<String>, Option<String>) {
    let mut all: Vec<String> = core_keywords.to_vec();
    let mut degraded = None;

    if core_keywords.is_empty() || expansions_per_language == 0 {
        return (dedupe_substring_overlap(all), degraded);
    }

    for language in languages {
        match parser.expand(core_keywords, language, expansions_per_language) {
            Ok(expansions) => {
                let bound = expansions_per_language * core_keywords.len();
                for expansion in expansions.into_iter().take(bound) {
                    let expansion = expansion.trim().to_lowercase();
                    if !expansion.is_empty() && !all.contains(&expansion) {
                        all.push(expansion);
                    }
                }
            }
            Err(err) => {
                warn!(language = %language, error = %err, "keyword expansion failed");
                degraded = Some(err.reason_code().to_string());
                break;
            }
        }
    }

    let deduped = dedupe_substring_overlap(all);
    debug!(
        core = core_keywords.len(),
        expanded = deduped.len(),
        "keyword expansion"
    );
    (deduped, degraded)
}
