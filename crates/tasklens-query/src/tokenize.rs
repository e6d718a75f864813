use unicode_script::{Script, UnicodeScript};

/// Scripts that do not separate words with whitespace. Runs of these are
/// split character-level; everything else splits on word boundaries.
fn is_unspaced_script(ch: char) -> bool {
    matches!(
        ch.script(),
        Script::Han | Script::Hiragana | Script::Katakana | Script::Thai
    )
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

/// Split free text into lowercased tokens.
///
/// Word-level for whitespace-delimited scripts, character-level for runs of
/// unspaced scripts (Han, Kana, Thai), so a query like `修复 bug` yields
/// `["修", "复", "bug"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if is_unspaced_script(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(ch.to_string());
        } else if is_word_char(ch) {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .into_iter()
        .map(|token| token.to_lowercase())
        .filter(|token| !token.is_empty() && token != "-" && token != "_")
        .collect()
}

/// Fraction of tokens that appear in `generic_words`. The caller must pass
/// the raw token list, before any stop-word removal.
pub fn generic_ratio<S: std::hash::BuildHasher>(
    raw_tokens: &[String],
    generic_words: &std::collections::HashSet<String, S>,
) -> f64 {
    if raw_tokens.is_empty() {
        return 0.0;
    }
    let generic = raw_tokens
        .iter()
        .filter(|token| generic_words.contains(token.as_str()))
        .count();
    generic as f64 / raw_tokens.len() as f64
}
