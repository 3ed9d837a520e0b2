use once_cell::sync::Lazy;
use regex::Regex;

/// HTML tags and character entities found in store descriptions
static HTML_CLEANER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<.*?>|&([a-z0-9]+|#[0-9]{1,6}|#x[0-9a-f]{1,6});")
        .expect("HTML cleaner pattern is valid")
});

/// Words of two or more word characters
static COUNT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("count token pattern is valid"));

/// Tokens for BM25: strip markup, drop ASCII punctuation, lowercase, split on whitespace
pub fn bm25_tokens(text: &str) -> Vec<String> {
    let cleaned = HTML_CLEANER.replace_all(text, "");
    let stripped: String = cleaned
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Tokens for bag-of-words count vectors
pub fn count_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    COUNT_TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}
