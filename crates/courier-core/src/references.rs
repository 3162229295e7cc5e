//! File-reference extraction from free text

use regex::Regex;
use std::sync::LazyLock;

/// Suffix markers that make the orchestrator route a request to the schema agent
pub const DEFAULT_REFERENCE_MARKERS: &[&str] = &[".json"];

static JSON_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+\.json").expect("valid reference pattern"));

/// Find every `.json` file reference in `text`.
///
/// Matches come back in order of appearance with duplicates kept. Text
/// without references yields an empty vector.
pub fn extract_references(text: &str) -> Vec<String> {
    JSON_REFERENCE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Case-insensitive check for any of `markers` in `text`
pub fn mentions_reference<S: AsRef<str>>(text: &str, markers: &[S]) -> bool {
    let lower = text.to_lowercase();
    markers
        .iter()
        .map(|m| m.as_ref().to_lowercase())
        .filter(|m| !m.is_empty())
        .any(|m| lower.contains(&m))
}
