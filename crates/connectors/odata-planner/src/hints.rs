//! Hints read directly from the request text.

use std::sync::OnceLock;

use regex::Regex;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\d{1,3})\b").expect("number pattern is a valid regex"))
}

/// The row limit a request asks for: its smallest standalone number between 1 and 100, or
/// `default` if it mentions none.
pub fn extract_top_hint(text: &str, default: u32) -> u32 {
    number_pattern()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
        .filter(|number| (1..=100).contains(number))
        .min()
        .unwrap_or(default)
}
