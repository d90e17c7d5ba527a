//! Small display helpers shared by every output mode.

/// Default cut-off for [`shorten`].
pub const DEFAULT_SHORTEN_LEN: usize = 100;

/// Avatar fallback: first letter of the first two words, uppercased.
///
/// `"Ada Lovelace"` → `"AL"`, `"ada"` → `"A"`, blank → `"AN"`.
#[must_use]
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "AN".to_string()
    } else {
        letters
    }
}

/// Truncate to `max` characters and append `...` when anything was cut.
#[must_use]
pub fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str("...");
    cut
}
