//! URL slugs for catalog entries.
//!
//! A slug is lowercase ASCII letters and digits in runs separated by single hyphens, with no
//! leading or trailing hyphen. Names are transliterated to ASCII first, so "Crème brûlée" becomes
//! `creme-brulee`, and CJK or Hangul names keep a romanized form instead of losing their characters.

/// Derive the slug for a display name. Deterministic, and idempotent on its own output.
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
        .chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' => ch,
            _ => '-',
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
