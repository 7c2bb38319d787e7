//! Permalink slugs of the form `<id>-<title-words>`.

use regex::Regex;
use std::sync::LazyLock;

static RE_NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w ]").unwrap());
static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());
static RE_LEADING_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+").unwrap());

/// Builds the slug for a record, e.g. `slug(10, "This is a Sentence")`
/// gives `10-this-is-a-sentence`.
pub fn slug(id: i64, title: &str) -> String {
    let lowered = title.to_lowercase();
    let words = RE_NON_WORD.replace_all(&lowered, "");
    let dashed = RE_SPACES.replace_all(words.trim(), "-");
    format!("{}-{}", id, dashed)
}

/// Extracts the record id from the front of a slug.
pub fn parse_slug(slug: &str) -> Option<i64> {
    RE_LEADING_ID
        .find(slug)
        .and_then(|m| m.as_str().parse().ok())
}
