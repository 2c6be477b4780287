use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s]").expect("valid slug strip pattern"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Derive a URL slug from a post title.
///
/// Lower-cases, drops everything except ASCII word characters and whitespace,
/// then turns each whitespace run into a single `-`.
pub fn derive_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, "-").into_owned()
}

pub fn slug_has_space(slug: &str) -> bool {
    slug.contains(' ')
}
