//! HTML id generation from heading text.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Pd}+").expect("dash regex"));
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[a-z]+;").expect("entity regex"));
static SUBSUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<su[bp]>.+?</su[bp]>").expect("sub/sup regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[\p{L}\p{N}]+?>").expect("tag regex"));
static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^-_\p{L}\p{N}\p{Z}]").expect("disallowed regex"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Z}+").expect("separator regex"));
static UNDERSCORES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__+").expect("underscore regex"));

/// Strip combining marks after NFD decomposition, reducing accented letters
/// to their base form.
fn remove_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Make a valid HTML id from heading text that may contain markup, accented
/// characters, and punctuation.
///
/// Dash-like punctuation collapses to a single hyphen, entity references
/// become underscores, sub/superscript spans and remaining tags are removed,
/// any other disallowed character is dropped, and separator runs collapse to
/// a single underscore.
#[must_use]
pub fn make_anchor(text: &str) -> String {
    let s = remove_diacritics(text);
    let s = DASH_RE.replace_all(&s, "-");
    let s = ENTITY_RE.replace_all(&s, "_");
    let s = SUBSUP_RE.replace_all(&s, "");
    let s = TAG_RE.replace_all(&s, "");
    let s = DISALLOWED_RE.replace_all(&s, "");
    let s = SEPARATOR_RE.replace_all(&s, "_");
    UNDERSCORES_RE.replace_all(&s, "_").into_owned()
}
