//! Bracketed margin-override suffix parsing.
//!
//! Block-open tokens may carry up to three numeric fields, in the order
//! left, first, right: an optional `[`, the left value, `.` then the first
//! value, `,` then the right value, and an optional `]`. Any field may be
//! omitted. Examples: `[4`, `[4.8`, `[4,60]`, `[.6,60]`.

use std::sync::LazyLock;

use regex::Regex;

static OVERRIDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[?(\d*)(?:\.(\d+))?(?:,(\d+))?\]?$").expect("override regex"));

/// Margin fields parsed from a block-open token's bracket suffix. The exact
/// meaning of each field varies per construct; see the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub left: Option<usize>,
    pub first: Option<usize>,
    pub right: Option<usize>,
}

/// Parse the suffix following a block-open token. Returns `None` when the
/// suffix does not match the override grammar, in which case the line is not
/// a block token at all.
#[must_use]
pub fn parse_overrides(suffix: &str) -> Option<Overrides> {
    let caps = OVERRIDE_RE.captures(suffix.trim())?;
    let field = |ix: usize| {
        caps.get(ix)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    };
    Some(Overrides {
        left: field(1),
        first: field(2),
        right: field(3),
    })
}
