//! Margin-aware paragraph wrapping.
//!
//! [`wrap_paragraph`] reflows free text to fixed margins with a greedy
//! line-breaker. Page-boundary pins travel through the reflow as embedded
//! [`PIN`] placeholder characters: they occupy no display width and are glued
//! to neighbouring words so a reflow never strands one between spurious
//! spaces.
//!
//! Width accounting uses the `unicode-width` crate so wide characters count
//! correctly against the right margin.

use std::sync::LazyLock;

use regex::Regex;
use unicode_width::UnicodeWidthChar;

/// Placeholder character marking the location of a positional pin within
/// text handed to the wrapper. Private-use, so it cannot occur in book text.
pub const PIN: char = '\u{f8ff}';

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// The margin triple governing one reflow operation.
///
/// `left` indents continuation lines, `first` indents the first line of the
/// paragraph, and `right` is the maximum line width. `first` and `left` may
/// legitimately differ; `right` is not validated against `left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapParams {
    pub left: usize,
    pub first: usize,
    pub right: usize,
}

impl WrapParams {
    /// Params with no distinct first-line indent.
    #[must_use]
    pub fn uniform(left: usize, right: usize) -> Self {
        Self {
            left,
            first: left,
            right,
        }
    }
}

/// Display width of a word, excluding pin placeholders.
fn visible_width(word: &str) -> usize {
    word.chars()
        .filter(|&c| c != PIN)
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
        .sum()
}

/// Collapse interior whitespace and normalise spacing around pins.
///
/// After collapsing runs to single spaces, any space between two pins is
/// removed, and a pin bracketed by spaces keeps only the leading one, gluing
/// the pin to the following word.
fn normalise(text: &str) -> String {
    let mut s = WS_RE.replace_all(text.trim(), " ").into_owned();
    let pin_pin = format!("{PIN} {PIN}");
    let glued = format!("{PIN}{PIN}");
    while s.contains(&pin_pin) {
        s = s.replace(&pin_pin, &glued);
    }
    let spaced_pin = format!(" {PIN} ");
    let tight_pin = format!(" {PIN}");
    while s.contains(&spaced_pin) {
        s = s.replace(&spaced_pin, &tight_pin);
    }
    s
}

/// Reflow a paragraph to the given margins.
///
/// Interior whitespace is collapsed, then words are placed greedily so no
/// output line exceeds `params.right`. The first output line is indented by
/// `params.first` spaces, continuation lines by `params.left`. A single word
/// wider than the available width is placed alone on its own line and never
/// split. The result carries a trailing newline; empty input yields an empty
/// string.
#[must_use]
pub fn wrap_paragraph(text: &str, params: &WrapParams) -> String {
    let normalised = normalise(text);
    if normalised.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let mut current = " ".repeat(params.first);
    let mut current_width = params.first;
    let mut has_word = false;

    for word in normalised.split(' ') {
        if word.is_empty() {
            continue;
        }
        let width = visible_width(word);
        if has_word && current_width + 1 + width > params.right {
            out.push_str(&current);
            out.push('\n');
            current = " ".repeat(params.left);
            current_width = params.left;
            has_word = false;
        }
        if has_word {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += width;
        has_word = true;
    }
    out.push_str(&current);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const LOREM: &str = "the quick brown fox jumps over the lazy dog and keeps \
                         on running until the river bends";

    #[test]
    fn lines_respect_right_margin() {
        let params = WrapParams::uniform(0, 24);
        let wrapped = wrap_paragraph(LOREM, &params);
        assert!(wrapped.lines().all(|l| l.chars().count() <= 24));
    }

    #[test]
    fn first_and_continuation_indents_differ() {
        let params = WrapParams {
            left: 4,
            first: 8,
            right: 30,
        };
        let wrapped = wrap_paragraph(LOREM, &params);
        let lines: Vec<&str> = wrapped.lines().collect();
        assert!(lines[0].starts_with("        the"));
        for line in &lines[1..] {
            assert!(line.starts_with("    ") && !line.starts_with("     "));
        }
    }

    #[test]
    fn wrapping_is_idempotent() {
        let params = WrapParams {
            left: 2,
            first: 6,
            right: 28,
        };
        let once = wrap_paragraph(LOREM, &params);
        let twice = wrap_paragraph(&once, &params);
        assert_eq!(once, twice);
    }

    #[test]
    fn long_word_is_not_split() {
        let word = "a".repeat(50);
        let text = format!("tiny {word} tiny");
        let wrapped = wrap_paragraph(&text, &WrapParams::uniform(0, 20));
        assert!(wrapped.lines().any(|l| l == word));
    }

    #[test]
    fn empty_input_is_a_no_op() {
        assert_eq!(wrap_paragraph("  \n ", &WrapParams::uniform(0, 72)), "");
    }

    #[rstest]
    #[case(format!("a {PIN} {PIN} b"), format!("a {PIN}{PIN} b"))]
    #[case(format!("a {PIN} b"), format!("a {PIN}b"))]
    #[case(format!("a{PIN} b"), format!("a{PIN} b"))]
    fn pins_are_never_bracketed_by_spaces(#[case] input: String, #[case] expected: String) {
        assert_eq!(normalise(&input), expected);
    }

    #[test]
    fn pins_have_no_width() {
        let word: String = std::iter::repeat_n(PIN, 10).chain("abc".chars()).collect();
        assert_eq!(visible_width(&word), 3);
    }

    #[test]
    fn pin_position_ratio_is_preserved() {
        let mut text = String::new();
        for i in 0..20 {
            if i == 7 {
                text.push(PIN);
            }
            text.push_str("word ");
        }
        let in_off = text.find(PIN).unwrap();
        let in_ratio = in_off as f64 / text.len() as f64;

        let wrapped = wrap_paragraph(&text, &WrapParams::uniform(0, 25));
        let out_off = wrapped.find(PIN).unwrap();
        let out_ratio = out_off as f64 / wrapped.len() as f64;
        assert!((in_ratio - out_ratio).abs() < 0.1);
    }
}
