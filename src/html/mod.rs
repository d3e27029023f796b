//! Markup-to-HTML conversion.
//!
//! Converts a markup-annotated book text into an HTML body wrapped in a
//! standard header and footer. The passes run in a fixed order: trailing
//! whitespace removal, character entity substitution, the line-oriented body
//! pass (block structure, paragraphs, chapter headings, table of contents),
//! then inline markup rendering and small-caps classification over the
//! finished body.

mod body;
mod header;

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{MarkupMode, Settings};
use crate::document::{Document, RowCol, Span};
use crate::error::MarkupError;

pub use header::DEFAULT_HEADER;

static TRAILING_WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +$").expect("trailing whitespace regex"));
static ANGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>]").expect("angle bracket regex"));
static KNOWN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</?(i|b|f|g|u|sc|tb)>").expect("known tag regex"));
static SUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\{(.+?)\}").expect("subscript regex"));
static SUP_BRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^\{(.+?)\}").expect("superscript regex"));
static SUP_CHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^(.)").expect("single superscript regex"));
static TB_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(       \*){5}$").expect("thought break regex"));

/// Convert a whole document from book markup to HTML in place.
///
/// # Errors
/// Returns a [`MarkupError`] describing the first structural problem found:
/// an unclosed or unmatched block token, illegally nested blocks, or a
/// header with no `</style>` line to anchor CSS to. The document may have
/// been partially converted when an error is returned.
pub fn convert_to_html(
    doc: &mut Document,
    settings: &Settings,
    user_header: Option<&str>,
) -> Result<(), MarkupError> {
    doc.replace_all(&TRAILING_WS_RE, "");
    convert_entities(doc);
    body::convert_body(doc, user_header)?;
    convert_inline(doc, settings);
    convert_smallcaps(doc)
}

/// Substitute HTML character entities, escaping stray angle brackets while
/// leaving the recognised inline markup tags intact.
fn convert_entities(doc: &mut Document) {
    // Ampersands first so the entities inserted below survive.
    doc.replace_all_literal("&", "&amp;");
    doc.replace_all_literal("\u{a0}", "&nbsp;");
    doc.replace_all_literal("--", "\u{2014}");

    let mut from = RowCol::new(1, 0);
    while let Some(hit) = doc.search_forward(&ANGLE_RE, from, doc.end()) {
        let row = hit.start.row;
        let tail = doc.get(Span::new(hit.start, RowCol::new(row, doc.line_len(row))));
        if let Some(tag) = KNOWN_TAG_RE.find(&tail) {
            from = RowCol::new(row, hit.start.col + tag.as_str().chars().count());
        } else {
            let entity = if tail.starts_with('<') { "&lt;" } else { "&gt;" };
            doc.replace(
                Span::new(hit.start, RowCol::new(row, hit.start.col + 1)),
                entity,
            );
            from = RowCol::new(row, hit.start.col + 4);
        }
    }
}

/// Render `_{...}`, `^{...}`, and `^c` as subscript/superscript elements.
/// Returns `None` when the line contains neither.
fn convert_sub_super(line: &str) -> Option<String> {
    let pass = SUB_RE.replace_all(line, "<sub>$1</sub>");
    let pass = SUP_BRACE_RE.replace_all(&pass, "<sup>$1</sup>");
    let pass = SUP_CHAR_RE.replace_all(&pass, "<sup>$1</sup>");
    (pass != line).then(|| pass.into_owned())
}

/// Render a thought break, either the traditional row of five asterisks or
/// an explicit `<tb>` tag. Returns `None` when the line holds neither.
fn convert_thought_break(line: &str) -> Option<String> {
    if TB_LINE_RE.is_match(line) {
        return Some("<hr class=\"tb\">".to_string());
    }
    line.contains("<tb>")
        .then(|| line.replace("<tb>", "<hr class=\"tb\">"))
}

/// Rewrite the short inline markup tags according to the configured
/// rendering for each.
fn convert_inline(doc: &mut Document, settings: &Settings) {
    let renderings = [
        (settings.italic_markup, "i", "italic"),
        (settings.bold_markup, "b", "bold"),
        (settings.gesperrt_markup, "g", "gesperrt"),
        (settings.font_markup, "f", "antiqua"),
        (settings.underline_markup, "u", "u"),
    ];
    for (mode, letter, class) in renderings {
        let open = format!("<{letter}>");
        let close = format!("</{letter}>");
        match mode {
            MarkupMode::Keep => {}
            MarkupMode::Em => {
                doc.replace_all_literal(&open, "<em>");
                doc.replace_all_literal(&close, "</em>");
            }
            MarkupMode::EmClass => {
                doc.replace_all_literal(&open, &format!("<em class=\"{class}\">"));
                doc.replace_all_literal(&close, "</em>");
            }
            MarkupMode::SpanClass => {
                doc.replace_all_literal(&open, &format!("<span class=\"{class}\">"));
                doc.replace_all_literal(&close, "</span>");
            }
        }
    }
}

/// Replace each `<sc>...</sc>` pair with a span classed `smcap` when the
/// content has any lowercase letter, `allsmcap` when it is all uppercase.
///
/// Pairs are processed back to front so the replacements never disturb the
/// positions still to be visited.
fn convert_smallcaps(doc: &mut Document) -> Result<(), MarkupError> {
    let mut before = doc.end();
    while let Some(close_pos) = doc.search_str_backward("</sc>", before) {
        let Some(open_pos) = doc.search_str_backward("<sc>", close_pos) else {
            return Err(MarkupError::UnmatchedClose {
                token: "</sc>".to_string(),
                line: close_pos.row,
            });
        };
        let content_start = RowCol::new(open_pos.row, open_pos.col + 4);
        let content = doc.get(Span::new(content_start, close_pos));
        let class = if content.chars().any(char::is_lowercase) {
            "smcap"
        } else {
            "allsmcap"
        };
        doc.replace(
            Span::new(close_pos, RowCol::new(close_pos.row, close_pos.col + 5)),
            "</span>",
        );
        doc.replace(
            Span::new(open_pos, content_start),
            &format!("<span class=\"{class}\">"),
        );
        before = open_pos;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn doc(text: &str) -> Document {
        Document::from_text(text)
    }

    #[test]
    fn entities_escape_strays_and_keep_markup_tags() {
        let mut d = doc("A <i>dog</i> & 2 < 3\n");
        convert_entities(&mut d);
        assert_eq!(d.line(1), "A <i>dog</i> &amp; 2 &lt; 3");
    }

    #[test]
    fn double_hyphen_becomes_em_dash() {
        let mut d = doc("wait--no\n");
        convert_entities(&mut d);
        assert_eq!(d.line(1), "wait\u{2014}no");
    }

    #[test]
    fn nbsp_becomes_entity() {
        let mut d = doc("page\u{a0}12\n");
        convert_entities(&mut d);
        assert_eq!(d.line(1), "page&nbsp;12");
    }

    #[rstest]
    #[case("H_{2}O", Some("H<sub>2</sub>O"))]
    #[case("x^{10}", Some("x<sup>10</sup>"))]
    #[case("x^2", Some("x<sup>2</sup>"))]
    #[case("plain text", None)]
    fn sub_super_rendering(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(convert_sub_super(line).as_deref(), expected);
    }

    #[test]
    fn asterisk_row_is_a_thought_break() {
        let line = "       *       *       *       *       *";
        assert_eq!(
            convert_thought_break(line).as_deref(),
            Some("<hr class=\"tb\">")
        );
        assert_eq!(convert_thought_break("x <tb> y").as_deref(), Some("x <hr class=\"tb\"> y"));
        assert!(convert_thought_break("ordinary").is_none());
    }

    #[test]
    fn inline_markup_follows_configured_modes() {
        let mut d = doc("<i>a</i> <b>c</b> <g>e</g>\n");
        let settings = Settings::default();
        convert_inline(&mut d, &settings);
        assert_eq!(
            d.line(1),
            "<em>a</em> <em>c</em> <span class=\"gesperrt\">e</span>"
        );
    }

    #[test]
    fn keep_mode_leaves_tags_alone() {
        let mut d = doc("<i>a</i>\n");
        let settings = Settings {
            italic_markup: MarkupMode::Keep,
            ..Settings::default()
        };
        convert_inline(&mut d, &settings);
        assert_eq!(d.line(1), "<i>a</i>");
    }

    #[test]
    fn smallcaps_classified_by_case() {
        let mut d = doc("<sc>Mixed</sc> and <sc>UPPER</sc>\n");
        convert_smallcaps(&mut d).unwrap();
        assert_eq!(
            d.line(1),
            "<span class=\"smcap\">Mixed</span> and <span class=\"allsmcap\">UPPER</span>"
        );
    }

    #[test]
    fn unmatched_smallcaps_close_is_reported() {
        let mut d = doc("no open</sc>\n");
        let err = convert_smallcaps(&mut d).unwrap_err();
        assert!(matches!(err, MarkupError::UnmatchedClose { line: 1, .. }));
    }

    #[test]
    fn full_conversion_wraps_prose_in_paragraphs() {
        let mut d = doc("First paragraph.\n\nSecond & last.\n");
        convert_to_html(&mut d, &Settings::default(), None).unwrap();
        let text = d.to_text();
        assert!(text.starts_with("<!DOCTYPE html>"));
        assert!(text.contains("<p>First paragraph.</p>"));
        assert!(text.contains("<p>Second &amp; last.</p>"));
        assert!(text.ends_with("</body>\n</html>\n"));
    }
}
