//! Integration tests for the markup-to-HTML conversion pipeline.

use ppflow::{Document, MarkupError, MarkupMode, Settings, convert_to_html};

#[macro_use]
mod common;

fn convert(text: &str) -> String {
    let mut doc = Document::from_text(text);
    convert_to_html(&mut doc, &Settings::default(), None).expect("conversion failed");
    doc.to_text()
}

fn convert_err(text: &str) -> MarkupError {
    let mut doc = Document::from_text(text);
    convert_to_html(&mut doc, &Settings::default(), None).unwrap_err()
}

#[test]
fn prose_becomes_paragraphs_inside_full_document() {
    let out = convert(text_block!("First paragraph.", "", "Second one."));
    assert!(out.starts_with("<!DOCTYPE html>"));
    assert!(out.contains("<p>First paragraph.</p>"));
    assert!(out.contains("<p>Second one.</p>"));
    assert!(out.ends_with("</body>\n</html>\n"));
}

#[test]
fn entities_inline_and_smallcaps_compose() {
    let out = convert("He said <sc>Yes</sc> & <i>left</i> -- at 2 < 3.\n");
    assert!(out.contains(
        "<p>He said <span class=\"smcap\">Yes</span> &amp; <em>left</em> \
         \u{2014} at 2 &lt; 3.</p>"
    ));
}

#[test]
fn smallcaps_of_uppercase_text_lowercases_via_css() {
    let out = convert("<sc>SHOUTED</sc> then <sc>Spoken</sc>\n");
    assert!(out.contains("<span class=\"allsmcap\">SHOUTED</span>"));
    assert!(out.contains("<span class=\"smcap\">Spoken</span>"));
}

#[test]
fn poetry_block_produces_verse_markup_and_css() {
    let out = convert(text_block!(
        "/p",
        "  Tiger, tiger, burning bright        3",
        "  In the forests of the night",
        "p/",
    ));
    assert!(out.contains("<div class=\"poetry-container\"><div class=\"poetry\">"));
    assert!(out.contains(
        "<div class=\"stanza\"><div class=\"verse indent0\">Tiger, tiger, \
         burning bright<span class=\"linenum\">3</span></div>"
    ));
    assert!(out.contains("<div class=\"verse indent0\">In the forests of the night</div></div>"));
    assert!(out.contains(".poetry .indent0 {text-indent: -3.0em;}"));
}

#[test]
fn two_stanza_poem_keeps_stanza_grouping_and_relative_indents() {
    let out = convert(text_block!(
        "/p",
        "Roses are red,",
        "Violets are blue.",
        "",
        "Sugar is sweet,",
        "     And so are you.",
        "p/",
    ));
    assert_eq!(out.matches("<div class=\"stanza\">").count(), 2);
    assert!(out.contains("<div class=\"verse indent0\">Roses are red,</div>"));
    assert!(out.contains("<div class=\"verse indent5\">And so are you.</div></div>"));
    assert!(out.contains(".poetry .indent5 {text-indent: -0.5em;}"));
}

#[test]
fn stray_angle_brackets_are_escaped_but_markup_tags_survive() {
    let out = convert("A & B < C > D\n");
    assert!(out.contains("<p>A &amp; B &lt; C &gt; D</p>"));
}

#[test]
fn chapter_heading_gains_anchor_and_toc_entry() {
    let out = convert(text_block!(
        "CONTENTS",
        "",
        "",
        "",
        "",
        "",
        "CHAPTER I",
        "",
        "Once upon a time.",
    ));
    assert!(out.contains("<div class=\"chapter\">"));
    assert!(out.contains("<h2 class=\"nobreak\" id=\"CHAPTER_I\">"));
    assert!(out.contains("</h2></div>"));
    assert!(out.contains("<!-- Autogenerated TOC. Modify or delete as required. -->"));
    assert!(out.contains("<a href=\"#CHAPTER_I\">CHAPTER I</a><br>"));
}

#[test]
fn front_matter_centres_each_paragraph() {
    let out = convert(text_block!("/f", "Title Page", "", "by Someone", "f/"));
    assert!(out.contains("<p class=\"center\">Title Page</p>"));
    assert!(out.contains("<p class=\"center\">by Someone</p>"));
}

#[test]
fn list_block_renders_items() {
    let out = convert(text_block!("/l", "item one", "item two", "l/"));
    assert!(out.contains("<ul>\n<li>item one</li>\n<li>item two</li>\n</ul>"));
}

#[test]
fn blockquote_renders_as_div() {
    let out = convert(text_block!("/#", "Quoted text here.", "", "#/"));
    assert!(out.contains("<div class=\"blockquot\">\n<p>Quoted text here.</p>\n\n</div>"));
}

#[test]
fn nowrap_block_keeps_layout_with_margin_spans() {
    let out = convert(text_block!("/$", "  indented line", "plain line", "$/"));
    assert!(out.contains(
        "<span style=\"margin-left: 1.0em;\">indented line</span><br>\n\
         plain line<br>"
    ));
}

#[test]
fn inline_markup_is_reopened_per_line_in_center_blocks() {
    let out = convert(text_block!("/c", "<i>first", "second</i>", "c/"));
    assert!(out.contains("<p class=\"center\">\n<em>first</em><br>\n<em>second</em><br>\n</p>"));
}

#[test]
fn literal_block_is_left_alone() {
    let out = convert(text_block!("/x", "  2 < 3 & 4", "x/"));
    // Entity conversion runs before the body pass, so escaping still applies,
    // but the line keeps its spacing and gets no paragraph markup.
    assert!(out.contains("<pre>\n  2 &lt; 3 &amp; 4\n</pre>"));
}

#[test]
fn asterisk_row_renders_thought_break() {
    let out = convert(text_block!(
        "before",
        "",
        "       *       *       *       *       *",
        "",
        "after",
    ));
    assert!(out.contains("<hr class=\"tb\">"));
}

#[test]
fn right_block_pads_short_lines_to_preserve_shape() {
    let out = convert(text_block!("/r", "short", "a longer line", "r/"));
    // "a longer line" is 13 wide, "short" is 5, so the pad is 8 characters.
    assert!(out.contains("<span style=\"margin-left: 4.0em;\">short</span><br>"));
    assert!(out.contains("a longer line<br>"));
}

#[test]
fn index_entries_are_classified_by_blank_runs_and_indent() {
    let out = convert(text_block!(
        "/i",
        "Animals",
        "",
        "Aardvark, 3",
        "  burrows, 4",
        "i/",
    ));
    assert!(out.contains("<ul class=\"index\">"));
    assert!(out.contains("<li class=\"ifrst\">Animals</li>"));
    assert!(out.contains("<li class=\"indx\">Aardvark, 3</li>"));
    assert!(out.contains("<li class=\"isub1\">burrows, 4</li>"));
}

#[test]
fn configured_markup_modes_change_rendering() {
    let settings = Settings {
        italic_markup: MarkupMode::EmClass,
        bold_markup: MarkupMode::Keep,
        ..Settings::default()
    };
    let mut doc = Document::from_text("<i>a</i> <b>c</b>\n");
    convert_to_html(&mut doc, &settings, None).expect("conversion failed");
    let out = doc.to_text();
    assert!(out.contains("<em class=\"italic\">a</em> <b>c</b>"));
}

#[test]
fn user_css_is_spliced_into_the_header() {
    let mut doc = Document::from_text("body text\n");
    convert_to_html(&mut doc, &Settings::default(), Some(".extra {color: red;}"))
        .expect("conversion failed");
    let out = doc.to_text();
    let css_at = out.find(".extra").expect("user css missing");
    let style_end = out.find("</style>").expect("style end missing");
    assert!(css_at < style_end);
}

#[test]
fn sub_and_superscript_render_as_elements() {
    let out = convert("H_{2}O and E = mc^2\n");
    assert!(out.contains("<p>H<sub>2</sub>O and E = mc<sup>2</sup></p>"));
}

#[test]
fn unclosed_poetry_is_fatal() {
    let err = convert_err(text_block!("/p", "  a verse"));
    assert!(matches!(
        err,
        MarkupError::Unclosed {
            construct: "poetry",
            line: 1,
            ..
        }
    ));
}

#[test]
fn nested_nowrap_is_fatal() {
    let err = convert_err(text_block!("/$", "/$", "x", "$/"));
    assert!(matches!(err, MarkupError::IllegalNesting { line: 2 }));
}

#[test]
fn unmatched_blockquote_close_is_fatal() {
    let err = convert_err("#/\n");
    assert!(matches!(err, MarkupError::UnmatchedClose { line: 1, .. }));
}

#[test]
fn block_open_without_close_by_eof_is_fatal() {
    let err = convert_err(text_block!("/#", "quoted"));
    assert!(matches!(
        err,
        MarkupError::UnclosedAtEof {
            construct: "blockquote",
            ..
        }
    ));
}
