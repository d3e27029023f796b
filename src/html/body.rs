//! Line-oriented body conversion state machine.
//!
//! A single forward pass over the document, one line at a time. Block
//! markup tokens switch the pass between modal spans (pre-formatted, front
//! matter, poetry, list, blockquote, no-wrap, index, center, right-align);
//! everything else is ordinary prose grouped into `<p>` elements. Inside
//! spans that render each source line as its own HTML element, open inline
//! markup is force-closed at the end of every line and reopened on the next,
//! because an inline element cannot span sibling block elements.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::anchor::make_anchor;
use crate::document::{Document, RowCol, Span};
use crate::error::MarkupError;

use super::header::{self, half_ems};
use super::{convert_sub_super, convert_thought_break};

static LINENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}(\d+) *$").expect("line number regex"));
static POETRY_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^p/$").expect("poetry end regex"));
static ENTITY_LEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[a-z]+?;").expect("entity length regex"));
static SUBSUP_LEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?su[pb]>").expect("sub/sup length regex"));

const IBS_TAGS: [&str; 3] = ["i", "b", "sc"];

/// Which inline markups are still open at the current line boundary.
#[derive(Debug, Default)]
struct IbsFlags([bool; 3]);

impl IbsFlags {
    fn reset(&mut self) {
        self.0 = [false; 3];
    }
}

/// Convert the document body to HTML, then finalise the table of contents,
/// header, footer, and poetry CSS.
pub(super) fn convert_body(
    doc: &mut Document,
    user_header: Option<&str>,
) -> Result<(), MarkupError> {
    BodyPass::new(doc).run(user_header)
}

struct BodyPass<'a> {
    doc: &'a mut Document,
    contents_start: RowCol,
    in_chap_heading: bool,
    chap_id: String,
    chap_heading: String,
    auto_toc: String,
    in_para: bool,
    in_front_para: bool,
    in_stanza: bool,
    pre: bool,
    front: bool,
    poetry: bool,
    list: bool,
    index: bool,
    dollar_nowrap: bool,
    asterisk_nowrap: bool,
    center_nowrap: bool,
    right_nowrap: bool,
    right_block_row: usize,
    right_line_lengths: Vec<usize>,
    poetry_indent: usize,
    blockquote_level: usize,
    index_blank_lines: usize,
    css_indents: BTreeSet<usize>,
    ibs: IbsFlags,
}

impl<'a> BodyPass<'a> {
    fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            contents_start: RowCol::new(1, 0),
            in_chap_heading: false,
            chap_id: String::new(),
            chap_heading: String::new(),
            auto_toc: String::new(),
            in_para: false,
            in_front_para: false,
            in_stanza: false,
            pre: false,
            front: false,
            poetry: false,
            list: false,
            index: false,
            dollar_nowrap: false,
            asterisk_nowrap: false,
            center_nowrap: false,
            right_nowrap: false,
            right_block_row: 0,
            right_line_lengths: Vec::new(),
            poetry_indent: 0,
            blockquote_level: 0,
            index_blank_lines: 0,
            css_indents: BTreeSet::new(),
            ibs: IbsFlags::default(),
        }
    }

    fn run(mut self, user_header: Option<&str>) -> Result<(), MarkupError> {
        let total = self.doc.line_count();
        for step in 1..=total {
            self.step(step)?;
        }
        self.finish(user_header)
    }

    fn line_end(&self, row: usize) -> RowCol {
        RowCol::new(row, self.doc.line_len(row))
    }

    fn replace_line(&mut self, row: usize, text: &str) {
        let span = self.doc.line_span(row);
        self.doc.replace(span, text);
    }

    fn insert_start(&mut self, row: usize, text: &str) {
        self.doc.insert(RowCol::new(row, 0), text);
    }

    fn insert_end(&mut self, row: usize, text: &str) {
        let pos = self.line_end(row);
        self.doc.insert(pos, text);
    }

    /// Raise an error if any non-stacking block markup is already open.
    fn check_illegal_nesting(&self, line: usize) -> Result<(), MarkupError> {
        if self.pre
            || self.front
            || self.poetry
            || self.list
            || self.dollar_nowrap
            || self.asterisk_nowrap
            || self.center_nowrap
            || self.right_nowrap
            || self.index
        {
            return Err(MarkupError::IllegalNesting { line });
        }
        Ok(())
    }

    /// Re-open and force-close italic/bold/small-caps markup around one line
    /// so spans never straddle the per-line HTML elements.
    fn per_line_markup(&mut self, selection: &str, row: usize) {
        if selection.is_empty() {
            return;
        }
        for (ix, tag) in IBS_TAGS.iter().enumerate() {
            let open = format!("<{tag}>");
            let close = format!("</{tag}>");
            if self.ibs.0[ix] {
                self.insert_start(row, &open);
            }
            let open_ix = selection.rfind(&open);
            let close_ix = selection.rfind(&close);
            match (open_ix, close_ix) {
                (Some(o), Some(c)) if o > c => self.ibs.0[ix] = true,
                (Some(o), Some(c)) if c > o => self.ibs.0[ix] = false,
                (Some(_), None) => self.ibs.0[ix] = true,
                (None, Some(_)) => self.ibs.0[ix] = false,
                _ => {}
            }
            if self.ibs.0[ix] {
                self.insert_end(row, &close);
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn step(&mut self, step: usize) -> Result<(), MarkupError> {
        let raw = self.doc.line(step).to_string();

        // Remove trailing spaces first.
        let stripped = raw.trim_end();
        let strip_count = raw.chars().count() - stripped.chars().count();
        if strip_count > 0 {
            let len = self.doc.line_len(step);
            self.doc.delete(Span::new(
                RowCol::new(step, len - strip_count),
                RowCol::new(step, len),
            ));
        }
        let mut selection = stripped.to_string();
        let n_spaces = selection
            .chars()
            .take_while(|c| c.is_whitespace())
            .count();

        // Note start of table of contents (English-only at the moment).
        if step < 100
            && self.contents_start == RowCol::new(1, 0)
            && selection.to_lowercase().contains("contents")
        {
            self.contents_start = RowCol::new(step + 2, 0);
        }

        if let Some(converted) = convert_sub_super(&selection) {
            self.replace_line(step, &converted);
            selection = converted;
        }
        if let Some(tb) = convert_thought_break(&selection) {
            self.replace_line(step, &tb);
            return Ok(());
        }
        let lower = selection.to_lowercase();

        // "/x" becomes "<pre>"; lines stay untouched until "x/" -> "</pre>".
        if lower == "/x" {
            self.replace_line(step, "<pre>");
            self.pre = true;
            return Ok(());
        }
        if self.pre {
            if lower == "x/" {
                self.replace_line(step, "</pre>");
                self.pre = false;
            }
            return Ok(());
        }

        // Remove leading spaces now "pre" is dealt with; n_spaces keeps the
        // count for indent-sensitive constructs below.
        if n_spaces > 0 {
            self.doc.delete(Span::new(
                RowCol::new(step, 0),
                RowCol::new(step, n_spaces),
            ));
        }

        // "/f" centres every paragraph until "f/".
        if lower == "/f" {
            let span = self.doc.line_span(step);
            self.doc.delete(span);
            self.front = true;
            self.in_front_para = false;
            return Ok(());
        }
        if self.front {
            if lower == "f/" {
                if self.in_front_para {
                    self.insert_end(step - 1, "</p>");
                }
                let span = self.doc.line_span(step);
                self.doc.delete(span);
                self.front = false;
            } else if !selection.is_empty() {
                if !self.in_front_para {
                    self.insert_start(step, "<p class=\"center\">");
                    self.in_front_para = true;
                }
            } else if self.in_front_para {
                self.insert_end(step - 1, "</p>");
                self.in_front_para = false;
            }
            return Ok(());
        }

        // "/p" starts poetry until "p/".
        if lower == "/p" {
            self.replace_line(step, "<div class=\"poetry-container\"><div class=\"poetry\">");
            self.poetry = true;
            self.in_stanza = false;
            let Some(close) =
                self.doc
                    .search_forward(&POETRY_END_RE, RowCol::new(step + 1, 0), self.doc.end())
            else {
                return Err(MarkupError::Unclosed {
                    construct: "poetry",
                    token: "/p",
                    line: step,
                });
            };
            self.poetry_indent = poetry_indentation(self.doc, step + 1, close.start.row - 1);
            self.ibs.reset();
            return Ok(());
        }
        if self.poetry {
            if lower == "p/" {
                if self.in_stanza {
                    self.insert_end(step - 1, "</div>");
                }
                self.replace_line(step, "</div></div>");
                self.poetry = false;
            } else if !selection.is_empty() {
                self.poetry_line(step, &selection, n_spaces);
            } else if self.in_stanza {
                self.insert_end(step - 1, "</div>");
                self.in_stanza = false;
            }
            return Ok(());
        }

        // "/l" starts a list until "l/".
        if lower == "/l" {
            self.replace_line(step, "<ul>");
            self.list = true;
            self.ibs.reset();
            return Ok(());
        }
        if self.list {
            if lower == "l/" {
                self.replace_line(step, "</ul>");
                self.list = false;
            } else if !selection.is_empty() {
                self.per_line_markup(&selection, step);
                self.insert_start(step, "<li>");
                self.insert_end(step, "</li>");
            }
            return Ok(());
        }

        // "/#" enters a new blockquote level until "#/".
        if selection.starts_with("/#") {
            self.blockquote_level += 1;
            self.replace_line(step, "<div class=\"blockquot\">");
            return Ok(());
        }
        if selection == "#/" {
            if self.blockquote_level == 0 {
                return Err(MarkupError::UnmatchedClose {
                    token: "#/".to_string(),
                    line: step,
                });
            }
            self.blockquote_level -= 1;
            self.replace_line(step, "</div>");
            return Ok(());
        }

        // "/$" and "/*" are no-wrap paragraphs until "$/" / "*/".
        if selection == "/$" {
            self.check_illegal_nesting(step)?;
            self.dollar_nowrap = true;
            self.replace_line(step, "<p>");
            self.ibs.reset();
            return Ok(());
        }
        if self.dollar_nowrap && selection == "$/" {
            self.dollar_nowrap = false;
            self.replace_line(step, "</p>");
            return Ok(());
        }
        if selection == "/*" {
            self.check_illegal_nesting(step)?;
            self.asterisk_nowrap = true;
            self.replace_line(step, "<p>");
            self.ibs.reset();
            return Ok(());
        }
        if self.asterisk_nowrap && selection == "*/" {
            self.asterisk_nowrap = false;
            self.replace_line(step, "</p>");
            return Ok(());
        }
        if self.dollar_nowrap || self.asterisk_nowrap {
            self.per_line_markup(&selection, step);
            // Half an em of margin per leading space character.
            if n_spaces > 0 {
                self.insert_start(
                    step,
                    &format!("<span style=\"margin-left: {}em;\">", half_ems(n_spaces)),
                );
                self.insert_end(step, "</span>");
            }
            self.insert_end(step, "<br>");
            return Ok(());
        }

        // "/i" starts an index until "i/".
        if lower == "/i" {
            self.check_illegal_nesting(step)?;
            self.index = true;
            self.replace_line(step, "<ul class=\"index\">");
            self.ibs.reset();
            // Force the first entry to be classified as a section start.
            self.index_blank_lines = 2;
            return Ok(());
        }
        if self.index {
            if lower == "i/" {
                self.index = false;
                self.replace_line(step, "</ul>");
                return Ok(());
            }
            if selection.is_empty() {
                self.index_blank_lines += 1;
                return Ok(());
            }
            let classname = match self.index_blank_lines {
                n if n >= 2 => "ifrst".to_string(),
                1 => "indx".to_string(),
                _ => format!("isub{}", (n_spaces + 1) / 2),
            };
            self.insert_start(step, &format!("<li class=\"{classname}\">"));
            self.insert_end(step, "</li>");
            self.index_blank_lines = 0;
            return Ok(());
        }

        // "/c" centres each line until "c/".
        if lower == "/c" {
            self.check_illegal_nesting(step)?;
            self.center_nowrap = true;
            self.replace_line(step, "<p class=\"center\">");
            self.ibs.reset();
            return Ok(());
        }
        if self.center_nowrap {
            if lower == "c/" {
                self.center_nowrap = false;
                self.replace_line(step, "</p>");
            } else {
                self.per_line_markup(&selection, step);
                self.insert_end(step, "<br>");
            }
            return Ok(());
        }

        // "/r" right-aligns a block until "r/".
        if lower == "/r" {
            self.check_illegal_nesting(step)?;
            self.right_nowrap = true;
            self.replace_line(step, "<p class=\"right\">");
            self.ibs.reset();
            // Track line lengths so the right margin's shape survives.
            self.right_line_lengths = Vec::new();
            self.right_block_row = step;
            return Ok(());
        }
        if self.right_nowrap {
            if lower == "r/" {
                self.right_nowrap = false;
                self.replace_line(step, "</p>");
                self.close_right_block();
            } else {
                // Entities render as one character and sub/sup markup as
                // nothing, so strip both before measuring.
                let len_str = ENTITY_LEN_RE.replace_all(&selection, "X");
                let len_str = SUBSUP_LEN_RE.replace_all(&len_str, "");
                self.right_line_lengths.push(len_str.chars().count());
                self.per_line_markup(&selection, step);
            }
            return Ok(());
        }

        // Inside a chapter heading: collect lines until a blank ends it.
        if self.in_chap_heading {
            if selection.is_empty() {
                self.insert_start(step, "</h2></div>");
                self.auto_toc.push_str(&format!(
                    "<a href=\"#{}\">{}</a><br>\n",
                    self.chap_id, self.chap_heading
                ));
                self.in_chap_heading = false;
            } else {
                if !self.chap_heading.is_empty() {
                    self.chap_heading.push(' ');
                }
                self.chap_heading.push_str(selection.trim());
            }
            return Ok(());
        }

        if !selection.is_empty() {
            if !self.in_para {
                self.insert_start(step, "<p>");
                self.in_para = true;
            }
        } else if self.in_para {
            self.insert_end(step - 1, "</p>");
            self.in_para = false;
        } else if self.is_chapter_boundary(step) {
            self.chap_id = make_anchor(self.doc.line(step + 1));
            self.insert_start(step - 1, "<div class=\"chapter\">");
            self.insert_start(step, &format!("<h2 class=\"nobreak\" id=\"{}\">", self.chap_id));
            self.in_chap_heading = true;
            self.chap_heading.clear();
        }
        Ok(())
    }

    /// A blank line preceded by exactly three more blank lines and followed
    /// by content marks a chapter boundary.
    fn is_chapter_boundary(&self, step: usize) -> bool {
        step > 3
            && step < self.doc.line_count()
            && self.doc.line(step - 3).is_empty()
            && self.doc.line(step - 2).is_empty()
            && self.doc.line(step - 1).is_empty()
            && !self.doc.line(step + 1).is_empty()
    }

    /// One non-blank line inside a poetry span: strip any trailing line
    /// number before the per-line markup pass, then wrap the line in its
    /// verse element and re-append the number, specially tagged.
    fn poetry_line(&mut self, step: usize, selection: &str, n_spaces: usize) {
        let mut linenum_markup = String::new();
        if let Some(caps) = LINENUM_RE.captures(selection) {
            let matched_len = caps
                .get(0)
                .map_or(0, |m| m.as_str().chars().count());
            linenum_markup = format!("<span class=\"linenum\">{}</span>", &caps[1]);
            let len = self.doc.line_len(step);
            self.doc.delete(Span::new(
                RowCol::new(step, len - matched_len),
                RowCol::new(step, len),
            ));
        }
        self.per_line_markup(selection, step);
        let indent = n_spaces.saturating_sub(self.poetry_indent);
        self.insert_start(step, &format!("<div class=\"verse indent{indent}\">"));
        self.insert_end(step, &format!("{linenum_markup}</div>"));
        self.css_indents.insert(indent);
        if !self.in_stanza {
            self.insert_start(step, "<div class=\"stanza\">");
            self.in_stanza = true;
        }
    }

    /// Pad the lines of a finished right-align block so the ragged right
    /// margin keeps its shape, half an em per missing character.
    fn close_right_block(&mut self) {
        let max_len = self.right_line_lengths.iter().copied().max().unwrap_or(0);
        let mut row = self.right_block_row;
        for line_len in std::mem::take(&mut self.right_line_lengths) {
            row += 1;
            let right_pad = max_len - line_len;
            if line_len > 0 && right_pad > 0 {
                self.insert_start(
                    row,
                    &format!("<span style=\"margin-left: {}em;\">", half_ems(right_pad)),
                );
                self.insert_end(row, "</span>");
            }
            self.insert_end(row, "<br>");
        }
    }

    fn finish(self, user_header: Option<&str>) -> Result<(), MarkupError> {
        // The file may end without a final blank line.
        if self.in_para {
            let end = self.doc.end();
            self.doc.insert(end, "</p>");
        }

        let unclosed: [(bool, &'static str, &'static str); 8] = [
            (self.pre, "pre-formatted", "/x"),
            (self.front, "front matter", "/f"),
            (self.poetry, "poetry", "/p"),
            (self.list, "list", "/l"),
            (self.dollar_nowrap, "no-wrap", "/$"),
            (self.asterisk_nowrap, "no-wrap", "/*"),
            (self.index, "index", "/i"),
            (self.blockquote_level > 0, "blockquote", "/#"),
        ];
        for (open, construct, token) in unclosed {
            if open {
                return Err(MarkupError::UnclosedAtEof { construct, token });
            }
        }

        if !self.auto_toc.is_empty() {
            let row = self.contents_start.row.min(self.doc.line_count());
            self.doc.insert(
                RowCol::new(row, 0),
                &format!(
                    "\n<!-- Autogenerated TOC. Modify or delete as required. -->\n\
                     <p>\n{}</p>\n<!-- End Autogenerated TOC. -->\n\n",
                    self.auto_toc
                ),
            );
        }

        header::insert_header_footer(self.doc, user_header)?;
        header::flush_css_indents(self.doc, &self.css_indents)
    }
}

/// Minimum indentation across the non-blank lines of a poem.
fn poetry_indentation(doc: &Document, first: usize, last: usize) -> usize {
    let mut min_indent = 1000;
    for row in first..=last {
        let line = doc.line(row);
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.chars().take_while(|c| c.is_whitespace()).count();
        min_indent = min_indent.min(indent);
        if min_indent == 0 {
            break;
        }
    }
    min_indent
}
