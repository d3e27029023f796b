//! Block-structure rewrap driver.
//!
//! Walks a document section line by line, recognising block markup tokens at
//! the start of each trimmed line, and reflows everything between them.
//! Plain prose accumulates into paragraphs and is wrapped to the margins of
//! the innermost open blockquote; fixed blocks are reindented, right-aligned,
//! centred, or wrapped entry-by-entry according to their kind. Token lines
//! themselves are left in place so the markup survives for later conversion.
//!
//! Two right-gravity markers pin the end of the section and the next line to
//! process, so in-place replacements earlier in the section never move the
//! stopping point or the scan cursor.

use std::cmp::Ordering;

use crate::config::Settings;
use crate::document::{Document, Gravity, RowCol, Span};
use crate::error::MarkupError;
use crate::wrap::{PIN, WrapParams, wrap_paragraph};

mod margins;

pub use margins::{Overrides, parse_overrides};

use unicode_width::UnicodeWidthChar;

const END_MARK: &str = "rewrap:section-end";
const NEXT_MARK: &str = "rewrap:next-line";
const CLOSE_MARK: &str = "rewrap:block-close";

/// The block constructs that may not nest inside one another. Blockquotes
/// stack orthogonally and are handled separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Literal,
    DollarNowrap,
    AsteriskNowrap,
    Poetry,
    List,
    Index,
    Center,
    Right,
}

const KINDS: [BlockKind; 8] = [
    BlockKind::Literal,
    BlockKind::DollarNowrap,
    BlockKind::AsteriskNowrap,
    BlockKind::Poetry,
    BlockKind::List,
    BlockKind::Index,
    BlockKind::Center,
    BlockKind::Right,
];

impl BlockKind {
    fn open_token(self) -> &'static str {
        match self {
            Self::Literal => "/x",
            Self::DollarNowrap => "/$",
            Self::AsteriskNowrap => "/*",
            Self::Poetry => "/p",
            Self::List => "/l",
            Self::Index => "/i",
            Self::Center => "/c",
            Self::Right => "/r",
        }
    }

    fn close_token(self) -> &'static str {
        match self {
            Self::Literal => "x/",
            Self::DollarNowrap => "$/",
            Self::AsteriskNowrap => "*/",
            Self::Poetry => "p/",
            Self::List => "l/",
            Self::Index => "i/",
            Self::Center => "c/",
            Self::Right => "r/",
        }
    }

    fn construct(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::DollarNowrap | Self::AsteriskNowrap => "no-wrap",
            Self::Poetry => "poetry",
            Self::List => "list",
            Self::Index => "index",
            Self::Center => "center",
            Self::Right => "right-align",
        }
    }
}

#[derive(Debug)]
enum Token {
    QuoteOpen(Overrides),
    QuoteClose,
    Open(BlockKind, Overrides),
    Close(BlockKind),
}

/// Recognise a block markup token at the start of a trimmed line. Letter
/// tokens are case-insensitive; the symbol tokens are literal.
fn classify(trimmed: &str) -> Option<Token> {
    if trimmed == "#/" {
        return Some(Token::QuoteClose);
    }
    if let Some(rest) = trimmed.strip_prefix("/#") {
        return Some(Token::QuoteOpen(parse_overrides(rest).unwrap_or_default()));
    }
    let lower = trimmed.to_ascii_lowercase();
    for kind in KINDS {
        if lower == kind.close_token() {
            return Some(Token::Close(kind));
        }
        if let Some(rest) = lower.strip_prefix(kind.open_token())
            && let Some(ovr) = parse_overrides(rest)
        {
            return Some(Token::Open(kind, ovr));
        }
    }
    None
}

/// Rewrap rows `start_row..=end_row` of `doc` in place.
///
/// The `tidy` callback runs on every exit path, success or error, after the
/// driver's scratch markers have been removed; callers use it to restore
/// cursors or release UI state regardless of how the pass ended.
///
/// # Errors
/// Returns a [`MarkupError`] for any unmatched open or close token; the
/// document is left in its partially rewrapped state.
pub fn rewrap_section<F: FnOnce()>(
    doc: &mut Document,
    start_row: usize,
    end_row: usize,
    settings: &Settings,
    tidy: F,
) -> Result<(), MarkupError> {
    let result = rewrap_inner(doc, start_row, end_row, settings);
    for name in [END_MARK, NEXT_MARK, CLOSE_MARK] {
        doc.remove_marker(name);
    }
    tidy();
    result
}

/// Rewrap the whole document.
///
/// # Errors
/// Returns a [`MarkupError`] for any unmatched open or close token.
pub fn rewrap_document(doc: &mut Document, settings: &Settings) -> Result<(), MarkupError> {
    rewrap_section(doc, 1, doc.line_count(), settings, || {})
}

fn section_end(doc: &Document) -> RowCol {
    doc.marker_position(END_MARK)
        .expect("section end marker is set for the whole pass")
}

fn rewrap_inner(
    doc: &mut Document,
    start_row: usize,
    end_row: usize,
    settings: &Settings,
) -> Result<(), MarkupError> {
    let end_row = end_row.min(doc.line_count());
    doc.set_marker(
        END_MARK,
        RowCol::new(end_row, doc.line_len(end_row)),
        Gravity::Right,
    );

    let base = WrapParams::uniform(settings.left_margin, settings.right_margin);
    let mut stack: Vec<WrapParams> = vec![base];
    let mut open_rows: Vec<usize> = Vec::new();
    let mut para: Option<usize> = None;
    let mut row = start_row;

    loop {
        let end = section_end(doc).row;
        if row > end {
            if let Some(first) = para.take() {
                flush_paragraph(doc, first, end, top(&stack));
            }
            break;
        }
        let trimmed = doc.line(row).trim().to_string();

        if trimmed.is_empty() {
            row = flush_before(doc, &mut para, row, &stack) + 1;
            continue;
        }
        let Some(token) = classify(&trimmed) else {
            if para.is_none() {
                para = Some(row);
            }
            row += 1;
            continue;
        };
        row = flush_before(doc, &mut para, row, &stack);
        match token {
            Token::QuoteOpen(ovr) => {
                stack.push(quote_params(&stack, ovr, settings));
                open_rows.push(row);
                row += 1;
            }
            Token::QuoteClose => {
                if stack.len() == 1 {
                    return Err(MarkupError::UnmatchedClose {
                        token: "#/".to_string(),
                        line: row,
                    });
                }
                stack.pop();
                open_rows.pop();
                row += 1;
            }
            Token::Close(kind) => {
                return Err(MarkupError::UnmatchedClose {
                    token: kind.close_token().to_string(),
                    line: row,
                });
            }
            Token::Open(kind, ovr) => {
                row = process_block(doc, kind, ovr, row, settings, top(&stack))?;
            }
        }
    }

    if stack.len() > 1 {
        return Err(MarkupError::Unclosed {
            construct: "blockquote",
            token: "/#",
            line: open_rows.last().copied().unwrap_or(start_row),
        });
    }
    Ok(())
}

fn top(stack: &[WrapParams]) -> WrapParams {
    *stack.last().expect("margin stack never empty")
}

/// Margins for a newly opened blockquote level: the enclosing margins plus
/// the configured indent step. The right margin defaults to the configured
/// blockquote right margin only at depth 0, otherwise it is inherited.
/// Bracket overrides replace fields individually; a left override with no
/// first override sets both.
fn quote_params(stack: &[WrapParams], ovr: Overrides, settings: &Settings) -> WrapParams {
    let encl = top(stack);
    let step = settings.blockquote_indent;
    let mut params = WrapParams {
        left: encl.left + step,
        first: encl.first + step,
        right: if stack.len() == 1 {
            settings.blockquote_right
        } else {
            encl.right
        },
    };
    if let Some(left) = ovr.left {
        params.left = left;
        params.first = left;
    }
    if let Some(first) = ovr.first {
        params.first = first;
    }
    if let Some(right) = ovr.right {
        params.right = right;
    }
    params
}

/// Flush any pending paragraph ending just before `row`, returning the row's
/// position after the reflow has shifted line numbers.
fn flush_before(
    doc: &mut Document,
    para: &mut Option<usize>,
    row: usize,
    stack: &[WrapParams],
) -> usize {
    let Some(first) = para.take() else {
        return row;
    };
    doc.set_marker(NEXT_MARK, RowCol::new(row, 0), Gravity::Right);
    flush_paragraph(doc, first, row - 1, top(stack));
    doc.marker_position(NEXT_MARK).map_or(row, |pos| pos.row)
}

/// Wrap the paragraph occupying rows `first..=last` and replace it in place.
fn flush_paragraph(doc: &mut Document, first: usize, last: usize, params: WrapParams) {
    let span = Span::new(
        RowCol::new(first, 0),
        RowCol::new(last, doc.line_len(last)),
    );
    let text = doc.get(span);
    let wrapped = wrap_paragraph(&text, &params);
    let replacement = wrapped.strip_suffix('\n').unwrap_or(&wrapped);
    doc.replace(span, replacement);
}

/// Handle one fixed block from its open token line to its close token line,
/// returning the row after the close token.
fn process_block(
    doc: &mut Document,
    kind: BlockKind,
    ovr: Overrides,
    open_row: usize,
    settings: &Settings,
    encl: WrapParams,
) -> Result<usize, MarkupError> {
    let close = find_close(doc, kind, open_row)?;
    doc.set_marker(CLOSE_MARK, RowCol::new(close, 0), Gravity::Right);
    let body = open_row + 1;
    match kind {
        BlockKind::Literal => {}
        BlockKind::DollarNowrap | BlockKind::AsteriskNowrap | BlockKind::List => {
            let target = ovr.left.unwrap_or(encl.left);
            reindent_block(doc, body, close - 1, target);
        }
        BlockKind::Poetry => {
            let target = ovr.left.unwrap_or(encl.left + settings.poetry_indent);
            reindent_block(doc, body, close - 1, target);
        }
        BlockKind::Right => {
            // First bracket field overrides the target right margin.
            let target = ovr.left.unwrap_or(encl.right);
            right_align_block(doc, body, close - 1, target);
        }
        BlockKind::Center => {
            let right = ovr.left.unwrap_or(encl.right);
            center_block(doc, body, close - 1, encl.left, right);
        }
        BlockKind::Index => {
            index_block(doc, body, settings, ovr);
        }
    }
    let close_row = doc.marker_position(CLOSE_MARK).map_or(close, |pos| pos.row);
    doc.remove_marker(CLOSE_MARK);
    Ok(close_row + 1)
}

fn find_close(doc: &Document, kind: BlockKind, open_row: usize) -> Result<usize, MarkupError> {
    let end = section_end(doc).row;
    for row in open_row + 1..=end {
        if doc.line(row).trim().eq_ignore_ascii_case(kind.close_token()) {
            return Ok(row);
        }
    }
    Err(MarkupError::Unclosed {
        construct: kind.construct(),
        token: kind.open_token(),
        line: open_row,
    })
}

fn leading_spaces(line: &str) -> usize {
    line.chars().take_while(|&c| c == ' ').count()
}

/// Leading indent and visible width of a line, ignoring trailing whitespace
/// and pin placeholders. `None` for blank lines.
fn visible_extent(line: &str) -> Option<(usize, usize)> {
    let body = line.trim_end_matches(|c: char| c.is_whitespace() || c == PIN);
    let leading = leading_spaces(body);
    let content = &body[leading..];
    if content.is_empty() {
        return None;
    }
    let width = content
        .chars()
        .filter(|&c| c != PIN)
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
        .sum();
    Some((leading, width))
}

/// Insert or remove leading spaces on one line.
fn shift_line(doc: &mut Document, row: usize, delta: isize) {
    match delta.cmp(&0) {
        Ordering::Greater => {
            doc.insert(RowCol::new(row, 0), &" ".repeat(delta.unsigned_abs()));
        }
        Ordering::Less => {
            doc.delete(Span::new(
                RowCol::new(row, 0),
                RowCol::new(row, delta.unsigned_abs()),
            ));
        }
        Ordering::Equal => {}
    }
}

/// Shift a block uniformly so its minimum existing indent lands on `target`.
fn reindent_block(doc: &mut Document, first: usize, last: usize, target: usize) {
    let mut min_indent: Option<usize> = None;
    for row in first..=last {
        let line = doc.line(row);
        if line.trim().is_empty() {
            continue;
        }
        let indent = leading_spaces(line);
        min_indent = Some(min_indent.map_or(indent, |min| min.min(indent)));
    }
    let Some(min) = min_indent else {
        return;
    };
    #[allow(clippy::cast_possible_wrap)]
    let delta = target as isize - min as isize;
    for row in first..=last {
        if doc.line(row).trim().is_empty() {
            continue;
        }
        shift_line(doc, row, delta);
    }
}

/// Shift a block uniformly so its right edge lands on `target`, refusing to
/// move the block left of its own left margin.
fn right_align_block(doc: &mut Document, first: usize, last: usize, target: usize) {
    let mut min_left = usize::MAX;
    let mut max_right = 0;
    for row in first..=last {
        let Some((left, width)) = visible_extent(doc.line(row)) else {
            continue;
        };
        min_left = min_left.min(left);
        max_right = max_right.max(left + width);
    }
    if max_right == 0 {
        return;
    }
    #[allow(clippy::cast_possible_wrap)]
    let shift = (target as isize - max_right as isize).max(-(min_left as isize));
    for row in first..=last {
        if visible_extent(doc.line(row)).is_none() {
            continue;
        }
        shift_line(doc, row, shift);
    }
}

/// Centre each line of a block on the midpoint of the given margins.
fn center_block(doc: &mut Document, first: usize, last: usize, left: usize, right: usize) {
    let target = usize::midpoint(left, right);
    for row in first..=last {
        let Some((lead, width)) = visible_extent(doc.line(row)) else {
            continue;
        };
        let indent = target.saturating_sub(width / 2);
        #[allow(clippy::cast_possible_wrap)]
        shift_line(doc, row, indent as isize - lead as isize);
    }
}

/// Wrap each non-blank index entry individually. The entry's existing indent
/// is added to the main margin for its first line; continuation lines use the
/// wrap margin.
fn index_block(doc: &mut Document, first: usize, settings: &Settings, ovr: Overrides) {
    let wrap_margin = ovr.left.unwrap_or(settings.index_wrap);
    let main_margin = ovr.first.unwrap_or(settings.index_main);
    let right = ovr.right.unwrap_or(settings.index_right);

    let mut row = first;
    while row
        < doc
            .marker_position(CLOSE_MARK)
            .expect("close marker set while block is open")
            .row
    {
        let line = doc.line(row).to_string();
        if line.trim().is_empty() {
            row += 1;
            continue;
        }
        let params = WrapParams {
            left: wrap_margin,
            first: main_margin + leading_spaces(&line),
            right,
        };
        let wrapped = wrap_paragraph(&line, &params);
        let produced = wrapped.lines().count().max(1);
        let replacement = wrapped.strip_suffix('\n').unwrap_or(&wrapped).to_string();
        let span = doc.line_span(row);
        doc.replace(span, &replacement);
        row += produced;
    }
}
