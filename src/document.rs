//! Line-addressable mutable text store with named positional markers.
//!
//! The rewrap driver and HTML converter both mutate a [`Document`] in place,
//! line by line. Rows are 1-based and columns are 0-based character offsets,
//! matching the row.col addressing of the editing surface the algorithms were
//! written against. Named markers track a logical location through edits:
//! inserting or deleting text shifts every marker consistently, and a
//! marker's [`Gravity`] decides which side it sticks to when an edit lands
//! exactly on it.
//!
//! All regex searches are line-scoped: `^` and `$` anchor to line
//! boundaries, never to the whole document. Backward regex search scans each
//! line forward and takes the last match, so patterns behave identically in
//! both directions.

use std::collections::HashMap;

use regex::Regex;

/// A position in the document: 1-based row, 0-based character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowCol {
    pub row: usize,
    pub col: usize,
}

impl RowCol {
    #[must_use]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Which side of an edit a marker sticks to when the edit happens exactly at
/// the marker's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    /// Stay before text inserted at the marker.
    Left,
    /// Move after text inserted at the marker.
    Right,
}

/// A half-open range of document text: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: RowCol,
    pub end: RowCol,
}

impl Span {
    #[must_use]
    pub fn new(start: RowCol, end: RowCol) -> Self {
        Self { start, end }
    }

    fn contains(&self, pos: RowCol) -> bool {
        pos >= self.start && pos < self.end
    }
}

#[derive(Debug, Clone)]
struct Marker {
    pos: RowCol,
    gravity: Gravity,
}

/// An ordered sequence of text lines supporting positional edits, searches,
/// and gravity-aware markers.
#[derive(Debug, Clone, Default)]
pub struct Document {
    lines: Vec<String>,
    markers: HashMap<String, Marker>,
}

/// Byte index of character column `col` in `line`.
fn byte_ix(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map_or(line.len(), |(ix, _)| ix)
}

/// Character column of byte index `ix` in `line`.
fn char_col(line: &str, ix: usize) -> usize {
    line[..ix].chars().count()
}

impl Document {
    /// Build a document from raw text. A trailing newline does not produce a
    /// final empty line; an empty input yields a single empty line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        Self {
            lines,
            markers: HashMap::new(),
        }
    }

    /// Render the document back to text with a trailing newline.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.lines.join("\n") + "\n"
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Content of one line, without its newline.
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    #[must_use]
    pub fn line(&self, row: usize) -> &str {
        &self.lines[row - 1]
    }

    /// Character length of one line.
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    #[must_use]
    pub fn line_len(&self, row: usize) -> usize {
        self.lines[row - 1].chars().count()
    }

    /// Position just past the last character of the document.
    #[must_use]
    pub fn end(&self) -> RowCol {
        let row = self.line_count();
        RowCol::new(row, self.line_len(row))
    }

    /// Span covering the whole content of `row`.
    #[must_use]
    pub fn line_span(&self, row: usize) -> Span {
        Span::new(RowCol::new(row, 0), RowCol::new(row, self.line_len(row)))
    }

    /// Text within `span`, with embedded newlines between rows.
    ///
    /// # Panics
    /// Panics if the span's rows are out of range.
    #[must_use]
    pub fn get(&self, span: Span) -> String {
        let Span { start, end } = span;
        if start >= end {
            return String::new();
        }
        if start.row == end.row {
            let line = self.line(start.row);
            return line[byte_ix(line, start.col)..byte_ix(line, end.col)].to_string();
        }
        let mut out = String::new();
        let first = self.line(start.row);
        out.push_str(&first[byte_ix(first, start.col)..]);
        for row in start.row + 1..end.row {
            out.push('\n');
            out.push_str(self.line(row));
        }
        out.push('\n');
        let last = self.line(end.row);
        out.push_str(&last[..byte_ix(last, end.col)]);
        out
    }

    /// Insert `text` at `pos`, shifting markers at or after the insertion
    /// point according to their gravity.
    ///
    /// # Panics
    /// Panics if `pos` is out of range.
    pub fn insert(&mut self, pos: RowCol, text: &str) {
        if text.is_empty() {
            return;
        }
        let segments: Vec<&str> = text.split('\n').collect();
        let added_rows = segments.len() - 1;
        let last_seg_len = segments[segments.len() - 1].chars().count();
        let first_seg_len = segments[0].chars().count();

        let line = &self.lines[pos.row - 1];
        let split = byte_ix(line, pos.col);
        let tail = line[split..].to_string();
        let head_line = &mut self.lines[pos.row - 1];
        head_line.truncate(split);
        if added_rows == 0 {
            head_line.push_str(segments[0]);
            head_line.push_str(&tail);
        } else {
            head_line.push_str(segments[0]);
            let mut new_lines: Vec<String> =
                segments[1..].iter().map(|s| (*s).to_string()).collect();
            if let Some(last) = new_lines.last_mut() {
                last.push_str(&tail);
            }
            let at = pos.row;
            self.lines.splice(at..at, new_lines);
        }

        for marker in self.markers.values_mut() {
            let m = marker.pos;
            let moves = m.row == pos.row
                && (m.col > pos.col || (m.col == pos.col && marker.gravity == Gravity::Right));
            if m.row > pos.row {
                marker.pos.row += added_rows;
            } else if moves {
                if added_rows == 0 {
                    marker.pos.col += first_seg_len;
                } else {
                    marker.pos.row += added_rows;
                    marker.pos.col = m.col - pos.col + last_seg_len;
                }
            }
        }
    }

    /// Delete the text within `span`. Markers inside the span collapse to its
    /// start; markers after it shift back.
    ///
    /// # Panics
    /// Panics if the span's rows are out of range.
    pub fn delete(&mut self, span: Span) {
        let Span { start, end } = span;
        if start >= end {
            return;
        }
        let end_line = self.line(end.row);
        let tail = end_line[byte_ix(end_line, end.col)..].to_string();
        let start_line = &mut self.lines[start.row - 1];
        start_line.truncate(byte_ix(start_line, start.col));
        start_line.push_str(&tail);
        let removed_rows = end.row - start.row;
        if removed_rows > 0 {
            self.lines.drain(start.row..end.row);
        }

        for marker in self.markers.values_mut() {
            let m = marker.pos;
            if m < start {
                continue;
            }
            if span.contains(m) {
                marker.pos = start;
            } else if m.row == end.row {
                marker.pos = RowCol::new(start.row, start.col + (m.col - end.col));
            } else {
                marker.pos.row -= removed_rows;
            }
        }
    }

    /// Replace the text within `span` by `text`.
    ///
    /// Markers inside the span are repositioned proportionally: a marker
    /// sitting at fraction `f` of the old text lands at fraction `f` of the
    /// replacement, rounded to the nearest character. Page-boundary pins
    /// therefore never all collapse to one end of a reflowed paragraph.
    ///
    /// # Panics
    /// Panics if the span's rows are out of range.
    pub fn replace(&mut self, span: Span, text: &str) {
        let old_len = self.get(span).chars().count();
        let pinned: Vec<(String, usize)> = self
            .markers
            .iter()
            .filter(|(_, m)| span.contains(m.pos))
            .map(|(name, m)| (name.clone(), self.offset_within(span.start, m.pos)))
            .collect();

        self.delete(span);
        self.insert(span.start, text);

        if pinned.is_empty() {
            return;
        }
        let new_len = text.chars().count();
        for (name, old_off) in pinned {
            let new_off = if old_len == 0 {
                0
            } else {
                let scaled = old_off as f64 * new_len as f64 / old_len as f64;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let rounded = scaled.round() as usize;
                rounded.min(new_len)
            };
            let pos = advance(span.start, text, new_off);
            if let Some(marker) = self.markers.get_mut(&name) {
                marker.pos = pos;
            }
        }
    }

    /// Character offset of `pos` from `from`, counting one character per
    /// newline.
    fn offset_within(&self, from: RowCol, pos: RowCol) -> usize {
        if from.row == pos.row {
            return pos.col - from.col;
        }
        let mut off = self.line_len(from.row) - from.col + 1;
        for row in from.row + 1..pos.row {
            off += self.line_len(row) + 1;
        }
        off + pos.col
    }

    /// Apply `re` to every line, replacing all matches with the literal
    /// `repl`. Marker positions are kept consistent through each replacement.
    pub fn replace_all(&mut self, re: &Regex, repl: &str) {
        for row in 1..=self.line_count() {
            // Collect byte ranges first, then edit right to left so earlier
            // spans stay valid.
            let ranges: Vec<(usize, usize)> = re
                .find_iter(self.line(row))
                .map(|m| (m.start(), m.end()))
                .collect();
            for (start, end) in ranges.into_iter().rev() {
                let line = self.line(row);
                let span = Span::new(
                    RowCol::new(row, char_col(line, start)),
                    RowCol::new(row, char_col(line, end)),
                );
                self.replace(span, repl);
            }
        }
    }

    /// Replace every literal occurrence of `needle` with `repl`, line by
    /// line, keeping marker positions consistent.
    pub fn replace_all_literal(&mut self, needle: &str, repl: &str) {
        for row in 1..=self.line_count() {
            let ranges: Vec<(usize, usize)> = self
                .line(row)
                .match_indices(needle)
                .map(|(ix, m)| (ix, ix + m.len()))
                .collect();
            for (start, end) in ranges.into_iter().rev() {
                let line = self.line(row);
                let span = Span::new(
                    RowCol::new(row, char_col(line, start)),
                    RowCol::new(row, char_col(line, end)),
                );
                self.replace(span, repl);
            }
        }
    }

    /// Find the first regex match at or after `from`, not beyond `to`.
    /// Matches never cross line boundaries.
    #[must_use]
    pub fn search_forward(&self, re: &Regex, from: RowCol, to: RowCol) -> Option<Span> {
        for row in from.row..=to.row.min(self.line_count()) {
            let line = self.line(row);
            let start_byte = if row == from.row {
                byte_ix(line, from.col)
            } else {
                0
            };
            let Some(m) = re.find(&line[start_byte..]) else {
                continue;
            };
            let m_start = char_col(line, start_byte + m.start());
            let m_end = char_col(line, start_byte + m.end());
            if row == to.row && m_start >= to.col {
                return None;
            }
            return Some(Span::new(RowCol::new(row, m_start), RowCol::new(row, m_end)));
        }
        None
    }

    /// Find the last regex match strictly before `before`, scanning lines
    /// backwards. Each candidate line is scanned forward and the final match
    /// taken, so lookaround-free patterns behave exactly as in forward
    /// search.
    #[must_use]
    pub fn search_backward(&self, re: &Regex, before: RowCol) -> Option<Span> {
        for row in (1..=before.row).rev() {
            let line = self.line(row);
            let limit = if row == before.row {
                byte_ix(line, before.col)
            } else {
                line.len()
            };
            let Some(m) = re.find_iter(&line[..limit]).last() else {
                continue;
            };
            return Some(Span::new(
                RowCol::new(row, char_col(line, m.start())),
                RowCol::new(row, char_col(line, m.end())),
            ));
        }
        None
    }

    /// Find the first literal occurrence of `needle` at or after `from`.
    #[must_use]
    pub fn search_str_forward(&self, needle: &str, from: RowCol) -> Option<RowCol> {
        for row in from.row..=self.line_count() {
            let line = self.line(row);
            let start_byte = if row == from.row {
                byte_ix(line, from.col)
            } else {
                0
            };
            if let Some(ix) = line[start_byte..].find(needle) {
                return Some(RowCol::new(row, char_col(line, start_byte + ix)));
            }
        }
        None
    }

    /// Find the last literal occurrence of `needle` ending at or before
    /// `before`.
    #[must_use]
    pub fn search_str_backward(&self, needle: &str, before: RowCol) -> Option<RowCol> {
        for row in (1..=before.row).rev() {
            let line = self.line(row);
            let limit = if row == before.row {
                byte_ix(line, before.col)
            } else {
                line.len()
            };
            if let Some(ix) = line[..limit].rfind(needle) {
                return Some(RowCol::new(row, char_col(line, ix)));
            }
        }
        None
    }

    /// Set or move a named marker.
    pub fn set_marker(&mut self, name: &str, pos: RowCol, gravity: Gravity) {
        self.markers
            .insert(name.to_string(), Marker { pos, gravity });
    }

    /// Current position of a named marker.
    #[must_use]
    pub fn marker_position(&self, name: &str) -> Option<RowCol> {
        self.markers.get(name).map(|m| m.pos)
    }

    pub fn remove_marker(&mut self, name: &str) {
        self.markers.remove(name);
    }

    /// Names of all markers whose position lies within `span`.
    #[must_use]
    pub fn markers_in(&self, span: Span) -> Vec<String> {
        let mut names: Vec<String> = self
            .markers
            .iter()
            .filter(|(_, m)| span.contains(m.pos))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Walk `off` characters into `text` starting from `start`, treating each
/// newline as one character that resets the column.
fn advance(start: RowCol, text: &str, off: usize) -> RowCol {
    let mut pos = start;
    for ch in text.chars().take(off) {
        if ch == '\n' {
            pos.row += 1;
            pos.col = 0;
        } else {
            pos.col += 1;
        }
    }
    pos
}
