//! Read-only settings consumed by the rewrap driver and HTML converter.
//!
//! Settings are supplied by the caller, either as compiled-in defaults or
//! loaded from a TOML file. The core never writes them back.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How a short inline tag (`<i>`, `<b>`, `<g>`, `<f>`, `<u>`) is rendered in
/// the generated HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkupMode {
    /// Pass the tag through unchanged.
    Keep,
    /// Replace with a bare `<em>` element.
    Em,
    /// Replace with `<em class="...">`.
    EmClass,
    /// Replace with `<span class="...">`.
    SpanClass,
}

/// Margin, indent, and rendering preferences for one processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Left margin for top-level paragraph text.
    pub left_margin: usize,
    /// Right margin (maximum line width) for wrapped text.
    pub right_margin: usize,
    /// Extra indent applied per blockquote nesting level.
    pub blockquote_indent: usize,
    /// Right margin used inside blockquotes at nesting depth 1.
    pub blockquote_right: usize,
    /// Target indent for poetry blocks relative to the enclosing margin.
    pub poetry_indent: usize,
    /// Base left margin for index entries.
    pub index_main: usize,
    /// Left margin for wrapped continuation lines of index entries.
    pub index_wrap: usize,
    /// Right margin for index entries.
    pub index_right: usize,
    /// Rendering for `<i>` italic markup.
    pub italic_markup: MarkupMode,
    /// Rendering for `<b>` bold markup.
    pub bold_markup: MarkupMode,
    /// Rendering for `<g>` letter-spaced (gesperrt) markup.
    pub gesperrt_markup: MarkupMode,
    /// Rendering for `<f>` font-change (antiqua) markup.
    pub font_markup: MarkupMode,
    /// Rendering for `<u>` underline markup.
    pub underline_markup: MarkupMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            left_margin: 0,
            right_margin: 72,
            blockquote_indent: 4,
            blockquote_right: 72,
            poetry_indent: 4,
            index_main: 2,
            index_wrap: 8,
            index_right: 72,
            italic_markup: MarkupMode::Em,
            bold_markup: MarkupMode::Em,
            gesperrt_markup: MarkupMode::SpanClass,
            font_markup: MarkupMode::SpanClass,
            underline_markup: MarkupMode::SpanClass,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults for any
    /// omitted field.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert!(s.right_margin > s.left_margin);
        assert_eq!(s.italic_markup, MarkupMode::Em);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let s: Settings = toml::from_str("right_margin = 65\n").unwrap();
        assert_eq!(s.right_margin, 65);
        assert_eq!(s.blockquote_indent, 4);
    }

    #[test]
    fn markup_mode_round_trips_kebab_case() {
        let s: Settings = toml::from_str("italic_markup = \"span-class\"\n").unwrap();
        assert_eq!(s.italic_markup, MarkupMode::SpanClass);
    }
}
