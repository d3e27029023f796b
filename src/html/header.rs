//! HTML header, footer, and CSS finalisation.
//!
//! The default header carries the CSS classes the body converter emits. A
//! user-supplied header either replaces it wholesale (when it is a complete
//! document starting with `<!DOCTYPE`) or is appended to the default CSS just
//! before the closing `</style>`.

use std::collections::BTreeSet;

use crate::document::{Document, RowCol};
use crate::error::MarkupError;

/// Default document header inserted when the user supplies none.
pub const DEFAULT_HEADER: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title></title>
<style>
body {margin-left: 10%; margin-right: 10%;}
h1, h2, h3 {text-align: center; font-weight: normal;}
p {text-indent: 0; margin-top: 0.5em; margin-bottom: 0.5em; text-align: justify;}
.center {text-align: center;}
.right {text-align: right;}
hr.tb {width: 45%; margin: 1em auto;}
.chapter {page-break-before: always;}
.nobreak {page-break-after: avoid;}
.blockquot {margin-left: 5%; margin-right: 5%;}
.smcap {font-variant: small-caps;}
.allsmcap {font-variant: small-caps; text-transform: lowercase;}
.u {text-decoration: underline;}
.gesperrt {letter-spacing: 0.2em;}
.antiqua {font-family: serif;}
.poetry-container {display: flex; justify-content: center;}
.poetry {text-align: left; margin: 1em auto;}
.stanza {margin-bottom: 1em;}
.verse {padding-left: 3em; text-indent: -3em;}
.linenum {float: right; margin-left: 1em; font-size: smaller;}
.index {list-style-type: none;}
.ifrst {margin-top: 1em;}
.indx {margin-left: 0;}
.isub1 {margin-left: 1.5em;}
.isub2 {margin-left: 3em;}
</style>
</head>
<body>"#;

/// Format a half-em measurement the way the converter emits them: one
/// decimal place, 0.5em per unit.
pub(crate) fn half_ems(units: usize) -> String {
    #[allow(clippy::cast_precision_loss)]
    let ems = units as f64 * 0.5;
    format!("{ems:.1}")
}

/// Position of the start of the line containing `</style>`.
///
/// # Errors
/// Returns [`MarkupError::MissingStyleEnd`] when no such line exists.
pub(crate) fn end_of_css(doc: &Document) -> Result<RowCol, MarkupError> {
    doc.search_str_forward("</style>", RowCol::new(1, 0))
        .map(|pos| RowCol::new(pos.row, 0))
        .ok_or(MarkupError::MissingStyleEnd)
}

/// Insert the default and/or user HTML header, and the footer.
///
/// A user header beginning with `<!DOCTYPE` replaces the default entirely;
/// otherwise it is treated as extra CSS and inserted before `</style>`.
///
/// # Errors
/// Returns [`MarkupError::MissingStyleEnd`] if extra CSS cannot be anchored.
pub(crate) fn insert_header_footer(
    doc: &mut Document,
    user_header: Option<&str>,
) -> Result<(), MarkupError> {
    match user_header {
        Some(header) if header.starts_with("<!DOCTYPE") => {
            doc.insert(RowCol::new(1, 0), &format!("{header}\n"));
        }
        other => {
            doc.insert(RowCol::new(1, 0), &format!("{DEFAULT_HEADER}\n"));
            if let Some(header) = other.filter(|h| !h.is_empty()) {
                let at = end_of_css(doc)?;
                doc.insert(at, &format!("{header}\n"));
            }
        }
    }
    doc.insert(doc.end(), "\n</body>\n</html>");
    Ok(())
}

/// Write the collected poetry indent rules into the CSS section.
///
/// A plain verse has 3em padding with -3em text-indent for the hanging
/// indent; every two leading spaces add one em, so each distinct indent `n`
/// needs `text-indent: n * 0.5 - 3em`.
///
/// # Errors
/// Returns [`MarkupError::MissingStyleEnd`] when the header carries no
/// `</style>` line.
pub(crate) fn flush_css_indents(
    doc: &mut Document,
    indents: &BTreeSet<usize>,
) -> Result<(), MarkupError> {
    if indents.is_empty() {
        return Ok(());
    }
    let mut css = String::from("\n/* Poetry indents */\n");
    for &indent in indents {
        #[allow(clippy::cast_precision_loss)]
        let ems = indent as f64 * 0.5 - 3.0;
        css.push_str(&format!(
            ".poetry .indent{indent} {{text-indent: {ems:.1}em;}}\n"
        ));
    }
    css.push('\n');
    let at = end_of_css(doc)?;
    doc.insert(at, &css);
    Ok(())
}
