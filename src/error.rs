//! Error taxonomy for the rewrap and HTML conversion passes.
//!
//! All structural violations are fatal to the current pass. The document is
//! left in whatever partially edited state existed when the error was
//! detected; callers must treat a failed pass as leaving the text
//! mid-transformation.

/// A structural markup error detected during a rewrap or conversion pass.
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    /// An open block token had no matching close token before the end of the
    /// section or file.
    #[error("Line {line}: {construct} ({token}) markup not closed")]
    Unclosed {
        construct: &'static str,
        token: &'static str,
        line: usize,
    },

    /// A close token was found with no corresponding open block.
    #[error("Line {line}: unmatched close markup ({token})")]
    UnmatchedClose { token: String, line: usize },

    /// A block-opening token was found while another block was still open.
    #[error("Line {line}: illegally nested block markup")]
    IllegalNesting { line: usize },

    /// A block was still open when the end of the file was reached.
    #[error("{construct} ({token}) markup not closed by end of file")]
    UnclosedAtEof {
        construct: &'static str,
        token: &'static str,
    },

    /// The HTML header in the document carries no `</style>` line to anchor
    /// CSS insertion.
    #[error("no '</style>' line found in HTML header")]
    MissingStyleEnd,
}
