//! Library for post-processing book transcriptions.
//!
//! Functions here rewrap markup-structured text to configurable margins
//! while preserving page-boundary pins, and convert the same markup into an
//! HTML document body.

pub mod anchor;
pub mod config;
pub mod document;
pub mod error;
pub mod html;
pub mod rewrap;
pub mod wrap;

pub use anchor::make_anchor;
pub use config::{MarkupMode, Settings};
pub use document::{Document, Gravity, RowCol, Span};
pub use error::MarkupError;
pub use html::{DEFAULT_HEADER, convert_to_html};
pub use rewrap::{rewrap_document, rewrap_section};
pub use wrap::{PIN, WrapParams, wrap_paragraph};
