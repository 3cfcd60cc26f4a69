//! # Quire
//!
//! A flow layout engine: styled content in, pages of positioned blocks,
//! lines and runs out.
//!
//! Content does not get laid out on an endless canvas and cut into pages
//! afterwards. It flows *into* regions: columns of blocks, which live on
//! pages. Whenever something does not fit, the engine decides right there
//! whether it moves to the next column, to the next page, or stops, and
//! the blocks around it are continued as fresh fragments on the other side.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    Content tree: nodes, raw styles
//!       ↓
//!   [style]    Resolve inheritance and defaults
//!       ↓
//!   [layout]   Flow content into regions, blocks and pages
//!       ↓
//!   [output]   Immutable laid-out tree in page coordinates
//! ```
//!
//! Producing bytes (PDF or otherwise) is left to a renderer walking the
//! [`LaidOutDocument`] through [`layout::RenderVisitor`].

pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod style;

use config::LayoutConfig;
use error::QuireError;
use font::{FontContext, TextMeasurer};
use model::Document;

pub use layout::LaidOutDocument;

/// Lay out a document with the built-in fonts plus the document's own.
///
/// This is the primary entry point.
pub fn layout_document(
    document: &Document,
    config: &LayoutConfig,
) -> Result<LaidOutDocument, QuireError> {
    let mut fonts = FontContext::new();
    fonts.register_entries(&document.fonts)?;
    layout_with_measurer(document, config, &fonts)
}

/// Lay out a document with a caller-provided text measurer.
pub fn layout_with_measurer(
    document: &Document,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> Result<LaidOutDocument, QuireError> {
    Ok(layout::layout(document, config, measurer)?)
}

/// Lay out a document described as JSON.
pub fn layout_json(json: &str, config: &LayoutConfig) -> Result<LaidOutDocument, QuireError> {
    let document: Document = serde_json::from_str(json)?;
    layout_document(&document, config)
}
