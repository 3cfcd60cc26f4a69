//! # Flow Layout
//!
//! Content flows into regions. A region is a rectangle inside a block that
//! holds lines and nested blocks one below the other; a block owns one
//! region per column, plus a region for every positioned child opened
//! inside it. Pages are blocks too: the page box, with a content block
//! between an optional header and footer.
//!
//! The engine never lays content out on an unbounded canvas and slices it
//! afterwards. Every placement asks whether the content still fits in the
//! region it is going into. When it does not, content moves on to the next
//! column, then to the next page, and the blocks it sat in are continued
//! there as fresh fragments.
//!
//! ## Passes
//!
//! 1. [`engine`] walks the content tree and builds the mutable layout tree
//!    in a [`LayoutArena`](arena::LayoutArena). Coordinates are relative to
//!    the parent.
//! 2. [`output`] accumulates them into page coordinates and produces the
//!    immutable [`LaidOutDocument`].

pub mod arena;
pub mod block;
pub mod context;
pub mod engine;
pub mod line;
pub mod list;
pub mod output;
pub mod page;
pub mod positioned;
pub mod region;
pub mod run;
pub mod table;
pub mod text;

pub use context::LayoutContext;
pub use engine::layout;
pub use output::{
    LaidOutArtefact, LaidOutBlock, LaidOutDocument, LaidOutItem, LaidOutLine, LaidOutPage,
    LaidOutRegion, LaidOutRun, Placement, RenderVisitor, RunContent,
};
