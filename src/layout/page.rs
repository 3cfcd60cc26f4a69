//! Pages and page-scoped artefacts.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::geometry::{Rect, Size};
use crate::model::PageConfig;
use crate::style::{PositionOptions, ResolvedStyle};

use super::arena::{BlockId, LayoutArena, RegionItem};
use super::block::EngineKind;

/// Artefact type for outline entries.
pub const BOOKMARK: &str = "bookmark";
/// Artefact type for link annotations.
pub const LINK: &str = "link";

/// An opaque, page-scoped entry such as a link or an outline target.
#[derive(Debug, Clone, PartialEq)]
pub struct Artefact {
    pub key: String,
    pub target: String,
    /// The block or line whose final rectangle the artefact covers.
    pub anchor: Option<RegionItem>,
    pub closed: bool,
}

/// Artefacts grouped by type and deduplicated by key.
#[derive(Debug, Clone, Default)]
pub struct ArtefactCollection {
    entries: BTreeMap<String, Vec<Artefact>>,
}

impl ArtefactCollection {
    /// Register an entry. Returns `false` if the key is already registered
    /// for this type.
    pub fn register(&mut self, kind: &str, key: &str, target: &str) -> bool {
        let list = self.entries.entry(kind.to_string()).or_default();
        if list.iter().any(|a| a.key == key) {
            return false;
        }
        list.push(Artefact {
            key: key.to_string(),
            target: target.to_string(),
            anchor: None,
            closed: false,
        });
        true
    }

    /// Close an entry against the item it covers. Returns `false` if no open
    /// entry has this key.
    pub fn close(&mut self, kind: &str, key: &str, anchor: Option<RegionItem>) -> bool {
        let Some(entry) = self
            .entries
            .get_mut(kind)
            .and_then(|list| list.iter_mut().find(|a| a.key == key && !a.closed))
        else {
            return false;
        };
        entry.anchor = anchor;
        entry.closed = true;
        true
    }

    pub fn get(&self, kind: &str, key: &str) -> Option<&Artefact> {
        self.entries.get(kind)?.iter().find(|a| a.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Artefact)> {
        self.entries
            .iter()
            .flat_map(|(kind, list)| list.iter().map(move |a| (kind.as_str(), a)))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub size: Size,
    /// The page box. Its single column is the area inside the margins.
    pub root: BlockId,
    /// Flow content, between header and footer.
    pub content: BlockId,
    pub header: Option<BlockId>,
    pub footer: Option<BlockId>,
    pub artefacts: ArtefactCollection,
}

/// Style of the page box: fixed size, margins as padding.
pub fn page_root_style(config: &PageConfig) -> Rc<ResolvedStyle> {
    let (width, height) = config.size.dimensions();
    Rc::new(ResolvedStyle {
        position: PositionOptions {
            width: Some(width),
            height: Some(height),
            padding: config.margin,
            fill_width: true,
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Style of the content block: the body style's text and alignment, with a
/// fixed height that fills what header and footer leave.
pub fn page_content_style(body: &ResolvedStyle, height: f64) -> Rc<ResolvedStyle> {
    Rc::new(ResolvedStyle {
        position: PositionOptions {
            height: Some(height.max(0.0)),
            fill_width: true,
            h_align: body.position.h_align,
            ..Default::default()
        },
        text: body.text.clone(),
        columns: body.columns.clone(),
        list_style: body.list_style,
        cache_key: body.cache_key.clone(),
        ..Default::default()
    })
}

impl LayoutArena {
    pub fn new_page_root(&mut self, config: &PageConfig) -> BlockId {
        let (width, height) = config.size.dimensions();
        self.new_block(
            None,
            Rect::new(0.0, 0.0, width, height),
            None,
            EngineKind::Page,
            page_root_style(config),
            0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Edges;
    use crate::model::PageSize;

    #[test]
    fn register_deduplicates_by_key() {
        let mut artefacts = ArtefactCollection::default();
        assert!(artefacts.register(BOOKMARK, "intro", "Introduction"));
        assert!(!artefacts.register(BOOKMARK, "intro", "Again"));
        assert!(artefacts.register(LINK, "intro", "https://example.com"));
        assert_eq!(artefacts.len(), 2);
        assert_eq!(artefacts.get(BOOKMARK, "intro").unwrap().target, "Introduction");
    }

    #[test]
    fn close_marks_entry_once() {
        let mut artefacts = ArtefactCollection::default();
        artefacts.register(LINK, "a", "https://example.com");
        assert!(artefacts.close(LINK, "a", Some(RegionItem::Block(BlockId(3)))));
        assert!(!artefacts.close(LINK, "a", Some(RegionItem::Block(BlockId(4)))));
        assert_eq!(
            artefacts.get(LINK, "a").unwrap().anchor,
            Some(RegionItem::Block(BlockId(3)))
        );
        assert!(!artefacts.close(LINK, "missing", None));
    }

    #[test]
    fn page_root_column_is_the_margin_box() {
        let mut arena = LayoutArena::new();
        let config = PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 300.0,
            },
            margin: Edges::uniform(20.0),
            wrap: true,
        };
        let root = arena.new_page_root(&config);
        let column = arena.current_region(root);
        assert_eq!(
            arena.region(column).bounds,
            Rect::new(20.0, 20.0, 160.0, 260.0)
        );
        assert_eq!(arena.remaining_height(column), 260.0);
    }
}
