//! Per-pass layout state.
//!
//! Everything a layout call mutates lives here and nowhere else: the arena,
//! the pages, the cursor stack of open blocks, the style stack and the
//! continue flag. One context serves exactly one document pass.

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::font::{TextMeasurer, FontMetrics};
use crate::model::Document;
use crate::style::{CounterDecl, ResolvedStyle, StyleCache, TextOptions};

use super::arena::{BlockId, LayoutArena, RegionId, RegionItem};
use super::page::Page;
use super::run::TextMetrics;

/// Named counters for generated content and list numbering.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    values: HashMap<String, i32>,
}

impl Counters {
    pub fn value(&self, name: &str) -> i32 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn set(&mut self, name: &str, value: i32) {
        self.values.insert(name.to_string(), value);
    }

    pub fn increment(&mut self, name: &str, by: i32) {
        *self.values.entry(name.to_string()).or_insert(0) += by;
    }

    /// Apply resets, then increments.
    pub fn apply(&mut self, resets: &[CounterDecl], increments: &[CounterDecl]) {
        for decl in resets {
            self.set(&decl.name, decl.value.unwrap_or(0));
        }
        for decl in increments {
            self.increment(&decl.name, decl.value.unwrap_or(1));
        }
    }
}

pub struct LayoutContext<'a> {
    pub arena: LayoutArena,
    pub pages: Vec<Page>,
    pub document: &'a Document,
    pub config: &'a LayoutConfig,
    pub measurer: &'a dyn TextMeasurer,
    /// Resolved styles of the nodes being laid out, outermost first.
    pub styles: Vec<Rc<ResolvedStyle>>,
    /// Open blocks from the page content block inward.
    pub block_stack: Vec<BlockId>,
    /// Cleared when no more content can be placed.
    pub continue_layout: bool,
    /// A fixed-height block whose overflow cleared the continue flag. The
    /// flag is restored when that block closes.
    pub halt_scope: Option<BlockId>,
    pub counters: Counters,
    pub style_cache: StyleCache,
    /// Laying out a page header or footer.
    pub chrome: bool,
    image_sizes: HashMap<String, Option<(u32, u32)>>,
}

impl<'a> LayoutContext<'a> {
    pub fn new(
        document: &'a Document,
        config: &'a LayoutConfig,
        measurer: &'a dyn TextMeasurer,
    ) -> Self {
        let (page_width, _) = document.default_page.size.dimensions();
        let content_width = page_width - document.default_page.margin.horizontal();
        let mut root = document.style.resolve(None, content_width);
        root.cache_key = Some(String::new());
        Self {
            arena: LayoutArena::new(),
            pages: Vec::new(),
            document,
            config,
            measurer,
            styles: vec![Rc::new(root)],
            block_stack: Vec::new(),
            continue_layout: true,
            halt_scope: None,
            counters: Counters::default(),
            style_cache: StyleCache::new(),
            chrome: false,
            image_sizes: HashMap::new(),
        }
    }

    pub fn current_style(&self) -> Rc<ResolvedStyle> {
        self.styles
            .last()
            .cloned()
            .unwrap_or_else(|| Rc::new(ResolvedStyle::default()))
    }

    pub fn body_style(&self) -> Rc<ResolvedStyle> {
        self.styles
            .first()
            .cloned()
            .unwrap_or_else(|| Rc::new(ResolvedStyle::default()))
    }

    pub fn innermost(&self) -> Result<BlockId, LayoutError> {
        self.block_stack
            .last()
            .copied()
            .ok_or(LayoutError::NoCurrentBlock)
    }

    pub fn current_region(&self) -> Result<RegionId, LayoutError> {
        Ok(self.arena.current_region(self.innermost()?))
    }

    /// Width of the region content is currently placed into.
    pub fn available_width(&self) -> Result<f64, LayoutError> {
        Ok(self.arena.region(self.current_region()?).bounds.width)
    }

    pub fn page(&self) -> Result<&Page, LayoutError> {
        self.pages.last().ok_or(LayoutError::NoCurrentBlock)
    }

    pub fn page_mut(&mut self) -> Result<&mut Page, LayoutError> {
        self.pages.last_mut().ok_or(LayoutError::NoCurrentBlock)
    }

    /// Stop placing content. A scope limits the halt to one block.
    pub fn halt(&mut self, scope: Option<BlockId>) {
        self.continue_layout = false;
        if self.halt_scope.is_none() {
            self.halt_scope = scope;
        }
    }

    pub fn text_metrics(&self, options: &TextOptions) -> TextMetrics {
        let FontMetrics { ascent, descent } = self.measurer.metrics(&options.font);
        TextMetrics {
            ascent,
            descent,
            line_height: options.line_height(),
        }
    }

    /// Intrinsic pixel size of an image source, cached per source.
    pub fn image_size(&mut self, src: &str) -> Option<(u32, u32)> {
        if let Some(size) = self.image_sizes.get(src) {
            return *size;
        }
        let size = match crate::image_loader::load_image_dimensions(src) {
            Ok(size) => Some(size),
            Err(e) => {
                log::warn!("cannot read image size: {e}");
                None
            }
        };
        self.image_sizes.insert(src.to_string(), size);
        size
    }

    /// Whether `region` holds nothing and sits at the very top of the page
    /// content, so moving its content elsewhere could not gain space.
    ///
    /// Blank zero-height lines do not count as content.
    pub fn is_at_top(&self, region: RegionId) -> bool {
        let r = self.arena.region(region);
        let holds_content = r.items.iter().any(|item| match *item {
            RegionItem::Line(id) => self.arena.line(id).has_content(),
            RegionItem::Block(_) => self.arena.is_item_closed(*item),
        });
        if r.used.height > 0.0 || holds_content {
            return false;
        }
        self.block_at_top(self.block_stack.len().saturating_sub(1))
    }

    /// Whether the block at `depth` and all its ancestors up to the page
    /// content are the first item of their regions.
    pub fn block_at_top(&self, depth: usize) -> bool {
        for d in (1..=depth.min(self.block_stack.len().saturating_sub(1))).rev() {
            let block = self.block_stack[d];
            let Some(parent) = self.arena.block(block).parent else {
                break;
            };
            let region = self.arena.region(parent);
            if region.used.height > 0.0 || region.items.first() != Some(&RegionItem::Block(block)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_reset_then_increment() {
        let mut counters = Counters::default();
        counters.apply(
            &[CounterDecl {
                name: "section".to_string(),
                value: Some(4),
            }],
            &[CounterDecl {
                name: "section".to_string(),
                value: None,
            }],
        );
        assert_eq!(counters.value("section"), 5);
        assert_eq!(counters.value("missing"), 0);
    }
}
