//! # Layout Driver
//!
//! The driver walks the content tree depth-first and places every node into
//! the innermost open block. It never measures ahead: each placement asks
//! "does this fit in what is left", and when the answer is no, the overflow
//! algorithm decides where the content goes next.
//!
//! ## Overflow
//!
//! The open blocks form a chain from the page content block inward (the
//! context's block stack). When content does not fit, the chain is walked
//! from the innermost block outward:
//!
//! 1. A block with a further linked column takes the content there.
//! 2. A block with a fixed height stops the walk: its content is truncated.
//! 3. An `Any`-split block is closed where it is and continued as a fresh
//!    block in the next column or page.
//! 4. A `Never`-split block is detached and moved whole, together with
//!    everything below it.
//!
//! When no block has another column, a new page is opened and the chain is
//! rebuilt there, outer to inner. Running out of space is not an error: the
//! context's continue flag is cleared and every loop stops adding content.

use std::rc::Rc;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::font::TextMeasurer;
use crate::geometry::Size;
use crate::model::{BreakNodeKind, Document, Node, NodeKind};
use crate::style::{
    BreakKind, FloatMode, HorizontalAlign, OverflowAction, OverflowSplit, PositionMode,
    PositionOptions, PseudoContent, PseudoStyle, ResolvedStyle,
};

use super::arena::{BlockId, LayoutArena, LineId, RegionId, RegionItem};
use super::block::{EngineKind, Owner};
use super::context::LayoutContext;
use super::line::CloseReason;
use super::output::{self, LaidOutDocument};
use super::page::{page_content_style, Page, BOOKMARK, LINK};
use super::run::{InlineContent, Run, RunKind};
use super::{list, positioned, table, text};

/// Lay out a document into pages.
pub fn layout(
    document: &Document,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> Result<LaidOutDocument, LayoutError> {
    let mut ctx = LayoutContext::new(document, config, measurer);
    ctx.start_page()?;
    for node in &document.children {
        if !ctx.continue_layout {
            break;
        }
        ctx.layout_child(node)?;
    }
    if !ctx.continue_layout {
        log::warn!("layout stopped early; remaining content was not placed");
    }
    ctx.finish_page()?;
    log::debug!("laid out {} page(s)", ctx.pages.len());
    Ok(output::build(&ctx))
}

/// Layout function for a container node kind.
type EngineFn =
    fn(&mut LayoutContext<'_>, &Node, &Rc<ResolvedStyle>, EngineKind) -> Result<(), LayoutError>;

/// The strategy table: which engine lays out which container kind.
fn container_engine(kind: &NodeKind) -> (EngineKind, EngineFn) {
    match kind {
        NodeKind::Table => (EngineKind::Table, table::layout_table),
        NodeKind::List => (EngineKind::List, list::layout_list),
        NodeKind::ListItem => (EngineKind::ListItem, list::layout_list_item),
        NodeKind::Panel => (EngineKind::Panel, layout_container),
        NodeKind::TableCell { .. } => (EngineKind::TableCell, layout_container),
        _ => (EngineKind::Container, layout_container),
    }
}

/// A block with its children.
pub fn layout_container(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
    engine: EngineKind,
) -> Result<(), LayoutError> {
    let Some(depth) = ctx.begin_block(Some(node), engine, style)? else {
        return Ok(());
    };
    let result = ctx.layout_children(node, style);
    let closed = ctx.end_block(depth);
    result.and(closed)
}

/// Where overflowing content goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// The next column of the block at this stack depth.
    Column(usize),
    NewPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverflowPlan {
    /// Relocate, moving the `Never`-split block at `moved` whole.
    Relocate { target: Target, moved: Option<usize> },
    /// Content exceeds this fixed-height block.
    Halt(BlockId),
}

/// Positioned regions whose placeholder runs lie inside `block`.
fn placeholder_regions(arena: &LayoutArena, block: BlockId, out: &mut Vec<RegionId>) {
    let b = arena.block(block);
    for region in b.columns.iter().chain(b.positioned.iter()) {
        for item in &arena.region(*region).items {
            match item {
                RegionItem::Line(line) => {
                    out.extend(arena.line(*line).runs.iter().filter_map(|run| {
                        match run.kind {
                            RunKind::Positioned { region, .. } => Some(region),
                            _ => None,
                        }
                    }))
                }
                RegionItem::Block(child) => placeholder_regions(arena, *child, out),
            }
        }
    }
}

impl<'a> LayoutContext<'a> {
    // ── Pages ───────────────────────────────────────────────────

    /// Open a page: page box, header, footer (measured, then set aside) and
    /// the content block between them.
    pub fn start_page(&mut self) -> Result<(), LayoutError> {
        let document = self.document;
        let config = &document.default_page;
        let (width, height) = config.size.dimensions();
        let root = self.arena.new_page_root(config);
        let column = self.arena.current_region(root);
        let index = self.pages.len();
        self.pages.push(Page {
            index,
            size: Size::new(width, height),
            root,
            content: root,
            header: None,
            footer: None,
            artefacts: Default::default(),
        });

        self.block_stack = vec![root];
        let header = match &document.header {
            Some(node) => self.layout_chrome(node)?,
            None => None,
        };
        let footer = match &document.footer {
            Some(node) => {
                let footer = self.layout_chrome(node)?;
                if let Some(block) = footer {
                    self.arena
                        .assert_remove_last_item(column, RegionItem::Block(block))?;
                }
                footer
            }
            None => None,
        };

        let footer_height = footer
            .map(|f| self.arena.block(f).total_bounds.height)
            .unwrap_or(0.0);
        let content_height = self.arena.remaining_height(column) - footer_height;
        let style = page_content_style(&self.body_style(), content_height);
        let content =
            self.arena
                .begin_new_block(column, None, EngineKind::PageContent, style, 0)?;

        let page = self.page_mut()?;
        page.content = content;
        page.header = header;
        page.footer = footer;
        self.block_stack = vec![content];
        log::debug!("page {} opened with {content_height:.2}pt of content height", index + 1);
        Ok(())
    }

    /// Close the current page and append its footer below the content.
    pub fn finish_page(&mut self) -> Result<(), LayoutError> {
        let page = self.page()?;
        let (root, footer) = (page.root, page.footer);
        self.arena.close_block(root)?;
        if let Some(footer) = footer {
            self.arena.reopen_block(root);
            let column = self.arena.current_region(root);
            self.arena
                .add_existing_item(column, RegionItem::Block(footer), None)?;
            self.arena.close_block(root)?;
        }
        Ok(())
    }

    /// Lay out a header or footer node into the page box.
    fn layout_chrome(&mut self, node: &Node) -> Result<Option<BlockId>, LayoutError> {
        let root = self.innermost()?;
        let column = self.current_region()?;
        let body = self.body_style();
        let style = Rc::new(ResolvedStyle {
            position: PositionOptions {
                fill_width: true,
                h_align: body.position.h_align,
                ..Default::default()
            },
            text: body.text.clone(),
            cache_key: body.cache_key.clone(),
            ..Default::default()
        });
        let block = self
            .arena
            .begin_new_container_block(column, EngineKind::Chrome, style)?;

        let saved_styles = std::mem::replace(&mut self.styles, vec![body]);
        let saved_stack = std::mem::replace(&mut self.block_stack, vec![root, block]);
        let saved_flags = (self.chrome, self.continue_layout, self.halt_scope.take());
        self.chrome = true;
        self.continue_layout = true;

        let result = self.layout_child(node);

        (self.chrome, self.continue_layout, self.halt_scope) = saved_flags;
        self.block_stack = saved_stack;
        self.styles = saved_styles;
        result?;
        self.arena.close_current_item(column)?;
        Ok(Some(block))
    }

    fn may_add_page(&self) -> bool {
        if !self.document.default_page.wrap {
            log::warn!("content overflows the page and page wrapping is off; truncating");
            return false;
        }
        if self.pages.len() >= self.config.max_pages {
            log::warn!(
                "page limit of {} reached; truncating",
                self.config.max_pages
            );
            return false;
        }
        true
    }

    // ── Blocks ──────────────────────────────────────────────────

    /// Open a block for `node` in the current region and push it on the
    /// block stack. Returns its stack depth, or `None` when there is no room.
    pub fn begin_block(
        &mut self,
        node: Option<&Node>,
        engine: EngineKind,
        style: &Rc<ResolvedStyle>,
    ) -> Result<Option<usize>, LayoutError> {
        if let Some(height) = style.position.height {
            let required = height + style.position.margin.vertical();
            if !self.ensure_space(required)? {
                return Ok(None);
            }
        }
        let region = self.current_region()?;
        let id = self.arena.begin_new_block(
            region,
            node.map(Owner::of),
            engine,
            Rc::clone(style),
            0,
        )?;
        self.block_stack.push(id);
        Ok(Some(self.block_stack.len() - 1))
    }

    /// Close the block at `depth`, whichever continuation of it is current.
    pub fn end_block(&mut self, depth: usize) -> Result<(), LayoutError> {
        let id = *self
            .block_stack
            .get(depth)
            .ok_or(LayoutError::NoCurrentBlock)?;
        self.block_stack.truncate(depth + 1);
        self.close_in_parent(id)?;
        self.block_stack.pop();
        if self.halt_scope == Some(id) {
            log::debug!("content of fixed-height block #{} truncated", id.0);
            self.halt_scope = None;
            self.continue_layout = true;
        }
        Ok(())
    }

    /// Close a block through its parent region so its size is counted.
    fn close_in_parent(&mut self, id: BlockId) -> Result<(), LayoutError> {
        match self.arena.block(id).parent {
            Some(region)
                if self.arena.region(region).last_item() == Some(RegionItem::Block(id)) =>
            {
                self.arena.close_current_item(region)
            }
            _ => self.arena.close_block(id),
        }
    }

    /// Close a fragment left behind by a relocation, dropping it if empty.
    fn close_fragment(&mut self, id: BlockId) -> Result<(), LayoutError> {
        self.close_in_parent(id)?;
        if !self.arena.block_is_empty(id) {
            return Ok(());
        }
        if let Some(region) = self.arena.block(id).parent {
            if self.arena.region(region).last_item() == Some(RegionItem::Block(id)) {
                self.arena.remove_last_item(region);
                self.arena.block_mut(id).exclude_from_output = true;
            }
        }
        Ok(())
    }

    /// A fresh block continuing `old` inside `parent`'s current region.
    fn continue_block(&mut self, old: BlockId, parent: BlockId) -> Result<BlockId, LayoutError> {
        let block = self.arena.block(old);
        let owner = block.owner.clone();
        let engine = block.engine;
        let style = Rc::clone(&block.style);
        let repeat_index = block.repeat_index + 1;
        let split = block.split;

        let region = self.arena.current_region(parent);
        let id = self
            .arena
            .begin_new_block(region, owner, engine, style, repeat_index)?;
        self.arena.block_mut(id).split = split;
        if engine == EngineKind::ListItem {
            list::enter_content_column(&mut self.arena, id)?;
        }
        Ok(id)
    }

    // ── Overflow ────────────────────────────────────────────────

    /// Make sure `required` points of height are free in the current region,
    /// relocating if needed. Returns `false` when content must stop.
    pub fn ensure_space(&mut self, required: f64) -> Result<bool, LayoutError> {
        if !self.continue_layout {
            return Ok(false);
        }
        let region = self.current_region()?;
        // Whatever follows closes the pending line first.
        if let Some(line) = self.arena.open_line(region) {
            if self.arena.line(line).has_content() {
                self.arena.close_current_item(region)?;
            }
        }
        if self.arena.remaining_height(region) >= required {
            return Ok(true);
        }
        if self.is_at_top(region) {
            log::warn!(
                "{required:.2}pt of content does not fit in an empty region; placing it overflowing"
            );
            return Ok(true);
        }
        self.overflow(required)
    }

    /// Move on to the next column or page so that `required` points fit.
    pub fn overflow(&mut self, required: f64) -> Result<bool, LayoutError> {
        let region = self.current_region()?;
        if matches!(
            self.arena.region(region).mode,
            PositionMode::Absolute | PositionMode::Fixed
        ) {
            log::debug!("absolutely positioned content cannot overflow");
            return Ok(false);
        }
        if self.chrome {
            log::warn!("page header or footer does not fit on the page; truncated");
            self.halt(None);
            return Ok(false);
        }
        match self.plan_overflow(required) {
            OverflowPlan::Halt(block) => {
                log::debug!(
                    "block #{} has a fixed height; {required:.2}pt of content does not fit",
                    block.0
                );
                self.halt(Some(block));
                Ok(false)
            }
            OverflowPlan::Relocate { target, moved } => self.relocate(target, moved, required),
        }
    }

    fn plan_overflow(&self, required: f64) -> OverflowPlan {
        let mut moved = None;
        for depth in (0..self.block_stack.len()).rev() {
            let id = self.block_stack[depth];
            if self
                .arena
                .next_region_candidate(id, false, required)
                .is_some()
            {
                return OverflowPlan::Relocate {
                    target: Target::Column(depth),
                    moved,
                };
            }
            if depth == 0 {
                break;
            }
            let block = self.arena.block(id);
            if block.has_explicit_height() {
                return OverflowPlan::Halt(id);
            }
            if block.split == OverflowSplit::Never {
                if self.block_at_top(depth) {
                    log::debug!(
                        "unsplittable block #{} already starts its page; splitting it",
                        id.0
                    );
                } else {
                    moved = Some(depth);
                }
            }
        }
        OverflowPlan::Relocate {
            target: Target::NewPage,
            moved,
        }
    }

    /// Carry the block chain over to the target column or a new page.
    fn relocate(
        &mut self,
        target: Target,
        moved: Option<usize>,
        required: f64,
    ) -> Result<bool, LayoutError> {
        if target == Target::NewPage && !self.may_add_page() {
            self.halt(None);
            return Ok(false);
        }
        let stack = self.block_stack.clone();
        let base = match target {
            Target::Column(depth) => depth,
            Target::NewPage => 0,
        };
        let rebuild_end = moved.unwrap_or(stack.len());

        if let Some(depth) = moved {
            let block = stack[depth];
            let parent = self
                .arena
                .block(block)
                .parent
                .ok_or(LayoutError::NoCurrentBlock)?;
            self.arena
                .assert_remove_last_item(parent, RegionItem::Block(block))?;
        }
        for depth in (base + 1..rebuild_end).rev() {
            self.close_fragment(stack[depth])?;
        }

        let old_root = self.page()?.root;
        let mut chain = match target {
            Target::Column(depth) => {
                self.arena.move_to_next_region(stack[depth], false, required)?;
                log::debug!("continuing in the next column of block #{}", stack[depth].0);
                stack[..=depth].to_vec()
            }
            Target::NewPage => {
                self.finish_page()?;
                self.start_page()?;
                self.block_stack.clone()
            }
        };
        for &old in &stack[base + 1..rebuild_end] {
            let parent = *chain.last().ok_or(LayoutError::NoCurrentBlock)?;
            chain.push(self.continue_block(old, parent)?);
        }

        if let Some(depth) = moved {
            let block = stack[depth];
            let parent = *chain.last().ok_or(LayoutError::NoCurrentBlock)?;
            let region = self.arena.current_region(parent);
            self.arena
                .add_existing_item(region, RegionItem::Block(block), None)?;
            if target == Target::NewPage {
                let new_root = self.page()?.root;
                self.rehome_page_regions(block, old_root, new_root);
            }
            log::debug!("moved unsplittable block #{} whole", block.0);
            chain.extend_from_slice(&stack[depth..]);
        }
        self.block_stack = chain;
        Ok(true)
    }

    /// Move page-anchored regions placed from inside `moved` to the new page.
    fn rehome_page_regions(&mut self, moved: BlockId, old_root: BlockId, new_root: BlockId) {
        let mut placeholders = Vec::new();
        placeholder_regions(&self.arena, moved, &mut placeholders);
        for region in self.arena.block(old_root).positioned.clone() {
            if placeholders.contains(&region) {
                self.arena.rehome_positioned_region(region, new_root);
            }
        }
    }

    /// Execute a page or column break.
    pub fn force_break(&mut self, kind: BreakKind) -> Result<(), LayoutError> {
        if self.chrome {
            log::warn!("breaks inside page headers and footers are ignored");
            return Ok(());
        }
        let region = self.current_region()?;
        let target = match kind {
            BreakKind::Column => (0..self.block_stack.len())
                .rev()
                .find(|&d| {
                    self.arena
                        .next_region_candidate(self.block_stack[d], false, 0.0)
                        .is_some()
                })
                .map(Target::Column)
                .unwrap_or(Target::NewPage),
            BreakKind::Page => Target::NewPage,
        };
        if target == Target::NewPage && self.is_at_top(region) {
            log::debug!("page break at the top of a page ignored");
            return Ok(());
        }
        self.arena.close_current_item(region)?;
        self.relocate(target, None, 0.0)?;
        Ok(())
    }

    // ── Dispatch ────────────────────────────────────────────────

    /// Resolve a child's style and lay it out. Errors carry the child's
    /// identifier.
    pub fn layout_child(&mut self, node: &Node) -> Result<(), LayoutError> {
        if !self.continue_layout {
            return Ok(());
        }
        let parent = self.current_style();
        let width = self.available_width()?;
        let style = self.style_cache.resolve(
            &node.style,
            node.style_id.as_deref(),
            &parent,
            width,
        );
        if style.invisible {
            return Ok(());
        }
        self.layout_node(node, style)
            .map_err(|e| e.in_component(node.label()))
    }

    fn layout_node(&mut self, node: &Node, style: Rc<ResolvedStyle>) -> Result<(), LayoutError> {
        let style = self.check_transform(node, style)?;
        if let Some(kind) = style.break_before {
            self.force_break(kind)?;
            if !self.continue_layout {
                return Ok(());
            }
        }

        let artefacts = self.register_artefacts(node)?;
        let first_block = BlockId(self.arena.block_count() as u32);
        let first_line = LineId(self.arena.line_count() as u32);
        let open_line = self.arena.open_line(self.current_region()?);

        self.counters
            .apply(&style.counter_reset, &style.counter_increment);
        self.styles.push(Rc::clone(&style));
        let result = self.dispatch(node, &style);
        self.styles.pop();
        result?;

        if let Some((page, key)) = artefacts {
            let anchor = if (first_block.0 as usize) < self.arena.block_count()
                && self.arena.block(first_block).owner == Some(Owner::of(node))
            {
                Some(RegionItem::Block(first_block))
            } else if let Some(line) = open_line {
                Some(RegionItem::Line(line))
            } else {
                ((first_line.0 as usize) < self.arena.line_count())
                    .then_some(RegionItem::Line(first_line))
            };
            let artefacts = &mut self.pages[page].artefacts;
            if node.bookmark.is_some() {
                artefacts.close(BOOKMARK, &key, anchor);
            }
            if node.href.is_some() {
                artefacts.close(LINK, &key, anchor);
            }
        }
        Ok(())
    }

    /// Route a node to the engine for its kind.
    pub fn dispatch(&mut self, node: &Node, style: &Rc<ResolvedStyle>) -> Result<(), LayoutError> {
        let pos = &style.position;
        if pos.float != FloatMode::None || pos.mode.is_positioned() {
            return positioned::layout_positioned(self, node, style);
        }
        match &node.kind {
            NodeKind::Viewport { width, height } => {
                self.layout_viewport(node, style, *width, *height)
            }
            NodeKind::Break { kind } => match kind {
                BreakNodeKind::Page => self.force_break(BreakKind::Page),
                BreakNodeKind::Column => self.force_break(BreakKind::Column),
                BreakNodeKind::Line => text::hard_line_break(self, style),
            },
            NodeKind::Text { .. } => text::layout_text(self, node, style),
            NodeKind::Image { .. } | NodeKind::Path { .. } | NodeKind::Component { .. } => {
                self.layout_inline_component(node, style)
            }
            NodeKind::Span => self.layout_span(node, style),
            kind => {
                let (engine, layout) = container_engine(kind);
                layout(self, node, style, engine)
            }
        }
    }

    /// Children, framed by generated `::before` and `::after` content.
    pub fn layout_children(
        &mut self,
        node: &Node,
        style: &ResolvedStyle,
    ) -> Result<(), LayoutError> {
        if let Some(before) = &style.before {
            self.layout_pseudo(before)?;
        }
        for child in &node.children {
            if !self.continue_layout {
                break;
            }
            self.layout_child(child)?;
        }
        if let Some(after) = &style.after {
            if self.continue_layout {
                self.layout_pseudo(after)?;
            }
        }
        Ok(())
    }

    fn layout_pseudo(&mut self, pseudo: &PseudoStyle) -> Result<(), LayoutError> {
        self.counters
            .apply(&pseudo.counter_reset, &pseudo.counter_increment);
        match self.pseudo_node(pseudo) {
            Some(node) => self.layout_child(&node),
            None => Ok(()),
        }
    }

    /// The node generated content stands for. Content made of a single image
    /// becomes an image node; anything else becomes text.
    pub fn pseudo_node(&self, pseudo: &PseudoStyle) -> Option<Node> {
        if let [PseudoContent::Image { src, width, height }] = pseudo.content.as_slice() {
            return Some(Node::image(src, *width, *height, pseudo.style.clone()));
        }
        let text: String = pseudo
            .content
            .iter()
            .map(|part| match part {
                PseudoContent::Text(s) => s.clone(),
                PseudoContent::Counter(name) => self.counters.value(name).to_string(),
                PseudoContent::Image { .. } => String::new(),
            })
            .collect();
        (!text.is_empty()).then(|| Node::text(&text, pseudo.style.clone()))
    }

    /// Drop a transform from content that cannot carry one.
    fn check_transform(
        &self,
        node: &Node,
        style: Rc<ResolvedStyle>,
    ) -> Result<Rc<ResolvedStyle>, LayoutError> {
        if style.position.transform.is_none() {
            return Ok(style);
        }
        let inline = matches!(
            node.kind,
            NodeKind::Text { .. }
                | NodeKind::Span
                | NodeKind::Break { .. }
                | NodeKind::Image { .. }
                | NodeKind::Path { .. }
                | NodeKind::Component { .. }
        );
        if !inline {
            return Ok(style);
        }
        self.config.lenient(LayoutError::UnsupportedTransform {
            kind: node.kind_name(),
        })?;
        Ok(Rc::new(ResolvedStyle {
            position: PositionOptions {
                transform: None,
                ..style.position.clone()
            },
            ..(*style).clone()
        }))
    }

    fn register_artefacts(&mut self, node: &Node) -> Result<Option<(usize, String)>, LayoutError> {
        if node.bookmark.is_none() && node.href.is_none() {
            return Ok(None);
        }
        let key = node
            .id
            .clone()
            .unwrap_or_else(|| format!("{}@{}", node.kind_name(), self.arena.block_count()));
        let page = self.page_mut()?;
        if let Some(title) = &node.bookmark {
            page.artefacts.register(BOOKMARK, &key, title);
        }
        if let Some(href) = &node.href {
            page.artefacts.register(LINK, &key, href);
        }
        Ok(Some((page.index, key)))
    }

    // ── Leaf engines ────────────────────────────────────────────

    /// A fixed-size, clipped, unsplittable container.
    fn layout_viewport(
        &mut self,
        node: &Node,
        style: &Rc<ResolvedStyle>,
        width: f64,
        height: f64,
    ) -> Result<(), LayoutError> {
        let style = Rc::new(ResolvedStyle {
            position: PositionOptions {
                width: Some(style.position.width.unwrap_or(width)),
                height: Some(style.position.height.unwrap_or(height)),
                overflow_action: OverflowAction::Clip,
                overflow_split: OverflowSplit::Never,
                isolated: true,
                ..style.position.clone()
            },
            ..(**style).clone()
        });
        layout_container(self, node, &style, EngineKind::Viewport)
    }

    /// Images, paths and self-rendering components sit on the line as one
    /// unbreakable run.
    fn layout_inline_component(
        &mut self,
        node: &Node,
        style: &Rc<ResolvedStyle>,
    ) -> Result<(), LayoutError> {
        let pos = &style.position;
        let available = self.available_width()? - pos.margin.horizontal();
        let (content, width, height) = match &node.kind {
            NodeKind::Image { src, width, height } => {
                let (w, h) = self.image_box(src, pos.width.or(*width), pos.height.or(*height), available);
                (InlineContent::Image { src: src.clone() }, w, h)
            }
            NodeKind::Path { width, height, data } => (
                InlineContent::Path { data: data.clone() },
                pos.width.unwrap_or(*width),
                pos.height.unwrap_or(*height),
            ),
            NodeKind::Component { name, width, height } => (
                InlineContent::Component { name: name.clone() },
                pos.width.unwrap_or(*width),
                pos.height.unwrap_or(*height),
            ),
            _ => return Ok(()),
        };

        let mut run = Run::new(RunKind::Component(content), width, height).with_v_align(pos.v_align);
        run.inset = pos.margin.left;
        let trailing = pos.margin.right;
        let Some(line) = self.line_for(run.advance() + trailing, height, pos.h_align)? else {
            return Ok(());
        };
        self.arena.add_run(line, run)?;
        if trailing > 0.0 {
            self.arena.add_run(line, Run::spacer(trailing))?;
        }
        Ok(())
    }

    /// Display size of an image: explicit sizes win, the intrinsic aspect
    /// ratio fills in the rest.
    fn image_box(
        &mut self,
        src: &str,
        width: Option<f64>,
        height: Option<f64>,
        available: f64,
    ) -> (f64, f64) {
        match self.image_size(src) {
            Some((px_w, px_h)) if px_w > 0 && px_h > 0 => {
                let (px_w, px_h) = (px_w as f64, px_h as f64);
                let aspect = px_h / px_w;
                match (width, height) {
                    (Some(w), Some(h)) => (w, h),
                    (Some(w), None) => (w, w * aspect),
                    (None, Some(h)) => (h / aspect, h),
                    (None, None) => {
                        let w = px_w.min(available);
                        (w, w * aspect)
                    }
                }
            }
            _ => {
                let w = width.unwrap_or(available);
                (w, height.unwrap_or(w * 0.75))
            }
        }
    }

    /// An inline container: its children share the surrounding lines.
    fn layout_span(&mut self, node: &Node, style: &Rc<ResolvedStyle>) -> Result<(), LayoutError> {
        let Some(line) = self.line_for(0.0, 0.0, style.position.h_align)? else {
            return Ok(());
        };
        self.arena
            .add_run(line, Run::new(RunKind::InlineBegin, 0.0, 0.0))?;
        let result = self.layout_children(node, style);
        if let Some(line) = self.arena.open_line(self.current_region()?) {
            self.arena
                .add_run(line, Run::new(RunKind::InlineEnd, 0.0, 0.0))?;
        }
        result
    }

    // ── Lines ───────────────────────────────────────────────────

    /// The open line if `width` fits on it, otherwise a new line with room
    /// for `height`. `None` when content must stop.
    pub fn line_for(
        &mut self,
        width: f64,
        height: f64,
        h_align: HorizontalAlign,
    ) -> Result<Option<LineId>, LayoutError> {
        let region = self.current_region()?;
        if let Some(line) = self.arena.open_line(region) {
            let l = self.arena.line(line);
            let fits_across = l.can_fit_width(width) || !l.has_content();
            let fits_down = height <= l.height || self.arena.remaining_height(region) >= height;
            if fits_across && fits_down {
                return Ok(Some(line));
            }
            self.break_line(line, CloseReason::SoftWrap)?;
        }
        if !self.ensure_space(height)? {
            return Ok(None);
        }
        let region = self.current_region()?;
        Ok(Some(self.arena.begin_new_line(region, height, h_align)?))
    }

    /// End `line` with a new-line run and close it.
    pub fn break_line(&mut self, line: LineId, reason: CloseReason) -> Result<(), LayoutError> {
        let region = self.arena.line(line).parent;
        self.arena.line_mut(line).close_reason = Some(reason);
        self.arena.add_run(line, Run::new_line(0.0))?;
        self.arena.close_current_item(region)
    }
}
