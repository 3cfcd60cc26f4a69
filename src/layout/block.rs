//! Blocks: rectangular containers owning one or more column regions and any
//! positioned regions opened inside them.
//!
//! Lifecycle: open, content added, closed (shrink to fit). A closed block may
//! be reopened for a late append and closed again.

use std::rc::Rc;

use serde::Serialize;

use crate::error::LayoutError;
use crate::geometry::Rect;
use crate::model::Node;
use crate::style::{
    ColumnOptions, ColumnWidths, FloatMode, OverflowSplit, PositionMode, ResolvedStyle,
};

use super::arena::{BlockId, LayoutArena, RegionId, RegionItem};
use super::region::Region;

/// The engine that produced a block, used to pick continuation behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineKind {
    Page,
    PageContent,
    Chrome,
    Container,
    Panel,
    Viewport,
    Table,
    TableRow,
    TableCell,
    List,
    ListItem,
}

/// The content node a block was produced for.
#[derive(Debug, Clone, PartialEq)]
pub struct Owner {
    pub label: String,
    pub kind: &'static str,
    pub id: Option<String>,
}

impl Owner {
    pub fn of(node: &Node) -> Self {
        Self {
            label: node.label(),
            kind: node.kind_name(),
            id: node.id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub parent: Option<RegionId>,
    pub owner: Option<Owner>,
    pub engine: EngineKind,
    pub style: Rc<ResolvedStyle>,
    /// Margin box, relative to the parent region.
    pub total_bounds: Rect,
    /// Content box, relative to this block's origin.
    pub available_bounds: Rect,
    pub columns: Vec<RegionId>,
    pub current_column: usize,
    pub positioned: Vec<RegionId>,
    /// How many times this block has been continued across regions.
    pub repeat_index: u32,
    pub split: OverflowSplit,
    pub exclude_from_output: bool,
    pub closed: bool,
}

impl Block {
    fn new(
        parent: Option<RegionId>,
        owner: Option<Owner>,
        engine: EngineKind,
        style: Rc<ResolvedStyle>,
        repeat_index: u32,
    ) -> Self {
        let split = style.position.overflow_split;
        Self {
            parent,
            owner,
            engine,
            style,
            total_bounds: Rect::default(),
            available_bounds: Rect::default(),
            columns: Vec::new(),
            current_column: 0,
            positioned: Vec::new(),
            repeat_index,
            split,
            exclude_from_output: false,
            closed: false,
        }
    }

    /// A parentless container with the given bounds and no regions.
    pub fn detached(bounds: Rect) -> Self {
        let mut block = Self::new(
            None,
            None,
            EngineKind::Container,
            Rc::new(ResolvedStyle::default()),
            0,
        );
        block.total_bounds = bounds;
        block.available_bounds = Rect::from_size(bounds.size());
        block
    }

    pub fn has_explicit_height(&self) -> bool {
        self.style.position.height.is_some()
    }

    /// Space below the content box: bottom padding, border and margin.
    pub fn bottom_reserve(&self) -> f64 {
        let p = &self.style.position;
        p.margin.bottom + p.border_width.bottom + p.padding.bottom
    }

    pub fn is_multi_column(&self) -> bool {
        self.columns.len() > 1
    }
}

/// Narrowest column an equal split may produce.
const MIN_COLUMN_WIDTH: f64 = 12.0;

/// Divide `content` into column rectangles.
///
/// Percentages apply to the width left after the gaps. Columns without an
/// explicit or percentage width share what remains equally. An equal split
/// drops columns until each is at least [`MIN_COLUMN_WIDTH`] wide.
pub fn column_bounds(content: Rect, options: &ColumnOptions) -> Vec<Rect> {
    let requested = options.count.max(1) as usize;
    let alley = options.alley_width.max(0.0);
    let count = match options.widths {
        ColumnWidths::Equal => {
            let fit = ((content.width + alley) / (MIN_COLUMN_WIDTH + alley))
                .floor()
                .max(1.0) as usize;
            if fit < requested {
                log::warn!(
                    "{requested} columns do not fit in {:.2}pt with {alley:.2}pt gaps; using {fit}",
                    content.width
                );
            }
            requested.min(fit)
        }
        _ => requested,
    };
    let usable = (content.width - alley * (count - 1) as f64).max(0.0);

    let declared: Vec<Option<f64>> = (0..count)
        .map(|i| match &options.widths {
            ColumnWidths::Equal => None,
            ColumnWidths::Percent(ps) => ps.get(i).map(|p| usable * p / 100.0),
            ColumnWidths::Explicit(ws) => ws.get(i).copied(),
        })
        .collect();
    let known: f64 = declared.iter().flatten().sum();
    let unknown = declared.iter().filter(|w| w.is_none()).count();
    let share = if unknown > 0 {
        ((usable - known) / unknown as f64).max(0.0)
    } else {
        0.0
    };

    let mut x = content.x;
    declared
        .into_iter()
        .map(|w| {
            let width = w.unwrap_or(share);
            let rect = Rect::new(x, content.y, width, content.height);
            x += width + alley;
            rect
        })
        .collect()
}

impl LayoutArena {
    /// Create a block inside `outer`, whose width is the space offered by the
    /// parent, and partition its content box into columns.
    pub fn new_block(
        &mut self,
        parent: Option<RegionId>,
        outer: Rect,
        owner: Option<Owner>,
        engine: EngineKind,
        style: Rc<ResolvedStyle>,
        repeat_index: u32,
    ) -> BlockId {
        let id = self.push_block(Block::new(parent, owner, engine, style, repeat_index));
        self.init_regions(id, outer);
        id
    }

    /// Compute the block's bounds from its style and build its columns.
    pub fn init_regions(&mut self, id: BlockId, outer: Rect) {
        let style = Rc::clone(&self.block(id).style);
        let pos = &style.position;
        let margin = pos.margin;
        let inner = pos.inner_edges();

        let width = pos
            .width
            .unwrap_or(outer.width - margin.horizontal())
            .min(pos.max_width)
            .max(pos.min_width);
        let height = pos
            .height
            .map(|h| h.min(pos.max_height).max(pos.min_height))
            .unwrap_or(f64::INFINITY);

        let total = Rect::new(
            outer.x,
            outer.y,
            width + margin.horizontal(),
            height + margin.vertical(),
        );
        let available = Rect::new(
            margin.left + inner.left,
            margin.top + inner.top,
            (width - inner.horizontal()).max(0.0),
            (height - inner.vertical()).max(0.0),
        );

        let mut columns = Vec::new();
        for rect in column_bounds(available, &style.columns) {
            let mut region = Region::new(id, rect);
            region.h_align = pos.h_align;
            region.v_align = pos.v_align;
            region.auto_flow = style.columns.auto_flow;
            columns.push(self.push_region(region));
        }
        for pair in columns.windows(2) {
            self.region_mut(pair[0]).next_region = Some(pair[1]);
        }

        let block = self.block_mut(id);
        block.total_bounds = total;
        block.available_bounds = available;
        block.columns = columns;
        block.current_column = 0;
    }

    /// Append a child block to `region`, as wide as the region.
    pub fn begin_new_block(
        &mut self,
        region: RegionId,
        owner: Option<Owner>,
        engine: EngineKind,
        style: Rc<ResolvedStyle>,
        repeat_index: u32,
    ) -> Result<BlockId, LayoutError> {
        if style.position.mode == PositionMode::Inline {
            return Err(LayoutError::InlineBlockMode);
        }
        if self.region(region).closed {
            return Err(LayoutError::Closed("region"));
        }
        self.close_current_item(region)?;
        let r = self.region(region);
        let outer = Rect::new(0.0, r.used.height, r.bounds.width, f64::INFINITY);
        let id = self.new_block(Some(region), outer, owner, engine, style, repeat_index);
        self.region_mut(region).items.push(RegionItem::Block(id));
        Ok(id)
    }

    /// Append an anonymous block that only groups content.
    pub fn begin_new_container_block(
        &mut self,
        region: RegionId,
        engine: EngineKind,
        style: Rc<ResolvedStyle>,
    ) -> Result<BlockId, LayoutError> {
        self.begin_new_block(region, None, engine, style, 0)
    }

    /// The last positioned region if it is open, else the active column.
    pub fn current_region(&self, id: BlockId) -> RegionId {
        let block = self.block(id);
        if let Some(&last) = block.positioned.last() {
            if !self.region(last).closed {
                return last;
            }
        }
        block.columns[block.current_column.min(block.columns.len() - 1)]
    }

    /// The linked column `move_to_next_region` would advance to.
    pub fn next_region_candidate(
        &self,
        id: BlockId,
        force: bool,
        required_height: f64,
    ) -> Option<RegionId> {
        let block = self.block(id);
        let current = *block.columns.get(block.current_column)?;
        let region = self.region(current);
        let next = region.next_region?;
        if !(region.auto_flow || force) {
            return None;
        }
        let fits = required_height <= 0.0 || self.remaining_height(next) >= required_height;
        (fits || force).then_some(next)
    }

    /// Advance to the next linked column. Does not paginate.
    pub fn move_to_next_region(
        &mut self,
        id: BlockId,
        force: bool,
        required_height: f64,
    ) -> Result<bool, LayoutError> {
        if self.next_region_candidate(id, force, required_height).is_none() {
            return Ok(false);
        }
        let current = self.block(id).columns[self.block(id).current_column];
        self.close_region(current)?;
        self.block_mut(id).current_column += 1;
        Ok(true)
    }

    /// Open a positioned region on `anchor` with bounds relative to it.
    pub fn begin_positioned_region(
        &mut self,
        anchor: BlockId,
        bounds: Rect,
        mode: PositionMode,
        floating: FloatMode,
        style: Rc<ResolvedStyle>,
    ) -> RegionId {
        let mut region = Region::new(anchor, bounds);
        region.mode = mode;
        region.floating = floating;
        region.h_align = style.position.h_align;
        region.v_align = style.position.v_align;
        region.auto_flow = false;
        region.style = Some(style);
        let id = self.push_region(region);
        self.block_mut(anchor).positioned.push(id);
        id
    }

    /// Move a positioned region to another anchor block.
    pub fn rehome_positioned_region(&mut self, region: RegionId, to: BlockId) {
        let from = self.region(region).parent;
        self.block_mut(from).positioned.retain(|r| *r != region);
        self.block_mut(to).positioned.push(region);
        self.region_mut(region).parent = to;
    }

    /// Close every region, then shrink to fit.
    pub fn close_block(&mut self, id: BlockId) -> Result<(), LayoutError> {
        if self.block(id).closed {
            return Ok(());
        }
        for region in self.block(id).positioned.clone() {
            self.close_region(region)?;
        }
        for region in self.block(id).columns.clone() {
            self.close_region(region)?;
        }
        self.shrink_to_fit(id);
        self.block_mut(id).closed = true;
        Ok(())
    }

    /// Recompute the block's size from its content.
    ///
    /// Explicit sizes win. `fill_width` and table cells keep the offered
    /// width. Multi-column blocks keep their width and take the tallest
    /// column. Relative and floating regions can enlarge the block.
    pub fn shrink_to_fit(&mut self, id: BlockId) {
        let block = self.block(id);
        let style = Rc::clone(&block.style);
        let pos = &style.position;
        let margin = pos.margin;
        let inner = pos.inner_edges();
        let available = block.available_bounds;
        let fills = pos.fill_width || block.engine == EngineKind::TableCell;

        let mut content_h = block
            .columns
            .iter()
            .map(|c| self.region(*c).used.height)
            .fold(0.0, f64::max);
        let mut content_w = if block.is_multi_column() {
            available.width
        } else {
            block
                .columns
                .first()
                .map(|c| self.region(*c).used.width)
                .unwrap_or(0.0)
        };
        for region in block.positioned.iter().map(|r| self.region(*r)) {
            let grows = region.floating != FloatMode::None || region.mode == PositionMode::Relative;
            if grows && !region.items.is_empty() {
                content_w = content_w.max(region.bounds.right() - available.x);
                content_h = content_h.max(region.bounds.y + region.used.height - available.y);
            }
        }

        let width = match pos.width {
            Some(w) => w,
            None if fills => available.width + inner.horizontal(),
            None => content_w + inner.horizontal(),
        }
        .min(pos.max_width)
        .max(pos.min_width);
        let height = pos
            .height
            .unwrap_or(content_h + inner.vertical())
            .min(pos.max_height)
            .max(pos.min_height);

        let content_width = (width - inner.horizontal()).max(0.0);
        let content_height = (height - inner.vertical()).max(0.0);
        let single = !block.is_multi_column();
        let columns = block.columns.clone();

        let block = self.block_mut(id);
        block.total_bounds.width = width + margin.horizontal();
        block.total_bounds.height = height + margin.vertical();
        block.available_bounds.width = content_width;
        block.available_bounds.height = content_height;
        for column in columns {
            let region = self.region_mut(column);
            if single {
                region.bounds.width = content_width;
            }
            if !region.is_bounded() {
                region.bounds.height = content_height;
            }
        }
    }

    /// Reopen a closed block so content can be appended to it.
    ///
    /// The block's size is withdrawn from its parent region and its
    /// auto-sized dimensions become unbounded again.
    pub fn reopen_block(&mut self, id: BlockId) {
        if !self.block(id).closed {
            return;
        }
        if let Some(parent) = self.block(id).parent {
            if self.region(parent).last_item() == Some(RegionItem::Block(id)) {
                self.remove_last_item(parent);
                self.block_mut(id).closed = false;
                self.region_mut(parent).items.push(RegionItem::Block(id));
            }
        }
        let explicit = self.block(id).has_explicit_height();
        let block = self.block_mut(id);
        block.closed = false;
        if !explicit {
            block.total_bounds.height = f64::INFINITY;
            block.available_bounds.height = f64::INFINITY;
        }
        let current = block.columns[block.current_column.min(block.columns.len() - 1)];
        let region = self.region_mut(current);
        region.closed = false;
        if !explicit {
            region.bounds.height = f64::INFINITY;
        }
    }

    /// Whether every column of the block is empty.
    pub fn block_is_empty(&self, id: BlockId) -> bool {
        let block = self.block(id);
        block.columns.iter().all(|c| self.region(*c).is_empty())
            && block.positioned.iter().all(|r| self.region(*r).is_empty())
    }
}
