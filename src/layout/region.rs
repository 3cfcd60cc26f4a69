//! Regions: rectangular areas inside a block holding lines and blocks.
//!
//! A region tracks how much of it is used. Size bookkeeping is explicit:
//! appending an item does not grow the region, closing it does (through
//! [`LayoutArena::add_to_size`]).

use std::rc::Rc;

use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Size};
use crate::style::{FloatMode, HorizontalAlign, PositionMode, ResolvedStyle, VerticalAlign};

use super::arena::{BlockId, LayoutArena, LineId, RegionId, RegionItem};
use super::block::EngineKind;
use super::line::Line;

/// Horizontal space taken by a float over a vertical slice of a region.
///
/// Insets form a singly linked list, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatInset {
    pub mode: FloatMode,
    pub width: f64,
    /// Distance from the region edge on the float's side.
    pub inset: f64,
    pub offset_y: f64,
    pub height: f64,
    pub prev: Option<Box<FloatInset>>,
}

impl FloatInset {
    fn overlaps(&self, y: f64, height: f64) -> bool {
        let end = self.offset_y + self.height;
        if height <= 0.0 {
            y >= self.offset_y && y < end
        } else {
            y < end && y + height > self.offset_y
        }
    }

    fn iter(&self) -> impl Iterator<Item = &FloatInset> {
        std::iter::successors(Some(self), |f| f.prev.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    pub parent: BlockId,
    /// Relative to the owning block's origin. Unbounded regions have an
    /// infinite height.
    pub bounds: Rect,
    pub used: Size,
    pub items: Vec<RegionItem>,
    pub h_align: HorizontalAlign,
    pub v_align: VerticalAlign,
    pub mode: PositionMode,
    pub floating: FloatMode,
    pub next_region: Option<RegionId>,
    pub auto_flow: bool,
    pub floats: Option<Box<FloatInset>>,
    pub closed: bool,
    /// Style of the node a positioned region was opened for.
    pub style: Option<Rc<ResolvedStyle>>,
}

impl Region {
    pub fn new(parent: BlockId, bounds: Rect) -> Self {
        Self {
            parent,
            bounds,
            used: Size::ZERO,
            items: Vec::new(),
            h_align: HorizontalAlign::Left,
            v_align: VerticalAlign::Top,
            mode: PositionMode::Block,
            floating: FloatMode::None,
            next_region: None,
            auto_flow: true,
            floats: None,
            closed: false,
            style: None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.bounds.height.is_finite()
    }

    /// Regions outside normal flow.
    pub fn is_positioned(&self) -> bool {
        self.floating != FloatMode::None || self.mode != PositionMode::Block
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_item(&self) -> Option<RegionItem> {
        self.items.last().copied()
    }
}

impl LayoutArena {
    /// Close the trailing item and start a new line at the used height.
    ///
    /// The line's width is what the float insets leave free over `height`.
    pub fn begin_new_line(
        &mut self,
        region: RegionId,
        height: f64,
        h_align: HorizontalAlign,
    ) -> Result<LineId, LayoutError> {
        if self.region(region).closed {
            return Err(LayoutError::Closed("region"));
        }
        self.close_current_item(region)?;
        let y = self.region(region).used.height;
        let left = self.left_inset(region, y, height);
        let width = self.available_line_width(region, y, height).max(0.0);
        let id = self.push_line(Line::new(region, Point::new(left, y), width, h_align));
        self.region_mut(region).items.push(RegionItem::Line(id));
        Ok(id)
    }

    /// The trailing line, if it is still open.
    pub fn open_line(&self, region: RegionId) -> Option<LineId> {
        match self.region(region).last_item() {
            Some(RegionItem::Line(id)) if !self.line(id).closed => Some(id),
            _ => None,
        }
    }

    /// Close the trailing item if it is open, and account for its size.
    pub fn close_current_item(&mut self, region: RegionId) -> Result<(), LayoutError> {
        let Some(item) = self.region(region).last_item() else {
            return Ok(());
        };
        if self.is_item_closed(item) {
            return Ok(());
        }
        match item {
            RegionItem::Line(id) => self.close_line(id)?,
            RegionItem::Block(id) => self.close_block(id)?,
        }
        self.add_to_size(region, item);
        Ok(())
    }

    /// Grow the used height by the item's height and the used width to the
    /// item's right edge.
    pub fn add_to_size(&mut self, region: RegionId, item: RegionItem) {
        let (right, height) = self.item_extent(item);
        let used = &mut self.region_mut(region).used;
        used.height += height;
        used.width = used.width.max(right);
    }

    /// Pop the trailing item, reversing its size contribution if it was closed.
    pub fn remove_last_item(&mut self, region: RegionId) -> Option<RegionItem> {
        let item = self.region_mut(region).items.pop()?;
        if self.is_item_closed(item) {
            let (_, height) = self.item_extent(item);
            let width = self
                .region(region)
                .items
                .iter()
                .filter(|i| self.is_item_closed(**i))
                .map(|i| self.item_extent(*i).0)
                .fold(0.0, f64::max);
            let used = &mut self.region_mut(region).used;
            used.height = (used.height - height).max(0.0);
            used.width = width;
        }
        Some(item)
    }

    /// Pop the trailing item, failing if it is not `item`.
    pub fn assert_remove_last_item(
        &mut self,
        region: RegionId,
        item: RegionItem,
    ) -> Result<(), LayoutError> {
        match self.region(region).last_item() {
            Some(last) if last == item => {
                self.remove_last_item(region);
                Ok(())
            }
            other => Err(LayoutError::UnexpectedItem {
                expected: item.describe(),
                found: other.map_or_else(|| "nothing".to_string(), |i| i.describe()),
            }),
        }
    }

    /// Re-parent an item built against another region.
    ///
    /// Appended items sit at the used height. Inserted items restack every
    /// item in the region.
    pub fn add_existing_item(
        &mut self,
        region: RegionId,
        item: RegionItem,
        at_index: Option<usize>,
    ) -> Result<(), LayoutError> {
        if self.region(region).closed {
            return Err(LayoutError::Closed("region"));
        }
        self.set_item_parent(item, region);
        match at_index {
            Some(index) if index < self.region(region).items.len() => {
                self.region_mut(region).items.insert(index, item);
                self.restack(region);
            }
            _ => {
                self.close_current_item(region)?;
                let y = self.region(region).used.height;
                self.set_item_top(item, y);
                self.region_mut(region).items.push(item);
                if self.is_item_closed(item) {
                    self.add_to_size(region, item);
                }
            }
        }
        Ok(())
    }

    /// Recompute every item's offset and the used size from scratch.
    pub fn restack(&mut self, region: RegionId) {
        let items = self.region(region).items.clone();
        let mut used = Size::ZERO;
        for item in items {
            self.set_item_top(item, used.height);
            if self.is_item_closed(item) {
                let (right, height) = self.item_extent(item);
                used.height += height;
                used.width = used.width.max(right);
            }
        }
        self.region_mut(region).used = used;
    }

    pub fn available_line_width(&self, region: RegionId, y: f64, height: f64) -> f64 {
        self.region(region).bounds.width
            - self.left_inset(region, y, height)
            - self.right_inset(region, y, height)
    }

    /// Space taken on the left at `y` by floats in this region and its
    /// flow ancestors.
    pub fn left_inset(&self, region: RegionId, y: f64, height: f64) -> f64 {
        let r = self.region(region);
        let own = r
            .floats
            .as_deref()
            .into_iter()
            .flat_map(FloatInset::iter)
            .filter(|f| f.mode == FloatMode::Left && f.overlaps(y, height))
            .map(|f| f.inset + f.width)
            .fold(0.0, f64::max);
        let inherited = self
            .flow_parent(region)
            .map(|(parent, dx, dy)| (self.left_inset(parent, y + dy, height) - dx).max(0.0))
            .unwrap_or(0.0);
        own.max(inherited)
    }

    pub fn right_inset(&self, region: RegionId, y: f64, height: f64) -> f64 {
        let r = self.region(region);
        let own = r
            .floats
            .as_deref()
            .into_iter()
            .flat_map(FloatInset::iter)
            .filter(|f| f.mode == FloatMode::Right && f.overlaps(y, height))
            .map(|f| f.inset + f.width)
            .fold(0.0, f64::max);
        let inherited = self
            .flow_parent(region)
            .map(|(parent, dx, dy)| {
                let parent_inset = self.right_inset(parent, y + dy, height);
                let parent_width = self.region(parent).bounds.width;
                (dx + r.bounds.width - (parent_width - parent_inset)).max(0.0)
            })
            .unwrap_or(0.0);
        own.max(inherited)
    }

    /// The region enclosing a flow region's block, with this region's offset
    /// inside it.
    fn flow_parent(&self, region: RegionId) -> Option<(RegionId, f64, f64)> {
        let r = self.region(region);
        if r.is_positioned() {
            return None;
        }
        let block = self.block(r.parent);
        let parent = block.parent?;
        Some((
            parent,
            block.total_bounds.x + r.bounds.x,
            block.total_bounds.y + r.bounds.y,
        ))
    }

    pub fn add_floating_inset(
        &mut self,
        region: RegionId,
        mode: FloatMode,
        width: f64,
        inset: f64,
        offset_y: f64,
        height: f64,
    ) {
        let r = self.region_mut(region);
        let prev = r.floats.take();
        r.floats = Some(Box::new(FloatInset {
            mode,
            width,
            inset,
            offset_y,
            height,
            prev,
        }));
    }

    /// The nearest float bottom below `y` among the floats overlapping it,
    /// in this region or its flow ancestors.
    pub fn float_clearance(&self, region: RegionId, y: f64, height: f64) -> Option<f64> {
        let own = self
            .region(region)
            .floats
            .as_deref()
            .into_iter()
            .flat_map(FloatInset::iter)
            .filter(|f| f.overlaps(y, height))
            .map(|f| f.offset_y + f.height)
            .reduce(f64::min);
        let inherited = self.flow_parent(region).and_then(|(parent, _, dy)| {
            self.float_clearance(parent, y + dy, height)
                .map(|bottom| bottom - dy)
        });
        match (own, inherited) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Push the flow below the float beside an empty open line.
    ///
    /// The line is closed as a blank reaching down to the float's bottom,
    /// so the next line starts under it. Returns `false` when the line has
    /// content, is not the region's trailing item, or no float overlaps it.
    pub fn clear_floats(&mut self, line: LineId, height: f64) -> Result<bool, LayoutError> {
        let l = self.line(line);
        let region = l.parent;
        if l.closed
            || l.has_content()
            || self.region(region).last_item() != Some(RegionItem::Line(line))
        {
            return Ok(false);
        }
        let y = l.offset.y;
        let Some(bottom) = self
            .float_clearance(region, y, height)
            .filter(|bottom| *bottom > y)
        else {
            return Ok(false);
        };
        self.close_line(line)?;
        self.line_mut(line).height = bottom - y;
        self.add_to_size(region, RegionItem::Line(line));
        Ok(true)
    }

    /// Height still free below the used height.
    ///
    /// Bounded regions answer locally. Unbounded flow regions ask their
    /// ancestors, subtracting everything between them. The walk stops at
    /// table rows and positioned regions, which never overflow.
    pub fn remaining_height(&self, region: RegionId) -> f64 {
        let r = self.region(region);
        if r.is_bounded() {
            return r.bounds.height - r.used.height;
        }
        if r.is_positioned() {
            return f64::INFINITY;
        }
        let block = self.block(r.parent);
        if block.engine == EngineKind::TableRow {
            return f64::INFINITY;
        }
        let Some(parent) = block.parent else {
            return f64::INFINITY;
        };
        let parent_used = self.region(parent).used.height;
        let top = block.total_bounds.y + r.bounds.y + r.used.height;
        let reserve = block.bottom_reserve();
        self.remaining_height(parent) - (top - parent_used) - reserve
    }

    /// Close the trailing item and clamp every item to the region's width.
    pub fn close_region(&mut self, region: RegionId) -> Result<(), LayoutError> {
        if self.region(region).closed {
            return Ok(());
        }
        self.close_current_item(region)?;
        let width = self.region(region).bounds.width;
        for item in self.region(region).items.clone() {
            match item {
                RegionItem::Line(id) => {
                    let line = self.line_mut(id);
                    line.full_width = line.full_width.min(width);
                }
                RegionItem::Block(id) => {
                    let bounds = &mut self.block_mut(id).total_bounds;
                    bounds.width = bounds.width.min(width);
                }
            }
        }
        let r = self.region_mut(region);
        r.used.width = r.used.width.min(width);
        r.closed = true;
        Ok(())
    }

    /// Reopen a closed region for late appends.
    pub fn reopen_region(&mut self, region: RegionId) {
        self.region_mut(region).closed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::block::Block;
    use crate::layout::run::Run;

    fn arena_with_region(width: f64, height: f64) -> (LayoutArena, RegionId) {
        let mut arena = LayoutArena::new();
        let block = arena.push_block(Block::detached(Rect::new(0.0, 0.0, width, height)));
        let region = arena.push_region(Region::new(block, Rect::new(0.0, 0.0, width, height)));
        arena.block_mut(block).columns.push(region);
        (arena, region)
    }

    fn filled_line(arena: &mut LayoutArena, region: RegionId, width: f64, height: f64) -> LineId {
        let line = arena
            .begin_new_line(region, height, HorizontalAlign::Left)
            .unwrap();
        let mut run = Run::spacer(width);
        run.kind = crate::layout::run::RunKind::Component(
            crate::layout::run::InlineContent::Component {
                name: "box".to_string(),
            },
        );
        run.height = height;
        arena.add_run(line, run).unwrap();
        line
    }

    #[test]
    fn size_grows_monotonically_only_when_items_close() {
        let (mut arena, region) = arena_with_region(200.0, 500.0);
        let mut last_height = 0.0;
        let widths = [50.0, 120.0, 80.0];
        for w in widths {
            filled_line(&mut arena, region, w, 10.0);
            assert_eq!(arena.region(region).used.height, last_height);
            arena.close_current_item(region).unwrap();
            let used = arena.region(region).used;
            assert!(used.height >= last_height);
            last_height = used.height;
        }
        assert_eq!(arena.region(region).used.height, 30.0);
        assert_eq!(arena.region(region).used.width, 120.0);
    }

    #[test]
    fn closed_region_rejects_new_lines() {
        let (mut arena, region) = arena_with_region(100.0, 100.0);
        arena.close_region(region).unwrap();
        assert!(matches!(
            arena.begin_new_line(region, 10.0, HorizontalAlign::Left),
            Err(LayoutError::Closed(_))
        ));
    }

    #[test]
    fn assert_remove_checks_identity_and_reverses_size() {
        let (mut arena, region) = arena_with_region(100.0, 100.0);
        let first = filled_line(&mut arena, region, 40.0, 10.0);
        let second = filled_line(&mut arena, region, 90.0, 10.0);
        arena.close_current_item(region).unwrap();
        assert!(arena
            .assert_remove_last_item(region, RegionItem::Line(first))
            .is_err());
        arena
            .assert_remove_last_item(region, RegionItem::Line(second))
            .unwrap();
        let used = arena.region(region).used;
        assert_eq!(used.height, 10.0);
        assert_eq!(used.width, 40.0);
    }

    #[test]
    fn inserting_an_existing_item_restacks() {
        let (mut arena, region) = arena_with_region(100.0, 100.0);
        let a = filled_line(&mut arena, region, 10.0, 10.0);
        let b = filled_line(&mut arena, region, 10.0, 20.0);
        arena.close_current_item(region).unwrap();
        arena.remove_last_item(region);
        arena
            .add_existing_item(region, RegionItem::Line(b), Some(0))
            .unwrap();
        assert_eq!(arena.line(b).offset.y, 0.0);
        assert_eq!(arena.line(a).offset.y, 20.0);
        assert_eq!(arena.region(region).used.height, 30.0);
    }

    #[test]
    fn float_insets_narrow_lines_over_their_span() {
        let (mut arena, region) = arena_with_region(200.0, 500.0);
        arena.add_floating_inset(region, FloatMode::Left, 50.0, 0.0, 0.0, 30.0);
        arena.add_floating_inset(region, FloatMode::Right, 20.0, 0.0, 10.0, 10.0);
        assert_eq!(arena.available_line_width(region, 0.0, 10.0), 150.0);
        assert_eq!(arena.available_line_width(region, 12.0, 12.0), 130.0);
        assert_eq!(arena.left_inset(region, 24.0, 12.0), 50.0);
        assert_eq!(arena.available_line_width(region, 30.0, 12.0), 200.0);
        assert_eq!(arena.float_clearance(region, 0.0, 12.0), Some(20.0));
    }

    #[test]
    fn clearing_floats_moves_the_next_line_below_them() {
        let (mut arena, region) = arena_with_region(200.0, 500.0);
        arena.add_floating_inset(region, FloatMode::Left, 200.0, 0.0, 0.0, 30.0);
        let blank = arena
            .begin_new_line(region, 12.0, HorizontalAlign::Left)
            .unwrap();
        assert_eq!(arena.line(blank).full_width, 0.0);
        assert!(arena.clear_floats(blank, 12.0).unwrap());
        assert_eq!(arena.region(region).used.height, 30.0);

        let next = arena
            .begin_new_line(region, 12.0, HorizontalAlign::Left)
            .unwrap();
        assert_eq!(arena.line(next).offset.y, 30.0);
        assert_eq!(arena.line(next).full_width, 200.0);
        assert!(!arena.clear_floats(next, 12.0).unwrap());
    }

    #[test]
    fn bounded_remaining_height_is_local() {
        let (mut arena, region) = arena_with_region(100.0, 50.0);
        filled_line(&mut arena, region, 10.0, 20.0);
        arena.close_current_item(region).unwrap();
        assert_eq!(arena.remaining_height(region), 30.0);
    }
}
