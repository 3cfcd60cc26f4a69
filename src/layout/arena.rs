//! Storage for the mutable layout tree.
//!
//! Blocks, regions and lines live in flat vectors and refer to each other by
//! typed index. Parent links are plain ids, so re-homing an item during an
//! overflow correction is a field write rather than a pointer dance.

use serde::Serialize;

use super::block::Block;
use super::line::Line;
use super::region::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineId(pub u32);

/// An entry in a region's ordered item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionItem {
    Line(LineId),
    Block(BlockId),
}

impl RegionItem {
    pub fn describe(&self) -> String {
        match self {
            RegionItem::Line(id) => format!("line #{}", id.0),
            RegionItem::Block(id) => format!("block #{}", id.0),
        }
    }
}

#[derive(Debug, Default)]
pub struct LayoutArena {
    blocks: Vec<Block>,
    regions: Vec<Region>,
    lines: Vec<Line>,
}

impl LayoutArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self, block: Block) -> BlockId {
        self.blocks.push(block);
        BlockId((self.blocks.len() - 1) as u32)
    }

    pub fn push_region(&mut self, region: Region) -> RegionId {
        self.regions.push(region);
        RegionId((self.regions.len() - 1) as u32)
    }

    pub fn push_line(&mut self, line: Line) -> LineId {
        self.lines.push(line);
        LineId((self.lines.len() - 1) as u32)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0 as usize]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0 as usize]
    }

    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        &mut self.regions[id.0 as usize]
    }

    pub fn line(&self, id: LineId) -> &Line {
        &self.lines[id.0 as usize]
    }

    pub fn line_mut(&mut self, id: LineId) -> &mut Line {
        &mut self.lines[id.0 as usize]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether an item has been closed.
    pub fn is_item_closed(&self, item: RegionItem) -> bool {
        match item {
            RegionItem::Line(id) => self.line(id).closed,
            RegionItem::Block(id) => self.block(id).closed,
        }
    }

    /// Extent an item contributes to its region: right edge and height.
    pub fn item_extent(&self, item: RegionItem) -> (f64, f64) {
        match item {
            RegionItem::Line(id) => {
                let line = self.line(id);
                (line.offset.x + line.used_width, line.height)
            }
            RegionItem::Block(id) => {
                let block = self.block(id);
                (
                    block.total_bounds.x + block.total_bounds.width,
                    block.total_bounds.height,
                )
            }
        }
    }

    /// Top of an item within its region.
    pub fn item_top(&self, item: RegionItem) -> f64 {
        match item {
            RegionItem::Line(id) => self.line(id).offset.y,
            RegionItem::Block(id) => self.block(id).total_bounds.y,
        }
    }

    pub fn set_item_top(&mut self, item: RegionItem, y: f64) {
        match item {
            RegionItem::Line(id) => self.line_mut(id).offset.y = y,
            RegionItem::Block(id) => self.block_mut(id).total_bounds.y = y,
        }
    }

    pub fn set_item_parent(&mut self, item: RegionItem, region: RegionId) {
        match item {
            RegionItem::Line(id) => self.line_mut(id).parent = region,
            RegionItem::Block(id) => self.block_mut(id).parent = Some(region),
        }
    }

    /// The block a region belongs to.
    pub fn region_owner(&self, region: RegionId) -> BlockId {
        self.region(region).parent
    }

    /// Whether `descendant` is `ancestor` or lies somewhere below it.
    pub fn is_descendant(&self, descendant: BlockId, ancestor: BlockId) -> bool {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self
                .block(id)
                .parent
                .map(|region| self.region_owner(region));
        }
        false
    }
}
