//! # Laid-out tree
//!
//! The final pass over the arena. Every coordinate in the arena is relative
//! to its parent; this pass accumulates them into absolute page coordinates
//! and produces an immutable tree a renderer can walk without knowing
//! anything about regions, columns or overflow.
//!
//! Block rectangles are border boxes (margins removed). Lines keep their full
//! width so alignment is visible, and runs are placed one after the other
//! with their insets and justification spacing applied.

use std::collections::HashMap;

use serde::Serialize;

use crate::geometry::{Matrix, Point, Rect};
use crate::model::Metadata;
use crate::style::{Color, FloatMode, FontSpec, OverflowAction, PositionMode, VisualOptions};

use super::arena::{BlockId, LayoutArena, LineId, RegionId, RegionItem};
use super::block::{Block, EngineKind};
use super::context::LayoutContext;
use super::line::CloseReason;
use super::run::{InlineContent, Run, RunKind};

/// A document after layout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutDocument {
    pub pages: Vec<LaidOutPage>,
    /// Layout stopped before all content was placed.
    pub halted: bool,
    pub metadata: Metadata,
    /// Where every node with an id ended up, one entry per fragment.
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: String,
    pub page: usize,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutPage {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub root: LaidOutBlock,
    pub artefacts: Vec<LaidOutArtefact>,
}

/// A link or bookmark with the rectangle it covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutArtefact {
    pub kind: String,
    pub key: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutBlock {
    pub engine: EngineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Border box in page coordinates.
    pub rect: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Matrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Rect>,
    pub isolated: bool,
    pub visual: VisualOptions,
    pub columns: Vec<LaidOutRegion>,
    pub positioned: Vec<LaidOutRegion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutRegion {
    pub rect: Rect,
    pub mode: PositionMode,
    pub float: FloatMode,
    pub items: Vec<LaidOutItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LaidOutItem {
    Line(LaidOutLine),
    Block(LaidOutBlock),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutLine {
    /// The full line box, as wide as the space the line was offered.
    pub rect: Rect,
    pub content_width: f64,
    /// Baseline, in page coordinates.
    pub baseline: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<CloseReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_back: Option<f64>,
    pub runs: Vec<LaidOutRun>,
}

impl LaidOutLine {
    /// The characters on the line.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|run| match &run.content {
                RunContent::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutRun {
    /// Includes justification spacing, excludes the inset before the run.
    pub rect: Rect,
    pub content: RunContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunContent {
    #[serde(rename_all = "camelCase")]
    Text {
        text: String,
        font: FontSpec,
        color: Color,
        word_spacing: f64,
        char_spacing: f64,
    },
    Image {
        src: String,
    },
    Path {
        data: String,
    },
    Component {
        name: String,
    },
}

/// Render-time callbacks, called in paint order.
pub trait RenderVisitor {
    fn begin_page(&mut self, _page: &LaidOutPage) {}
    fn begin_block(&mut self, _block: &LaidOutBlock) {}
    fn line(&mut self, _line: &LaidOutLine) {}
    fn run(&mut self, _run: &LaidOutRun) {}
    fn end_block(&mut self, _block: &LaidOutBlock) {}
    fn end_page(&mut self, _page: &LaidOutPage) {}
}

impl LaidOutDocument {
    pub fn walk(&self, visitor: &mut dyn RenderVisitor) {
        for page in &self.pages {
            page.walk(visitor);
        }
    }

    /// Placements recorded for a node id.
    pub fn placements_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Placement> {
        self.placements.iter().filter(move |p| p.id == id)
    }
}

impl LaidOutPage {
    pub fn walk(&self, visitor: &mut dyn RenderVisitor) {
        visitor.begin_page(self);
        self.root.walk(visitor);
        visitor.end_page(self);
    }

    /// Every line on the page, in paint order.
    pub fn lines(&self) -> Vec<&LaidOutLine> {
        let mut out = Vec::new();
        self.root.collect_lines(&mut out);
        out
    }

    /// The page's text, one line per row.
    pub fn text(&self) -> String {
        self.lines()
            .iter()
            .map(|line| line.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Blocks produced for nodes of the given label or kind.
    pub fn blocks_owned_by(&self, owner: &str) -> Vec<&LaidOutBlock> {
        let mut out = Vec::new();
        self.root.collect_owned(owner, &mut out);
        out
    }
}

impl LaidOutBlock {
    pub fn walk(&self, visitor: &mut dyn RenderVisitor) {
        visitor.begin_block(self);
        for region in self.columns.iter().chain(self.positioned.iter()) {
            for item in &region.items {
                match item {
                    LaidOutItem::Line(line) => {
                        visitor.line(line);
                        for run in &line.runs {
                            visitor.run(run);
                        }
                    }
                    LaidOutItem::Block(block) => block.walk(visitor),
                }
            }
        }
        visitor.end_block(self);
    }

    fn regions(&self) -> impl Iterator<Item = &LaidOutRegion> {
        self.columns.iter().chain(self.positioned.iter())
    }

    fn collect_lines<'a>(&'a self, out: &mut Vec<&'a LaidOutLine>) {
        for item in self.regions().flat_map(|r| r.items.iter()) {
            match item {
                LaidOutItem::Line(line) => out.push(line),
                LaidOutItem::Block(block) => block.collect_lines(out),
            }
        }
    }

    fn collect_owned<'a>(&'a self, owner: &str, out: &mut Vec<&'a LaidOutBlock>) {
        if self.owner.as_deref() == Some(owner) {
            out.push(self);
        }
        for item in self.regions().flat_map(|r| r.items.iter()) {
            if let LaidOutItem::Block(block) = item {
                block.collect_owned(owner, out);
            }
        }
    }
}

/// Build the laid-out tree from a finished layout pass.
pub fn build(ctx: &LayoutContext<'_>) -> LaidOutDocument {
    let mut builder = Builder {
        arena: &ctx.arena,
        page: 0,
        anchors: HashMap::new(),
        block_rects: HashMap::new(),
        line_rects: HashMap::new(),
        placements: Vec::new(),
    };

    let mut pages: Vec<LaidOutPage> = ctx
        .pages
        .iter()
        .map(|page| {
            builder.page = page.index;
            builder.anchors.clear();
            let root = builder.block(page.root, Point::ZERO);
            LaidOutPage {
                index: page.index,
                width: page.size.width,
                height: page.size.height,
                root,
                artefacts: Vec::new(),
            }
        })
        .collect();

    for (laid, page) in pages.iter_mut().zip(&ctx.pages) {
        laid.artefacts = page
            .artefacts
            .iter()
            .map(|(kind, artefact)| LaidOutArtefact {
                kind: kind.to_string(),
                key: artefact.key.clone(),
                target: artefact.target.clone(),
                rect: artefact.anchor.and_then(|anchor| match anchor {
                    RegionItem::Block(id) => builder.block_rects.get(&id).copied(),
                    RegionItem::Line(id) => builder.line_rects.get(&id).copied(),
                }),
            })
            .collect();
    }

    LaidOutDocument {
        pages,
        halted: !ctx.continue_layout,
        metadata: ctx.document.metadata.clone(),
        placements: builder.placements,
    }
}

struct Builder<'c> {
    arena: &'c LayoutArena,
    page: usize,
    /// Page position of the placeholder run of each in-flow positioned region.
    anchors: HashMap<RegionId, Point>,
    block_rects: HashMap<BlockId, Rect>,
    line_rects: HashMap<LineId, Rect>,
    placements: Vec<Placement>,
}

/// A height that may still be unbounded.
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl Builder<'_> {
    /// `origin` is the page position of the block's parent region.
    fn block(&mut self, id: BlockId, origin: Point) -> LaidOutBlock {
        let block = self.arena.block(id);
        let total = block.total_bounds;
        let top_left = origin.offset(total.x, total.y);
        let margin_box = Rect::new(
            top_left.x,
            top_left.y,
            total.width,
            finite_or(total.height, self.content_height(block)),
        );
        let rect = margin_box.inset(&block.style.position.margin);
        self.block_rects.entry(id).or_insert(rect);

        if let Some(key) = block.owner.as_ref().and_then(|o| o.id.clone()) {
            self.placements.push(Placement {
                id: key,
                page: self.page,
                rect,
            });
        }

        let columns = block
            .columns
            .iter()
            .map(|region| {
                let bounds = self.arena.region(*region).bounds;
                self.region(*region, top_left.offset(bounds.x, bounds.y))
            })
            .collect();
        let positioned = block
            .positioned
            .iter()
            .map(|region| {
                let origin = self.positioned_origin(*region, top_left);
                self.region(*region, origin)
            })
            .collect();

        LaidOutBlock {
            engine: block.engine,
            owner: block.owner.as_ref().map(|o| o.label.clone()),
            rect,
            transform: transform_matrix(block, rect),
            clip: (block.style.position.overflow_action == OverflowAction::Clip)
                .then(|| rect.inset(&block.style.position.clip_inset)),
            isolated: block.style.position.isolated,
            visual: block.style.visual,
            columns,
            positioned,
        }
    }

    /// Height of an unclosed block: its tallest column plus the space around
    /// its content box.
    fn content_height(&self, block: &Block) -> f64 {
        let used = block
            .columns
            .iter()
            .map(|r| self.arena.region(*r).used.height)
            .fold(0.0, f64::max);
        used + block.available_bounds.y + block.bottom_reserve()
    }

    /// Page position of a positioned region anchored on a block whose
    /// margin box starts at `block_origin`.
    fn positioned_origin(&self, id: RegionId, block_origin: Point) -> Point {
        let region = self.arena.region(id);
        let placed = block_origin.offset(region.bounds.x, region.bounds.y);
        if region.floating != FloatMode::None {
            return placed;
        }
        match region.mode {
            PositionMode::Relative => {
                let base = self.anchors.get(&id).copied().unwrap_or(placed);
                let (dx, dy) = region
                    .style
                    .as_ref()
                    .map(|s| {
                        let p = &s.position;
                        let dx = p.left.or(p.right.map(|r| -r)).unwrap_or(0.0);
                        let dy = p.top.or(p.bottom.map(|b| -b)).unwrap_or(0.0);
                        (dx, dy)
                    })
                    .unwrap_or((0.0, 0.0));
                base.offset(dx, dy)
            }
            PositionMode::InlineBlock => self.anchors.get(&id).copied().unwrap_or(placed),
            _ => placed,
        }
    }

    fn region(&mut self, id: RegionId, origin: Point) -> LaidOutRegion {
        let region = self.arena.region(id);
        let items = region
            .items
            .iter()
            .filter_map(|item| match *item {
                RegionItem::Line(line) => Some(LaidOutItem::Line(self.line(line, origin))),
                RegionItem::Block(block) if !self.arena.block(block).exclude_from_output => {
                    Some(LaidOutItem::Block(self.block(block, origin)))
                }
                RegionItem::Block(_) => None,
            })
            .collect();
        LaidOutRegion {
            rect: Rect::new(
                origin.x,
                origin.y,
                region.bounds.width,
                finite_or(region.bounds.height, region.used.height),
            ),
            mode: region.mode,
            float: region.floating,
            items,
        }
    }

    fn line(&mut self, id: LineId, origin: Point) -> LaidOutLine {
        let line = self.arena.line(id);
        let top_left = origin.offset(line.offset.x, line.offset.y);
        let rect = Rect::new(top_left.x, top_left.y, line.full_width, line.height);
        self.line_rects.insert(id, rect);

        let mut x = top_left.x;
        let mut runs = Vec::new();
        for run in &line.runs {
            x += run.inset;
            let width = run.width + run.inserted_width();
            let run_rect = Rect::new(x, top_left.y + run.offset_y, width, run.height);
            x += width;
            if let RunKind::Positioned { region, .. } = run.kind {
                self.anchors.insert(region, run_rect.origin());
            }
            if let Some(content) = run_content(run) {
                runs.push(LaidOutRun {
                    rect: run_rect,
                    content,
                });
            }
        }

        LaidOutLine {
            rect,
            content_width: line.used_width,
            baseline: top_left.y + line.baseline,
            close_reason: line.close_reason,
            take_back: line.take_back(),
            runs,
        }
    }
}

fn run_content(run: &Run) -> Option<RunContent> {
    match &run.kind {
        RunKind::Characters {
            text,
            style,
            word_spacing,
            char_spacing,
            ..
        } if !text.is_empty() => Some(RunContent::Text {
            text: text.clone(),
            font: style.font.clone(),
            color: style.color,
            word_spacing: *word_spacing,
            char_spacing: *char_spacing,
        }),
        RunKind::Component(InlineContent::Image { src }) => Some(RunContent::Image {
            src: src.clone(),
        }),
        RunKind::Component(InlineContent::Path { data }) => Some(RunContent::Path {
            data: data.clone(),
        }),
        RunKind::Component(InlineContent::Component { name }) => Some(RunContent::Component {
            name: name.clone(),
        }),
        _ => None,
    }
}

/// The block's transform about the centre of its border box. Pure
/// translations skip the centring.
fn transform_matrix(block: &Block, rect: Rect) -> Option<Matrix> {
    let t = block.style.position.transform?;
    if t.is_translation_only() {
        return Some(Matrix::translation(t.translate_x, t.translate_y));
    }
    let (cx, cy) = (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
    Some(
        Matrix::translation(-cx, -cy)
            .then(&Matrix::scale(
                t.scale_x.unwrap_or(1.0),
                t.scale_y.unwrap_or(1.0),
            ))
            .then(&Matrix::rotation(t.rotate))
            .then(&Matrix::translation(cx + t.translate_x, cy + t.translate_y)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::font::FontContext;
    use crate::geometry::Edges;
    use crate::layout::engine::layout;
    use crate::model::{Document, Node, PageConfig, PageSize};
    use crate::style::{Dimension, HorizontalAlign, Style, Transform};

    fn document(children: Vec<Node>) -> Document {
        Document {
            children,
            default_page: PageConfig {
                size: PageSize::Custom {
                    width: 220.0,
                    height: 300.0,
                },
                margin: Edges::uniform(10.0),
                wrap: true,
            },
            style: Style {
                font_family: Some("Courier".to_string()),
                font_size: Some(10.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn run(document: &Document) -> LaidOutDocument {
        let fonts = FontContext::new();
        layout(document, &LayoutConfig::default(), &fonts).unwrap()
    }

    #[test]
    fn lines_are_placed_inside_the_margins() {
        let laid = run(&document(vec![Node::text("one\ntwo", Style::default())]));
        let lines = laid.pages[0].lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].rect.x, 10.0);
        assert_eq!(lines[0].rect.y, 10.0);
        assert_eq!(lines[0].rect.width, 200.0);
        assert_eq!(lines[1].rect.y, 10.0 + lines[0].rect.height);
        assert_eq!(lines[0].runs[0].rect.width, 18.0);
    }

    #[test]
    fn nested_block_rect_excludes_margins() {
        let boxed = Node::view(
            Style {
                margin: Some(Edges::uniform(5.0)),
                ..Default::default()
            },
            vec![Node::text("hi", Style::default())],
        )
        .with_id("boxed");
        let laid = run(&document(vec![boxed]));
        let placement = laid.placements_of("boxed").next().unwrap();
        assert_eq!(placement.page, 0);
        assert_eq!(placement.rect.x, 15.0);
        assert_eq!(placement.rect.y, 15.0);
        assert_eq!(placement.rect.width, 190.0);
        let line = laid.pages[0].lines()[0];
        assert_eq!(line.rect.origin(), Point::new(15.0, 15.0));
    }

    #[test]
    fn right_aligned_runs_end_at_the_line_edge() {
        let laid = run(&document(vec![Node::text(
            "abc",
            Style {
                horizontal_align: Some(HorizontalAlign::Right),
                ..Default::default()
            },
        )]));
        let line = laid.pages[0].lines()[0];
        let last = line.runs.last().unwrap();
        assert!((last.rect.right() - line.rect.right()).abs() < 1e-9);
    }

    #[test]
    fn rotation_turns_about_the_centre() {
        let turned = Node::view(
            Style {
                width: Some(Dimension::Pt(40.0)),
                height: Some(Dimension::Pt(20.0)),
                transform: Some(Transform {
                    rotate: 180.0,
                    ..Default::default()
                }),
                ..Default::default()
            },
            vec![],
        )
        .with_id("turned");
        let laid = run(&document(vec![turned]));
        let block = &laid.pages[0].blocks_owned_by("turned")[0];
        let m = block.transform.unwrap();
        let corner = m.apply(block.rect.origin());
        assert!((corner.x - block.rect.right()).abs() < 1e-9);
        assert!((corner.y - block.rect.bottom()).abs() < 1e-9);
    }

    #[test]
    fn visitor_sees_every_run_once() {
        #[derive(Default)]
        struct Count {
            pages: usize,
            runs: usize,
        }
        impl RenderVisitor for Count {
            fn begin_page(&mut self, _page: &LaidOutPage) {
                self.pages += 1;
            }
            fn run(&mut self, _run: &LaidOutRun) {
                self.runs += 1;
            }
        }
        let laid = run(&document(vec![Node::text("a b\nc", Style::default())]));
        let mut count = Count::default();
        laid.walk(&mut count);
        assert_eq!(count.pages, 1);
        let expected: usize = laid.pages[0].lines().iter().map(|l| l.runs.len()).sum();
        assert_eq!(count.runs, expected);
        assert!(count.runs >= 2);
    }

    #[test]
    fn serializes_with_tagged_items() {
        let laid = run(&document(vec![Node::text("x", Style::default())]));
        let json = serde_json::to_value(&laid).unwrap();
        let page = &json["pages"][0];
        assert_eq!(page["root"]["engine"], "Page");
        let content = &page["root"]["columns"][0]["items"][0];
        assert_eq!(content["type"], "Block");
    }
}
