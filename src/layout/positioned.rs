//! Content outside normal flow.
//!
//! Every positioned node gets its own region, anchored on a block:
//!
//! * `Fixed` and `Absolute` anchor on the page box. Fixed offsets are taken
//!   from the page edge, absolute offsets from the margin box.
//! * `Relative` and `InlineBlock` anchor on the innermost block and occupy
//!   space in the flow through a placeholder run sized like the region.
//! * Floats anchor on the innermost block, take their space from the side of
//!   the lines they sit next to and register a float inset on the region.
//!
//! Positioned regions never paginate.

use std::rc::Rc;

use crate::error::LayoutError;
use crate::geometry::{Rect, Size};
use crate::model::Node;
use crate::style::{FloatMode, PositionMode, PositionOptions, ResolvedStyle, VerticalAlign};

use super::arena::{LayoutArena, RegionId, RegionItem};
use super::context::LayoutContext;
use super::run::{Run, RunKind};

pub fn layout_positioned(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
) -> Result<(), LayoutError> {
    let inner = flow_style(style);
    if style.position.float != FloatMode::None {
        return layout_float(ctx, node, style, &inner);
    }
    match style.position.mode {
        PositionMode::Absolute | PositionMode::Fixed => {
            layout_page_anchored(ctx, node, style, &inner)
        }
        _ => layout_in_flow(ctx, node, style, &inner),
    }
}

/// The style a positioned node's own content is laid out with.
fn flow_style(style: &ResolvedStyle) -> Rc<ResolvedStyle> {
    Rc::new(ResolvedStyle {
        position: PositionOptions {
            mode: PositionMode::Block,
            float: FloatMode::None,
            top: None,
            right: None,
            bottom: None,
            left: None,
            ..style.position.clone()
        },
        ..style.clone()
    })
}

/// A transformed region must hold exactly one block.
pub fn check_transform_content(
    arena: &LayoutArena,
    region: RegionId,
    style: &ResolvedStyle,
) -> Result<(), LayoutError> {
    if style.position.transform.is_none() {
        return Ok(());
    }
    match arena.region(region).items.as_slice() {
        [RegionItem::Block(_)] => Ok(()),
        items => Err(LayoutError::InvalidTransformContent { count: items.len() }),
    }
}

/// Close a positioned region and shrink it to its content. Empty regions are
/// dropped from their anchor; returns whether the region is kept.
fn finish_region(
    ctx: &mut LayoutContext<'_>,
    region: RegionId,
    style: &ResolvedStyle,
) -> Result<bool, LayoutError> {
    ctx.arena.close_region(region)?;
    if ctx.arena.region(region).is_empty() {
        let anchor = ctx.arena.region(region).parent;
        ctx.arena
            .block_mut(anchor)
            .positioned
            .retain(|r| *r != region);
        return Ok(false);
    }
    check_transform_content(&ctx.arena, region, style)?;
    let r = ctx.arena.region_mut(region);
    r.bounds.width = r.used.width;
    r.bounds.height = r.used.height;
    Ok(true)
}

fn layout_page_anchored(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
    inner: &Rc<ResolvedStyle>,
) -> Result<(), LayoutError> {
    let pos = &style.position;
    let Some(line) = ctx.line_for(0.0, 0.0, pos.h_align)? else {
        return Ok(());
    };

    let page = ctx.page()?;
    let root = page.root;
    let base = match pos.mode {
        PositionMode::Fixed => Rect::from_size(page.size),
        _ => ctx.arena.block(root).available_bounds,
    };
    let region = ctx.arena.begin_positioned_region(
        root,
        Rect::new(base.x, base.y, base.width, f64::INFINITY),
        pos.mode,
        FloatMode::None,
        Rc::clone(style),
    );
    ctx.arena.add_run(
        line,
        Run::new(
            RunKind::Positioned {
                region,
                mode: pos.mode,
                floating: false,
            },
            0.0,
            0.0,
        ),
    )?;

    let saved = std::mem::replace(&mut ctx.block_stack, vec![root]);
    let result = ctx.dispatch(node, inner);
    ctx.block_stack = saved;
    result?;
    if !finish_region(ctx, region, inner)? {
        return Ok(());
    }

    let used = ctx.arena.region(region).used;
    let x = pos
        .left
        .map(|l| base.x + l)
        .or_else(|| pos.right.map(|r| base.right() - r - used.width))
        .unwrap_or(base.x);
    let y = pos
        .top
        .map(|t| base.y + t)
        .or_else(|| pos.bottom.map(|b| base.bottom() - b - used.height))
        .unwrap_or(base.y);
    ctx.arena.region_mut(region).bounds = Rect::new(x, y, used.width, used.height);
    Ok(())
}

/// Relative and inline-block content: laid out first, then placed in the
/// flow as one run of the region's size.
fn layout_in_flow(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
    inner: &Rc<ResolvedStyle>,
) -> Result<(), LayoutError> {
    let pos = &style.position;
    let mode = pos.mode;
    let anchor = ctx.innermost()?;
    let flow = ctx.current_region()?;
    if mode == PositionMode::Relative {
        ctx.arena.close_current_item(flow)?;
    }
    let top = match ctx.arena.open_line(flow) {
        Some(line) => ctx.arena.line(line).offset.y,
        None => ctx.arena.region(flow).used.height,
    };
    let fb = ctx.arena.region(flow).bounds;
    let region = ctx.arena.begin_positioned_region(
        anchor,
        Rect::new(fb.x, fb.y + top, fb.width, f64::INFINITY),
        mode,
        FloatMode::None,
        Rc::clone(style),
    );
    ctx.dispatch(node, inner)?;
    if !finish_region(ctx, region, inner)? {
        return Ok(());
    }
    let size = ctx.arena.region(region).bounds.size();

    let line = if mode == PositionMode::Relative {
        if ctx.ensure_space(size.height)? {
            let flow = ctx.current_region()?;
            Some(ctx.arena.begin_new_line(flow, size.height, pos.h_align)?)
        } else {
            None
        }
    } else {
        ctx.line_for(size.width, size.height, pos.h_align)?
    };
    let Some(line) = line else {
        return Ok(());
    };

    let now = ctx.innermost()?;
    if now != anchor && !ctx.arena.is_descendant(anchor, now) {
        ctx.config.lenient(LayoutError::PositionedRegionMoved)?;
        ctx.arena.rehome_positioned_region(region, now);
    }

    let flow = ctx.arena.line(line).parent;
    let fb = ctx.arena.region(flow).bounds;
    let l = ctx.arena.line(line);
    let origin = (fb.x + l.offset.x + l.used_width, fb.y + l.offset.y);
    ctx.arena.region_mut(region).bounds =
        Rect::new(origin.0, origin.1, size.width, size.height);

    let v_align = match mode {
        PositionMode::InlineBlock => pos.v_align,
        _ => VerticalAlign::Top,
    };
    ctx.arena.add_run(
        line,
        Run::new(
            RunKind::Positioned {
                region,
                mode,
                floating: false,
            },
            size.width,
            size.height,
        )
        .with_v_align(v_align),
    )?;
    if mode == PositionMode::Relative {
        ctx.arena.close_current_item(flow)?;
    }
    Ok(())
}

/// Floats are laid out at the current line, then pushed down until a slice
/// of the region is wide enough, and pinned to their side.
fn layout_float(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
    inner: &Rc<ResolvedStyle>,
) -> Result<(), LayoutError> {
    let float = style.position.float;
    let anchor = ctx.innermost()?;
    let flow = ctx.current_region()?;
    let fb = ctx.arena.region(flow).bounds;
    let open = ctx.arena.open_line(flow);
    let start_y = match open {
        Some(line) => ctx.arena.line(line).offset.y,
        None => ctx.arena.region(flow).used.height,
    };
    let hint = match style.position.width {
        Some(w) => w + style.position.margin.horizontal(),
        None => ctx.arena.available_line_width(flow, start_y, 0.0),
    };

    let region = ctx.arena.begin_positioned_region(
        anchor,
        Rect::new(fb.x, fb.y + start_y, hint, f64::INFINITY),
        PositionMode::Block,
        float,
        Rc::clone(style),
    );
    ctx.dispatch(node, inner)?;
    if !finish_region(ctx, region, inner)? {
        return Ok(());
    }
    let mut size = ctx.arena.region(region).bounds.size();
    if size.width > fb.width {
        log::warn!(
            "{:?} float of {:.2}pt is wider than its {:.2}pt region; clamped",
            float,
            size.width,
            fb.width
        );
        size.width = fb.width;
    }

    let line_height = ctx.current_style().text.line_height();
    let y = float_top(&ctx.arena, flow, open, start_y, size, line_height);
    let (x, inset) = match float {
        FloatMode::Right => {
            let right = ctx.arena.right_inset(flow, y, size.height);
            (fb.width - right - size.width, right)
        }
        _ => {
            let left = ctx.arena.left_inset(flow, y, size.height);
            (left, left)
        }
    };
    ctx.arena.region_mut(region).bounds = Rect::new(fb.x + x, fb.y + y, size.width, size.height);
    ctx.arena
        .add_floating_inset(flow, float, size.width, inset, y, size.height);
    log::debug!(
        "{:?} float of {:.2}x{:.2} placed at ({x:.2}, {y:.2})",
        float,
        size.width,
        size.height
    );

    if let Some(line) = open {
        let l = ctx.arena.line_mut(line);
        if (l.offset.y - y).abs() < f64::EPSILON {
            l.full_width = (l.full_width - size.width).max(0.0);
            if float == FloatMode::Left {
                l.offset.x += size.width;
            }
        }
        ctx.arena.add_run(
            line,
            Run::new(
                RunKind::Positioned {
                    region,
                    mode: PositionMode::Block,
                    floating: true,
                },
                0.0,
                0.0,
            ),
        )?;
    }
    Ok(())
}

/// Top of a float of `size`: the current line if it still has room, else
/// below it, then below every float that leaves too little width.
fn float_top(
    arena: &LayoutArena,
    flow: RegionId,
    open: Option<super::arena::LineId>,
    start_y: f64,
    size: Size,
    line_height: f64,
) -> f64 {
    let mut y = start_y;
    if let Some(line) = open {
        let l = arena.line(line);
        if l.has_content() && !l.can_fit_width(size.width) {
            y = l.offset.y + l.height.max(line_height);
        }
    }
    while arena.available_line_width(flow, y, size.height) < size.width {
        match arena.float_clearance(flow, y, size.height) {
            Some(next) if next > y => y = next,
            _ => break,
        }
    }
    y
}
