//! Text layout: fitting characters onto lines.
//!
//! A text node becomes a list of operations (text segments, pre-measured
//! proxies and line breaks). Each segment is measured against the open
//! line's remaining width and cut at the last break opportunity that fits.
//! Whatever does not fit continues on the next line, which may be in the next
//! column or on the next page.

use std::rc::Rc;

use unicode_linebreak::linebreaks;

use crate::error::LayoutError;
use crate::model::{Node, NodeKind};
use crate::style::{HorizontalAlign, ResolvedStyle, TextOptions, WrapMode};

use super::arena::LineId;
use super::context::LayoutContext;
use super::line::CloseReason;
use super::run::{Run, TextMetrics, TextStyle};

#[derive(Debug, Clone, PartialEq)]
enum TextOp {
    Text { text: String, options: TextOptions },
    /// Placed as one unbreakable run of a known width.
    Proxy {
        text: String,
        width: f64,
        options: TextOptions,
    },
    LineBreak,
}

/// Per-node placement state.
#[derive(Debug, Default)]
struct TextState {
    /// Indent still owed to the first line of the node.
    pending_inset: f64,
    /// Drop leading whitespace: the previous line was soft-wrapped.
    skip_leading: bool,
    /// Consecutive lines on which nothing could be placed.
    zero_fits: u32,
}

fn push_segments(ops: &mut Vec<TextOp>, text: &str, options: &TextOptions) {
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            ops.push(TextOp::LineBreak);
        }
        if !segment.is_empty() {
            ops.push(TextOp::Text {
                text: segment.to_string(),
                options: options.clone(),
            });
        }
    }
}

fn text_ops(node: &Node, base: &TextOptions) -> Vec<TextOp> {
    let NodeKind::Text { content, spans } = &node.kind else {
        return Vec::new();
    };
    let mut ops = Vec::new();
    if spans.is_empty() {
        push_segments(&mut ops, content, base);
        return ops;
    }
    for span in spans {
        let mut options = base.clone();
        if let Some(size) = span.font_size {
            options.font.size = size;
        }
        if let Some(family) = &span.font_family {
            options.font.family = family.clone();
        }
        match span.measured_width {
            Some(width) => ops.push(TextOp::Proxy {
                text: span.content.clone(),
                width,
                options,
            }),
            None => push_segments(&mut ops, &span.content, &options),
        }
    }
    ops
}

pub fn layout_text(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
) -> Result<(), LayoutError> {
    let mut state = TextState::default();
    let region = ctx.current_region()?;
    if ctx.arena.open_line(region).is_none() {
        state.pending_inset = style.text.first_line_inset.max(0.0);
    }
    let h_align = style.position.h_align;
    for op in text_ops(node, &style.text) {
        if !ctx.continue_layout {
            break;
        }
        match op {
            TextOp::Text { text, options } => {
                place_text(ctx, &text, &options, h_align, &mut state)?
            }
            TextOp::Proxy {
                text,
                width,
                options,
            } => place_proxy(ctx, text, width, &options, h_align, &mut state)?,
            TextOp::LineBreak => {
                hard_line_break(ctx, style)?;
                state.skip_leading = false;
            }
        }
    }
    Ok(())
}

/// End the current line on an explicit break. A break on an empty line
/// still gives that line the height of the text.
pub fn hard_line_break(
    ctx: &mut LayoutContext<'_>,
    style: &Rc<ResolvedStyle>,
) -> Result<(), LayoutError> {
    let metrics = ctx.text_metrics(&style.text);
    let Some(line) = text_line(ctx, &metrics, style.position.h_align, &mut 0.0)? else {
        return Ok(());
    };
    if !ctx.arena.line(line).runs.iter().any(Run::is_text) {
        ctx.arena.add_run(line, Run::text_begin(metrics))?;
        ctx.arena.add_run(line, Run::text_end(metrics))?;
    }
    ctx.break_line(line, CloseReason::HardBreak)
}

/// The open line if its height allows, else a new one with room for the
/// text's line height.
fn text_line(
    ctx: &mut LayoutContext<'_>,
    metrics: &TextMetrics,
    h_align: HorizontalAlign,
    pending_inset: &mut f64,
) -> Result<Option<LineId>, LayoutError> {
    let height = metrics.line_height;
    let region = ctx.current_region()?;
    if let Some(line) = ctx.arena.open_line(region) {
        let l = ctx.arena.line(line);
        if height <= l.height
            || !l.has_content()
            || ctx.arena.remaining_height(region) >= height
        {
            return Ok(Some(line));
        }
        ctx.break_line(line, CloseReason::SoftWrap)?;
    }
    if !ctx.ensure_space(height)? {
        return Ok(None);
    }
    let region = ctx.current_region()?;
    let line = ctx.arena.begin_new_line(region, height, h_align)?;
    if *pending_inset > 0.0 {
        ctx.arena.add_run(line, Run::spacer(*pending_inset))?;
        *pending_inset = 0.0;
    }
    Ok(Some(line))
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| i)
}

fn place_text(
    ctx: &mut LayoutContext<'_>,
    text: &str,
    options: &TextOptions,
    h_align: HorizontalAlign,
    state: &mut TextState,
) -> Result<(), LayoutError> {
    let metrics = ctx.text_metrics(options);
    let text_style = Rc::new(TextStyle {
        font: options.font.clone(),
        color: options.color,
        metrics,
    });
    let space_width = ctx.measurer.measure(" ", options, f64::INFINITY).size.width;
    let opportunities: Vec<usize> = match options.wrap {
        WrapMode::Word => linebreaks(text).map(|(i, _)| i).collect(),
        _ => Vec::new(),
    };

    let mut pos = 0;
    while pos < text.len() && ctx.continue_layout {
        if state.skip_leading {
            let rest = &text[pos..];
            pos += rest.len() - rest.trim_start_matches([' ', '\t']).len();
            if pos >= text.len() {
                break;
            }
            state.skip_leading = false;
        }
        let Some(line) = text_line(ctx, &metrics, h_align, &mut state.pending_inset)? else {
            break;
        };
        let rest = &text[pos..];
        let (available, has_content) = {
            let l = ctx.arena.line(line);
            (l.available_width(), l.has_content())
        };

        let fit = ctx.measurer.measure(rest, options, available);
        let mut chars = fit.chars;
        let mut width = fit.size.width;
        while chars > 0 && width >= available {
            chars -= 1;
            width = ctx
                .measurer
                .measure(&rest[..byte_index(rest, chars)], options, f64::INFINITY)
                .size
                .width;
        }
        let fit_end = byte_index(rest, chars);

        let (take, wrap) = if fit_end == rest.len() || options.wrap == WrapMode::NoWrap {
            (rest.len(), false)
        } else if options.wrap == WrapMode::Character {
            (fit_end, true)
        } else if rest[fit_end..].starts_with([' ', '\t']) {
            (fit_end, true)
        } else {
            match opportunities
                .iter()
                .rev()
                .find(|&&b| b > pos && b <= pos + fit_end)
            {
                Some(&b) => (b - pos, true),
                None if has_content => (0, true),
                None => {
                    // A word squeezed beside a float goes below it whole.
                    if ctx.arena.clear_floats(line, metrics.line_height)? {
                        continue;
                    }
                    (fit_end, true)
                }
            }
        };

        if take == 0 && !has_content {
            if ctx.arena.clear_floats(line, metrics.line_height)? {
                continue;
            }
            state.zero_fits += 1;
            if state.zero_fits >= ctx.config.zero_fit_guard {
                log::error!(
                    "no character of {:?} fits in {available:.2}pt after {} attempts; stopping",
                    rest.chars().take(16).collect::<String>(),
                    state.zero_fits
                );
                ctx.halt(None);
                break;
            }
        } else if take > 0 {
            state.zero_fits = 0;
            let piece = &rest[..take];
            let piece_width = if take == fit_end {
                width
            } else {
                ctx.measurer.measure(piece, options, f64::INFINITY).size.width
            };
            ctx.arena.add_run(line, Run::text_begin(metrics))?;
            ctx.arena.add_run(
                line,
                Run::characters(
                    piece.to_string(),
                    Rc::clone(&text_style),
                    piece_width,
                    space_width,
                ),
            )?;
            ctx.arena.add_run(line, Run::text_end(metrics))?;
        }

        pos += take;
        if wrap {
            ctx.break_line(line, CloseReason::SoftWrap)?;
            state.skip_leading = true;
        }
    }
    Ok(())
}

fn place_proxy(
    ctx: &mut LayoutContext<'_>,
    text: String,
    width: f64,
    options: &TextOptions,
    h_align: HorizontalAlign,
    state: &mut TextState,
) -> Result<(), LayoutError> {
    let metrics = ctx.text_metrics(options);
    let Some(mut line) = text_line(ctx, &metrics, h_align, &mut state.pending_inset)? else {
        return Ok(());
    };
    let l = ctx.arena.line(line);
    if !l.can_fit_width(width) && l.has_content() {
        ctx.break_line(line, CloseReason::SoftWrap)?;
        match text_line(ctx, &metrics, h_align, &mut state.pending_inset)? {
            Some(next) => line = next,
            None => return Ok(()),
        }
    }
    let space_width = ctx.measurer.measure(" ", options, f64::INFINITY).size.width;
    let text_style = Rc::new(TextStyle {
        font: options.font.clone(),
        color: options.color,
        metrics,
    });
    ctx.arena.add_run(line, Run::text_begin(metrics))?;
    ctx.arena
        .add_run(line, Run::characters(text, text_style, width, space_width))?;
    ctx.arena.add_run(line, Run::text_end(metrics))?;
    state.skip_leading = false;
    Ok(())
}
