//! Lists and list items.
//!
//! A list item is a two-column block whose columns do not flow into each
//! other: the label column, `list_inset` wide, and the content column. The
//! label is only laid out in the first fragment of an item; continuations
//! open straight into the content column.

use std::rc::Rc;

use crate::error::LayoutError;
use crate::model::Node;
use crate::style::{ColumnOptions, ColumnWidths, ListStyle, ResolvedStyle, Style};

use super::arena::{BlockId, LayoutArena};
use super::block::EngineKind;
use super::context::LayoutContext;
use super::engine::layout_container;

/// Counter numbering the items of the innermost list.
pub const LIST_COUNTER: &str = "list-item";

pub fn layout_list(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
    engine: EngineKind,
) -> Result<(), LayoutError> {
    let saved = ctx.counters.value(LIST_COUNTER);
    if !style.counter_reset.iter().any(|c| c.name == LIST_COUNTER) {
        ctx.counters.set(LIST_COUNTER, 0);
    }
    let result = layout_container(ctx, node, style, engine);
    ctx.counters.set(LIST_COUNTER, saved);
    result
}

pub fn layout_list_item(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
    engine: EngineKind,
) -> Result<(), LayoutError> {
    ctx.counters.increment(LIST_COUNTER, 1);
    let number = ctx.counters.value(LIST_COUNTER);
    let inset = style.list_inset.unwrap_or(ctx.config.default_list_inset);
    let item_style = Rc::new(ResolvedStyle {
        columns: ColumnOptions {
            count: 2,
            alley_width: 0.0,
            widths: ColumnWidths::Explicit(vec![inset]),
            auto_flow: false,
        },
        ..(**style).clone()
    });

    // The label and the first line of content share a row.
    let label_height = ctx.text_metrics(&style.text).line_height;
    if !ctx.ensure_space(label_height)? {
        return Ok(());
    }
    let Some(depth) = ctx.begin_block(Some(node), engine, &item_style)? else {
        return Ok(());
    };
    let result = layout_item_content(ctx, node, style, depth, &format_label(style.list_style, number));
    let closed = ctx.end_block(depth);
    result.and(closed)
}

fn layout_item_content(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &ResolvedStyle,
    depth: usize,
    label: &str,
) -> Result<(), LayoutError> {
    if !label.is_empty() {
        ctx.layout_child(&Node::text(label, Style::default()))?;
    }
    let item = *ctx
        .block_stack
        .get(depth)
        .ok_or(LayoutError::NoCurrentBlock)?;
    if ctx.arena.block(item).current_column == 0 {
        enter_content_column(&mut ctx.arena, item)?;
    }
    ctx.layout_children(node, style)
}

/// Move a list item from its label column to its content column.
pub fn enter_content_column(arena: &mut LayoutArena, item: BlockId) -> Result<(), LayoutError> {
    if arena.move_to_next_region(item, true, 0.0)? {
        return Ok(());
    }
    Err(LayoutError::UnexpectedItem {
        expected: "content column".to_string(),
        found: format!("list item block #{} with {} column(s)", item.0, arena.block(item).columns.len()),
    })
}

/// The marker for item `number` in `style`.
pub fn format_label(style: ListStyle, number: i32) -> String {
    match style {
        ListStyle::None => String::new(),
        ListStyle::Disc => "\u{2022}".to_string(),
        ListStyle::LowerAlpha if number > 0 => format!("{}.", alpha(number)),
        ListStyle::UpperAlpha if number > 0 => format!("{}.", alpha(number).to_uppercase()),
        ListStyle::LowerRoman if (1..4000).contains(&number) => format!("{}.", roman(number)),
        ListStyle::UpperRoman if (1..4000).contains(&number) => {
            format!("{}.", roman(number).to_uppercase())
        }
        _ => format!("{number}."),
    }
}

/// Bijective base 26: a..z, aa..az, ...
fn alpha(mut n: i32) -> String {
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn roman(mut n: i32) -> String {
    const NUMERALS: [(i32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, digits) in NUMERALS {
        while n >= value {
            out.push_str(digits);
            n -= value;
        }
    }
    out
}
