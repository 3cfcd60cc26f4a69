//! # Tables
//!
//! Tables are laid out in two phases. First a reference grid is built: the
//! visible rows and cells with their resolved styles, with `None` placeholders
//! in the grid columns a spanning cell covers. Column widths are resolved
//! from that grid before any row is placed, so every row shares them.
//!
//! Rows are then placed one at a time as unsplittable units. A row block has
//! one non-flowing column per cell. When a finished row overflows, it is
//! taken out again and the table continues in the next column or page (a new
//! grid segment) with its `repeat_at_top` rows replayed first. A table that
//! must not split is moved whole, once.
//!
//! A last pass gives repeated rows one height across segments and stretches
//! cells to the height of their row.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LayoutError;
use crate::model::{Node, NodeKind};
use crate::style::{ColumnOptions, ColumnWidths, OverflowSplit, ResolvedStyle};

use super::arena::{BlockId, LayoutArena, RegionItem};
use super::block::{EngineKind, Owner};
use super::context::LayoutContext;

/// A cell's footprint in the reference grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSpan {
    pub column: usize,
    pub span: usize,
    /// Explicit width of the cell, covering all spanned columns.
    pub width: Option<f64>,
}

struct CellRef<'n> {
    node: &'n Node,
    span: usize,
    width: Option<f64>,
}

struct RowRef<'n> {
    node: &'n Node,
    style: Rc<ResolvedStyle>,
    /// Indexed by grid column. Columns covered by a span hold `None`.
    cells: Vec<Option<CellRef<'n>>>,
    repeat_at_top: bool,
}

impl RowRef<'_> {
    fn anchors(&self) -> impl Iterator<Item = (usize, &CellRef<'_>)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(column, cell)| cell.as_ref().map(|cell| (column, cell)))
    }
}

/// Placement state of one table.
#[derive(Debug, Default)]
struct TableState {
    /// The one whole-table move of an unsplittable table has been spent.
    moved: bool,
    /// Row blocks per grid segment, with the index of the row they render.
    segments: Vec<Vec<(usize, BlockId)>>,
}

pub fn layout_table(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &Rc<ResolvedStyle>,
    engine: EngineKind,
) -> Result<(), LayoutError> {
    let Some(depth) = ctx.begin_block(Some(node), engine, style)? else {
        return Ok(());
    };
    let result = layout_rows(ctx, node, style, depth);
    let closed = ctx.end_block(depth);
    result.and(closed)
}

fn layout_rows(
    ctx: &mut LayoutContext<'_>,
    node: &Node,
    style: &ResolvedStyle,
    depth: usize,
) -> Result<(), LayoutError> {
    let table = *ctx
        .block_stack
        .get(depth)
        .ok_or(LayoutError::NoCurrentBlock)?;
    let available = ctx.arena.block(table).available_bounds.width;
    let (rows, columns) = build_references(ctx, node, style, available)?;
    let spans: Vec<CellSpan> = rows
        .iter()
        .flat_map(|row| {
            row.anchors().map(|(column, cell)| CellSpan {
                column,
                span: cell.span,
                width: cell.width,
            })
        })
        .collect();
    let widths = resolve_column_widths(&spans, columns, available);
    log::debug!(
        "table '{}': {} row(s), column widths {:?}",
        node.label(),
        rows.len(),
        widths
    );

    let mut state = TableState {
        moved: false,
        segments: vec![Vec::new()],
    };
    for index in 0..rows.len() {
        if !ctx.continue_layout || !place_row(ctx, &rows, index, &widths, depth, &mut state)? {
            break;
        }
    }
    equalize_repeated_rows(&mut ctx.arena, &rows, &state);
    for &(_, row) in state.segments.iter().flatten() {
        stretch_cells(&mut ctx.arena, row);
    }
    Ok(())
}

/// Build the reference grid. Returns the rows and the grid's column count.
fn build_references<'n>(
    ctx: &mut LayoutContext<'_>,
    node: &'n Node,
    style: &ResolvedStyle,
    available: f64,
) -> Result<(Vec<RowRef<'n>>, usize), LayoutError> {
    let mut rows = Vec::new();
    let mut columns = 0;
    for child in &node.children {
        let NodeKind::TableRow { repeat_at_top } = &child.kind else {
            log::warn!("{} inside a table is not a row; skipped", child.label());
            continue;
        };
        let row_style =
            ctx.style_cache
                .resolve(&child.style, child.style_id.as_deref(), style, available);
        if row_style.invisible {
            continue;
        }
        let mut cells = Vec::new();
        for cell in &child.children {
            let cell_style =
                ctx.style_cache
                    .resolve(&cell.style, cell.style_id.as_deref(), &row_style, available);
            if cell_style.invisible {
                continue;
            }
            let span = match &cell.kind {
                NodeKind::TableCell { col_span } => *col_span,
                _ => 1,
            };
            if span < 1 {
                return Err(LayoutError::InvalidColumnSpan { span }.in_component(cell.label()));
            }
            cells.push(Some(CellRef {
                node: cell,
                span: span as usize,
                width: cell_style.position.width,
            }));
            cells.extend((1..span).map(|_| None));
        }
        columns = columns.max(cells.len());
        rows.push(RowRef {
            node: child,
            style: row_style,
            cells,
            repeat_at_top: *repeat_at_top,
        });
    }
    Ok((rows, columns))
}

/// Resolve every grid column's width.
///
/// Single-column cells set their column's width (the widest wins). Spanning
/// cells are resolved in order of ascending span whenever exactly one of
/// their columns is still unknown. When no span can be resolved that way, the
/// narrowest unresolved span splits what is left of its width evenly over its
/// unknown columns, and resolution resumes. That split is an approximation:
/// overlapping spans may end up wider than declared. Columns nothing
/// constrains share the remaining table width equally.
pub fn resolve_column_widths(cells: &[CellSpan], columns: usize, available: f64) -> Vec<f64> {
    let mut known: Vec<Option<f64>> = vec![None; columns];
    for cell in cells.iter().filter(|c| c.span == 1) {
        if let (Some(w), Some(slot)) = (cell.width, known.get_mut(cell.column)) {
            *slot = Some(slot.map_or(w, |k: f64| k.max(w)));
        }
    }

    let mut spans: Vec<(usize, usize, f64)> = cells
        .iter()
        .filter(|c| c.span > 1)
        .filter_map(|c| c.width.map(|w| (c.column, c.span.min(columns - c.column), w)))
        .collect();
    spans.sort_by_key(|&(column, span, _)| (span, column));

    let unknown_in = |known: &[Option<f64>], (start, span, _): (usize, usize, f64)| {
        (start..start + span).filter(|&c| known[c].is_none()).count()
    };
    let rest_of = |known: &[Option<f64>], (start, span, width): (usize, usize, f64)| {
        let assigned: f64 = known[start..start + span].iter().flatten().sum();
        (width - assigned).max(0.0)
    };
    loop {
        let mut progress = true;
        while progress {
            progress = false;
            for &group in &spans {
                if unknown_in(&known, group) == 1 {
                    let rest = rest_of(&known, group);
                    let (start, span, _) = group;
                    if let Some(slot) = known[start..start + span].iter_mut().find(|k| k.is_none()) {
                        *slot = Some(rest);
                    }
                    progress = true;
                }
            }
        }
        let Some(&group) = spans.iter().find(|&&g| unknown_in(&known, g) > 0) else {
            break;
        };
        let share = rest_of(&known, group) / unknown_in(&known, group) as f64;
        let (start, span, _) = group;
        for slot in known[start..start + span].iter_mut().filter(|k| k.is_none()) {
            *slot = Some(share);
        }
    }

    let assigned: f64 = known.iter().flatten().sum();
    let open = known.iter().filter(|k| k.is_none()).count();
    let share = if open > 0 {
        ((available - assigned) / open as f64).max(0.0)
    } else {
        0.0
    };
    known.into_iter().map(|k| k.unwrap_or(share)).collect()
}

/// Lay out one row as a block in the table's current region.
fn layout_row(
    ctx: &mut LayoutContext<'_>,
    row: &RowRef<'_>,
    widths: &[f64],
) -> Result<BlockId, LayoutError> {
    let column_widths: Vec<f64> = row
        .anchors()
        .map(|(column, cell)| widths.iter().skip(column).take(cell.span).sum())
        .collect();
    let style = Rc::new(ResolvedStyle {
        columns: ColumnOptions {
            count: column_widths.len().max(1) as u32,
            alley_width: 0.0,
            widths: ColumnWidths::Explicit(column_widths),
            auto_flow: false,
        },
        ..(*row.style).clone()
    });
    let region = ctx.current_region()?;
    let id = ctx.arena.begin_new_block(
        region,
        Some(Owner::of(row.node)),
        EngineKind::TableRow,
        style,
        0,
    )?;
    ctx.block_stack.push(id);
    let depth = ctx.block_stack.len() - 1;

    ctx.styles.push(Rc::clone(&row.style));
    let result = layout_cells(ctx, id, row);
    ctx.styles.pop();
    let closed = ctx.end_block(depth);
    result.and(closed)?;
    Ok(id)
}

fn layout_cells(
    ctx: &mut LayoutContext<'_>,
    row_block: BlockId,
    row: &RowRef<'_>,
) -> Result<(), LayoutError> {
    for (i, (_, cell)) in row.anchors().enumerate() {
        if !ctx.continue_layout {
            break;
        }
        if i > 0 {
            ctx.arena.move_to_next_region(row_block, true, 0.0)?;
        }
        ctx.layout_child(cell.node)?;
    }
    Ok(())
}

/// Place row `index`, moving on when it overflows. Returns `false` once no
/// further rows can be placed.
fn place_row(
    ctx: &mut LayoutContext<'_>,
    rows: &[RowRef<'_>],
    index: usize,
    widths: &[f64],
    depth: usize,
    state: &mut TableState,
) -> Result<bool, LayoutError> {
    let row = layout_row(ctx, &rows[index], widths)?;
    let region = ctx.current_region()?;
    let table = ctx.innermost()?;
    let fits = ctx.arena.remaining_height(region) >= -f64::EPSILON;
    let first = ctx.arena.region(region).items.first() == Some(&RegionItem::Block(row));
    if fits || (first && ctx.block_at_top(depth)) {
        if !fits {
            log::warn!("table row taller than the page; placing it overflowing");
        }
        push_row(state, index, row);
        return Ok(true);
    }

    let height = ctx.arena.block(row).total_bounds.height;
    ctx.arena
        .assert_remove_last_item(region, RegionItem::Block(row))?;
    if ctx.arena.block(table).split == OverflowSplit::Never {
        if state.moved {
            ctx.arena.block_mut(table).split = OverflowSplit::Any;
        }
        state.moved = true;
    }
    if !ctx.overflow(height)? {
        ctx.arena.block_mut(row).exclude_from_output = true;
        return Ok(false);
    }

    let current = *ctx
        .block_stack
        .get(depth)
        .ok_or(LayoutError::NoCurrentBlock)?;
    if current != table {
        log::debug!("table continues in a new segment at row {index}");
        state.segments.push(Vec::new());
        for (i, header) in rows[..index].iter().enumerate() {
            if header.repeat_at_top && ctx.continue_layout {
                let replay = layout_row(ctx, header, widths)?;
                push_row(state, i, replay);
            }
        }
    }
    let region = ctx.current_region()?;
    ctx.arena
        .add_existing_item(region, RegionItem::Block(row), None)?;
    push_row(state, index, row);
    Ok(true)
}

fn push_row(state: &mut TableState, index: usize, row: BlockId) {
    match state.segments.last_mut() {
        Some(segment) => segment.push((index, row)),
        None => state.segments.push(vec![(index, row)]),
    }
}

/// Give every instance of a repeated row the height of the tallest one.
fn equalize_repeated_rows(arena: &mut LayoutArena, rows: &[RowRef<'_>], state: &TableState) {
    let repeated = || {
        state
            .segments
            .iter()
            .flatten()
            .filter(|(index, _)| rows[*index].repeat_at_top)
    };
    let mut heights: HashMap<usize, f64> = HashMap::new();
    for &(index, row) in repeated() {
        let h = arena.block(row).total_bounds.height;
        let entry = heights.entry(index).or_insert(h);
        *entry = entry.max(h);
    }
    let rows_to_grow: Vec<(BlockId, f64)> = repeated()
        .filter_map(|&(index, row)| {
            let target = heights.get(&index).copied()?;
            let delta = target - arena.block(row).total_bounds.height;
            (delta > 0.0).then_some((row, delta))
        })
        .collect();
    for (row, delta) in rows_to_grow {
        let block = arena.block_mut(row);
        block.total_bounds.height += delta;
        block.available_bounds.height += delta;
        let Some(region) = block.parent else {
            continue;
        };
        arena.restack(region);
        let table = arena.region_owner(region);
        if arena.block(table).closed {
            arena.shrink_to_fit(table);
            if let Some(parent) = arena.block(table).parent {
                arena.restack(parent);
            }
        }
    }
}

/// Stretch auto-height cells to the height of their row.
fn stretch_cells(arena: &mut LayoutArena, row: BlockId) {
    let height = arena.block(row).available_bounds.height;
    for column in arena.block(row).columns.clone() {
        arena.region_mut(column).bounds.height = height;
        for item in arena.region(column).items.clone() {
            let RegionItem::Block(cell) = item else {
                continue;
            };
            let block = arena.block_mut(cell);
            if block.engine != EngineKind::TableCell || block.has_explicit_height() {
                continue;
            }
            let grow = height - (block.total_bounds.y + block.total_bounds.height);
            if grow > 0.0 {
                block.total_bounds.height += grow;
                block.available_bounds.height += grow;
            }
        }
        arena.region_mut(column).used.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(column: usize, span: usize, width: Option<f64>) -> CellSpan {
        CellSpan {
            column,
            span,
            width,
        }
    }

    #[test]
    fn explicit_widths_are_kept_and_the_rest_split_evenly() {
        let cells = [
            cell(0, 1, Some(100.0)),
            cell(1, 1, None),
            cell(2, 1, Some(50.0)),
            cell(3, 1, None),
        ];
        assert_eq!(
            resolve_column_widths(&cells, 4, 300.0),
            vec![100.0, 75.0, 50.0, 75.0]
        );
    }

    #[test]
    fn widest_explicit_width_wins_in_a_column() {
        let cells = [cell(0, 1, Some(40.0)), cell(0, 1, Some(60.0)), cell(1, 1, None)];
        assert_eq!(resolve_column_widths(&cells, 2, 100.0), vec![60.0, 40.0]);
    }

    #[test]
    fn span_with_one_unknown_column_resolves_exactly() {
        let cells = [
            cell(0, 1, Some(30.0)),
            cell(1, 1, Some(50.0)),
            cell(0, 3, Some(200.0)),
        ];
        assert_eq!(
            resolve_column_widths(&cells, 3, 500.0),
            vec![30.0, 50.0, 120.0]
        );
    }

    #[test]
    fn ambiguous_span_splits_evenly() {
        let cells = [
            cell(0, 1, None),
            cell(1, 2, Some(200.0)),
            cell(0, 1, None),
            cell(1, 1, None),
            cell(2, 1, None),
        ];
        assert_eq!(
            resolve_column_widths(&cells, 3, 400.0),
            vec![200.0, 100.0, 100.0]
        );
    }

    #[test]
    fn overlapping_spans_keep_the_approximation() {
        let cells = [
            cell(0, 2, Some(100.0)),
            cell(1, 2, Some(40.0)),
            cell(2, 2, Some(100.0)),
        ];
        // Columns 1 and 2 together exceed the 40pt the middle span asked for.
        assert_eq!(
            resolve_column_widths(&cells, 4, 400.0),
            vec![50.0, 50.0, 0.0, 100.0]
        );
    }
}
