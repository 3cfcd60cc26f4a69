//! Lines: horizontal sequences of runs inside a region.
//!
//! A line consumes width monotonically. Content is added only when it fits;
//! otherwise the line is closed and a new one begun. Closing a line trims one
//! trailing space, justifies soft-wrapped lines, puts every run on a shared
//! baseline and applies right or center alignment.

use serde::Serialize;

use crate::error::LayoutError;
use crate::geometry::Point;
use crate::style::{HorizontalAlign, VerticalAlign};

use super::arena::{LayoutArena, LineId, RegionId, RegionItem};
use super::run::{Run, RunKind};

/// Why a line was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CloseReason {
    /// Content continued on the next line because it did not fit.
    SoftWrap,
    /// An explicit line break.
    HardBreak,
    /// The content ended, or the region closed.
    End,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub parent: RegionId,
    /// Top-left relative to the parent region.
    pub offset: Point,
    pub full_width: f64,
    pub used_width: f64,
    pub height: f64,
    /// Baseline distance from the top of the line.
    pub baseline: f64,
    pub below_baseline: f64,
    pub h_align: HorizontalAlign,
    pub runs: Vec<Run>,
    pub closed: bool,
    pub close_reason: Option<CloseReason>,
    /// Text-only lines take the cheap baseline path.
    pub simple: bool,
}

impl Line {
    pub fn new(parent: RegionId, offset: Point, full_width: f64, h_align: HorizontalAlign) -> Self {
        Self {
            parent,
            offset,
            full_width,
            used_width: 0.0,
            height: 0.0,
            baseline: 0.0,
            below_baseline: 0.0,
            h_align,
            runs: Vec::new(),
            closed: false,
            close_reason: None,
            simple: true,
        }
    }

    pub fn add_run(&mut self, run: Run) {
        if let RunKind::TextBegin(m) | RunKind::TextEnd(m) = &run.kind {
            self.baseline = self.baseline.max(m.baseline_offset());
            self.below_baseline = self.below_baseline.max(m.below_baseline());
        }
        if matches!(run.kind, RunKind::Positioned { .. } | RunKind::Component(_)) {
            self.simple = false;
        }
        if run.is_text() || run.is_flow_object() {
            self.height = self.height.max(run.height);
        }
        self.used_width += run.advance();
        self.runs.push(run);
    }

    /// Update the size of a run added before its size was known.
    pub fn resize_run(&mut self, index: usize, width: f64, height: f64) {
        let Some(run) = self.runs.get_mut(index) else {
            return;
        };
        self.used_width += width - run.width;
        run.width = width;
        run.height = height;
        if run.is_flow_object() {
            self.height = self.height.max(height);
        }
    }

    pub fn available_width(&self) -> f64 {
        self.full_width - self.used_width
    }

    /// Ties do not fit.
    pub fn can_fit_width(&self, width: f64) -> bool {
        width < self.available_width()
    }

    pub fn has_content(&self) -> bool {
        self.runs.iter().any(Run::is_content)
    }

    /// Index of the trailing new-line run, if the line ends with one.
    fn new_line_index(&self) -> Option<usize> {
        self.runs
            .iter()
            .rposition(|r| matches!(r.kind, RunKind::NewLine { .. }))
    }

    pub fn take_back(&self) -> Option<f64> {
        self.new_line_index().and_then(|i| match self.runs[i].kind {
            RunKind::NewLine { take_back } => Some(take_back),
            _ => None,
        })
    }

    fn adjust_take_back(&mut self, delta: f64) {
        if let Some(i) = self.new_line_index() {
            if let RunKind::NewLine { take_back } = &mut self.runs[i].kind {
                *take_back += delta;
            }
        }
    }

    /// Remove one trailing whitespace character. Returns the width removed.
    pub fn trim_trailing_space(&mut self) -> f64 {
        let last_chars = self.runs.iter().rposition(|r| {
            !matches!(
                r.kind,
                RunKind::TextEnd(_) | RunKind::NewLine { .. } | RunKind::InlineEnd
            )
        });
        let Some(index) = last_chars else {
            return 0.0;
        };
        let run = &mut self.runs[index];
        let RunKind::Characters {
            text, space_width, ..
        } = &mut run.kind
        else {
            return 0.0;
        };
        if !text.ends_with([' ', '\t']) {
            return 0.0;
        }
        text.pop();
        let removed = space_width.min(run.width);
        run.width -= removed;
        self.used_width -= removed;
        removed
    }

    /// Spread the slack over spaces, or over characters when there are none.
    ///
    /// Returns the inserted width. Afterwards the natural widths of all runs
    /// plus the inserted width equal the full width.
    pub fn justify_content(&mut self) -> f64 {
        let slack = self.full_width - self.used_width;
        if slack <= 0.0 {
            return 0.0;
        }
        let (spaces, chars) = self.runs.iter().fold((0usize, 0usize), |acc, r| match &r.kind {
            RunKind::Characters { text, .. } => (
                acc.0 + text.chars().filter(|c| *c == ' ').count(),
                acc.1 + text.chars().count(),
            ),
            _ => acc,
        });
        let (per_space, per_char) = if spaces > 0 {
            (slack / spaces as f64, 0.0)
        } else if chars > 0 {
            (0.0, slack / chars as f64)
        } else {
            return 0.0;
        };
        for run in &mut self.runs {
            if let RunKind::Characters {
                word_spacing,
                char_spacing,
                ..
            } = &mut run.kind
            {
                *word_spacing = per_space;
                *char_spacing = per_char;
            }
        }
        self.used_width = self.full_width;
        slack
    }

    /// Put every run on one baseline and fix the line height.
    pub fn ensure_all_runs_on_same_level(&mut self) {
        if self.simple {
            self.height = self.height.max(self.baseline + self.below_baseline);
            let baseline = self.baseline;
            for run in &mut self.runs {
                run.offset_y = text_offset(run, baseline);
            }
            return;
        }

        let mut descent: f64 = 0.0;
        let mut total: f64 = 0.0;
        for run in self.runs.iter().filter(|r| r.is_text()) {
            if let Some(m) = run_metrics(run) {
                descent = descent.max(m.below_baseline());
                total = total.max(m.line_height);
            }
        }
        for run in self.runs.iter().filter(|r| r.is_flow_object()) {
            total = match run.v_align {
                VerticalAlign::Baseline => total.max(run.height + descent),
                _ => total.max(run.height),
            };
        }
        let mut baseline = total - descent;
        for run in self.runs.iter().filter(|r| r.is_flow_object()) {
            if run.v_align == VerticalAlign::Baseline && run.height > baseline {
                baseline = run.height;
                total = baseline + descent;
            }
        }

        for run in &mut self.runs {
            run.offset_y = if run.is_flow_object() {
                match run.v_align {
                    VerticalAlign::Baseline => baseline - run.height,
                    VerticalAlign::Top => 0.0,
                    VerticalAlign::Middle => (total - run.height) / 2.0,
                    VerticalAlign::Bottom => total - run.height,
                }
            } else {
                text_offset(run, baseline)
            };
        }
        self.baseline = baseline;
        self.below_baseline = descent;
        self.height = total;
    }

    /// Horizontal shift that right or center alignment would apply.
    pub fn alignment_shift(&self) -> f64 {
        let slack = (self.full_width - self.used_width).max(0.0);
        match self.h_align {
            HorizontalAlign::Right => slack,
            HorizontalAlign::Center => slack / 2.0,
            _ => 0.0,
        }
    }

    pub fn right_align_content(&mut self) -> f64 {
        let shift = (self.full_width - self.used_width).max(0.0);
        self.shift_content(shift)
    }

    pub fn center_align_content(&mut self) -> f64 {
        let shift = ((self.full_width - self.used_width) / 2.0).max(0.0);
        self.shift_content(shift)
    }

    fn shift_content(&mut self, shift: f64) -> f64 {
        if shift <= 0.0 || self.runs.is_empty() {
            return 0.0;
        }
        self.runs[0].inset += shift;
        self.used_width += shift;
        self.adjust_take_back(shift);
        shift
    }
}

fn run_metrics(run: &Run) -> Option<super::run::TextMetrics> {
    match &run.kind {
        RunKind::TextBegin(m) | RunKind::TextEnd(m) => Some(*m),
        RunKind::Characters { style, .. } => Some(style.metrics),
        _ => None,
    }
}

fn text_offset(run: &Run, baseline: f64) -> f64 {
    run_metrics(run)
        .map(|m| baseline - m.baseline_offset())
        .unwrap_or(0.0)
}

impl LayoutArena {
    /// Close a line: trim, justify, level runs and align.
    ///
    /// When the line is right or center aligned, the trailing new-line run of
    /// the previous line in the same region is corrected by the shift, as long
    /// as that line shares the alignment.
    pub fn close_line(&mut self, id: LineId) -> Result<(), LayoutError> {
        if self.line(id).closed {
            return Ok(());
        }
        let line = self.line_mut(id);
        let reason = *line.close_reason.get_or_insert(CloseReason::End);
        line.trim_trailing_space();
        if reason == CloseReason::SoftWrap && line.h_align == HorizontalAlign::Justify {
            line.justify_content();
        }
        let used = line.used_width;
        if let Some(i) = line.new_line_index() {
            line.runs[i].kind = RunKind::NewLine { take_back: used };
        }
        line.ensure_all_runs_on_same_level();
        let shift = match line.h_align {
            HorizontalAlign::Right => line.right_align_content(),
            HorizontalAlign::Center => line.center_align_content(),
            _ => 0.0,
        };
        line.closed = true;

        if shift > 0.0 {
            let align = self.line(id).h_align;
            if let Some(prev) = self.previous_line(id) {
                let prev_line = self.line_mut(prev);
                if prev_line.h_align == align {
                    prev_line.adjust_take_back(-shift);
                }
            }
        }
        Ok(())
    }

    /// The item directly before `id` in its region, when that item is a line.
    pub fn previous_line(&self, id: LineId) -> Option<LineId> {
        let items = &self.region(self.line(id).parent).items;
        let pos = items.iter().position(|i| *i == RegionItem::Line(id))?;
        match pos.checked_sub(1).map(|p| items[p]) {
            Some(RegionItem::Line(prev)) => Some(prev),
            _ => None,
        }
    }

    pub fn add_run(&mut self, line: LineId, run: Run) -> Result<(), LayoutError> {
        let line = self.line_mut(line);
        if line.closed {
            return Err(LayoutError::Closed("line"));
        }
        line.add_run(run);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::layout::run::{TextMetrics, TextStyle};
    use crate::style::{Color, FontSpec};

    fn courier_style() -> Rc<TextStyle> {
        Rc::new(TextStyle {
            font: FontSpec {
                family: "Courier".to_string(),
                size: 10.0,
                ..FontSpec::default()
            },
            color: Color::BLACK,
            metrics: TextMetrics {
                ascent: 6.29,
                descent: 1.57,
                line_height: 12.0,
            },
        })
    }

    fn text_line(full: f64, text: &str) -> Line {
        let style = courier_style();
        let metrics = style.metrics;
        let mut line = Line::new(RegionId(0), Point::ZERO, full, HorizontalAlign::Justify);
        line.add_run(Run::text_begin(metrics));
        line.add_run(Run::characters(
            text.to_string(),
            style,
            text.chars().count() as f64 * 6.0,
            6.0,
        ));
        line.add_run(Run::text_end(metrics));
        line
    }

    #[test]
    fn fit_boundary_is_exclusive() {
        let mut line = Line::new(RegionId(0), Point::ZERO, 100.0, HorizontalAlign::Left);
        line.add_run(Run::spacer(40.0));
        assert!(line.can_fit_width(59.9));
        assert!(!line.can_fit_width(60.0));
        assert!(!line.can_fit_width(60.1));
    }

    #[test]
    fn trims_exactly_one_trailing_space() {
        let mut line = text_line(200.0, "ab  ");
        assert_eq!(line.used_width, 24.0);
        assert_eq!(line.trim_trailing_space(), 6.0);
        assert_eq!(line.used_width, 18.0);
        match &line.runs[1].kind {
            RunKind::Characters { text, .. } => assert_eq!(text, "ab "),
            other => panic!("unexpected run {other:?}"),
        }
    }

    #[test]
    fn justification_fills_the_line() {
        let mut line = text_line(100.0, "aa bb cc ");
        line.trim_trailing_space();
        let natural: f64 = line.runs.iter().map(|r| r.width).sum();
        let inserted = line.justify_content();
        assert!((natural + inserted - 100.0).abs() < 1e-9);
        let total: f64 = line.runs.iter().map(Run::advance).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn justification_without_spaces_uses_character_spacing() {
        let mut line = text_line(50.0, "abcd");
        let inserted = line.justify_content();
        assert!((inserted - 26.0).abs() < 1e-9);
        match &line.runs[1].kind {
            RunKind::Characters { char_spacing, word_spacing, .. } => {
                assert!((char_spacing - 6.5).abs() < 1e-9);
                assert_eq!(*word_spacing, 0.0);
            }
            other => panic!("unexpected run {other:?}"),
        }
    }

    #[test]
    fn simple_line_height_comes_from_text_metrics() {
        let mut line = text_line(100.0, "abc");
        line.ensure_all_runs_on_same_level();
        assert!((line.height - 12.0).abs() < 1e-9);
        assert!((line.baseline - (6.29 + 2.07)).abs() < 1e-9);
    }

    #[test]
    fn tall_baseline_component_raises_the_baseline() {
        let mut line = text_line(200.0, "abc");
        line.add_run(Run::new(
            RunKind::Component(crate::layout::run::InlineContent::Image {
                src: String::new(),
            }),
            20.0,
            30.0,
        ));
        line.ensure_all_runs_on_same_level();
        let descent = 1.57 + 2.07;
        assert!((line.baseline - 30.0).abs() < 1e-9);
        assert!((line.height - (30.0 + descent)).abs() < 1e-9);
        assert!(line.runs[3].offset_y.abs() < 1e-9);
    }

    #[test]
    fn top_aligned_component_does_not_move_the_baseline_down() {
        let mut line = text_line(200.0, "abc");
        line.add_run(
            Run::new(
                RunKind::Component(crate::layout::run::InlineContent::Component {
                    name: "badge".to_string(),
                }),
                10.0,
                5.0,
            )
            .with_v_align(VerticalAlign::Top),
        );
        line.ensure_all_runs_on_same_level();
        assert!((line.height - 12.0).abs() < 1e-9);
        assert!((line.baseline - (12.0 - 1.57 - 2.07)).abs() < 1e-9);
    }

    #[test]
    fn right_alignment_shifts_first_run() {
        let mut line = text_line(100.0, "abcd");
        line.h_align = HorizontalAlign::Right;
        let shift = line.right_align_content();
        assert_eq!(shift, 76.0);
        assert_eq!(line.runs[0].inset, 76.0);
        assert_eq!(line.used_width, 100.0);
    }
}
