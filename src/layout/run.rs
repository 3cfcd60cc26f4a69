//! Inline runs: the atomic units a line is made of.

use std::rc::Rc;

use crate::style::{Color, FontSpec, PositionMode, VerticalAlign};

use super::arena::RegionId;

/// Vertical metrics of one font at one size, including leading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub line_height: f64,
}

impl TextMetrics {
    pub fn half_leading(&self) -> f64 {
        (self.line_height - (self.ascent + self.descent)) / 2.0
    }

    /// Distance from the top of the line box to the baseline.
    pub fn baseline_offset(&self) -> f64 {
        self.ascent + self.half_leading()
    }

    /// Distance from the baseline to the bottom of the line box.
    pub fn below_baseline(&self) -> f64 {
        self.descent + self.half_leading()
    }
}

/// Style shared by every characters run cut from the same text op.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: FontSpec,
    pub color: Color,
    pub metrics: TextMetrics,
}

/// Content of an inline component run.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Image { src: String },
    Path { data: String },
    Component { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunKind {
    TextBegin(TextMetrics),
    Characters {
        text: String,
        style: Rc<TextStyle>,
        /// Width of one space in this run, used for trailing-space trimming.
        space_width: f64,
        /// Extra space after every space, set by justification.
        word_spacing: f64,
        /// Extra space after every character, set by justification.
        char_spacing: f64,
    },
    TextEnd(TextMetrics),
    Spacer,
    /// End-of-line marker. `take_back` is the horizontal distance from the
    /// end of this line's content back to the start of the next line.
    NewLine {
        take_back: f64,
    },
    Component(InlineContent),
    /// Placeholder linking a positioned region back into the flow.
    Positioned {
        region: RegionId,
        mode: PositionMode,
        floating: bool,
    },
    InlineBegin,
    InlineEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub kind: RunKind,
    /// Horizontal gap before the run.
    pub inset: f64,
    /// Natural width, excluding justification spacing.
    pub width: f64,
    pub height: f64,
    pub v_align: VerticalAlign,
    /// Top of the run within the line, set when the line closes.
    pub offset_y: f64,
}

impl Run {
    pub fn new(kind: RunKind, width: f64, height: f64) -> Self {
        Self {
            kind,
            inset: 0.0,
            width,
            height,
            v_align: VerticalAlign::Baseline,
            offset_y: 0.0,
        }
    }

    pub fn text_begin(metrics: TextMetrics) -> Self {
        Self::new(RunKind::TextBegin(metrics), 0.0, metrics.line_height)
    }

    pub fn text_end(metrics: TextMetrics) -> Self {
        Self::new(RunKind::TextEnd(metrics), 0.0, metrics.line_height)
    }

    pub fn characters(text: String, style: Rc<TextStyle>, width: f64, space_width: f64) -> Self {
        let height = style.metrics.line_height;
        Self::new(
            RunKind::Characters {
                text,
                style,
                space_width,
                word_spacing: 0.0,
                char_spacing: 0.0,
            },
            width,
            height,
        )
    }

    pub fn spacer(width: f64) -> Self {
        Self::new(RunKind::Spacer, width, 0.0)
    }

    pub fn new_line(take_back: f64) -> Self {
        Self::new(RunKind::NewLine { take_back }, 0.0, 0.0)
    }

    pub fn with_v_align(mut self, v_align: VerticalAlign) -> Self {
        self.v_align = v_align;
        self
    }

    /// Width inserted by justification.
    pub fn inserted_width(&self) -> f64 {
        match &self.kind {
            RunKind::Characters {
                text,
                word_spacing,
                char_spacing,
                ..
            } => {
                let spaces = text.chars().filter(|c| *c == ' ').count() as f64;
                let chars = text.chars().count() as f64;
                spaces * word_spacing + chars * char_spacing
            }
            _ => 0.0,
        }
    }

    /// Horizontal space the run takes, inset included.
    pub fn advance(&self) -> f64 {
        self.inset + self.width + self.inserted_width()
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self.kind,
            RunKind::TextBegin(_) | RunKind::Characters { .. } | RunKind::TextEnd(_)
        )
    }

    /// Runs that are not text and take part in line height.
    pub fn is_flow_object(&self) -> bool {
        match &self.kind {
            RunKind::Component(_) => true,
            RunKind::Positioned { mode, floating, .. } => {
                !floating && matches!(mode, PositionMode::Relative | PositionMode::InlineBlock)
            }
            _ => false,
        }
    }

    /// Whether the run puts visible content on the line.
    pub fn is_content(&self) -> bool {
        match &self.kind {
            RunKind::Characters { text, .. } => !text.is_empty(),
            RunKind::Spacer | RunKind::NewLine { .. } => false,
            RunKind::TextBegin(_) | RunKind::TextEnd(_) => false,
            RunKind::InlineBegin | RunKind::InlineEnd => false,
            RunKind::Component(_) => true,
            RunKind::Positioned { .. } => self.is_flow_object(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_split_leading_evenly() {
        let m = TextMetrics {
            ascent: 6.29,
            descent: 1.57,
            line_height: 12.0,
        };
        assert!((m.baseline_offset() + m.below_baseline() - 12.0).abs() < 1e-9);
        assert!((m.half_leading() - 2.07).abs() < 1e-9);
    }

    #[test]
    fn advance_includes_justification() {
        let style = Rc::new(TextStyle {
            font: FontSpec::default(),
            color: Color::BLACK,
            metrics: TextMetrics {
                ascent: 8.0,
                descent: 2.0,
                line_height: 12.0,
            },
        });
        let mut run = Run::characters("a b c".to_string(), style, 30.0, 6.0);
        if let RunKind::Characters { word_spacing, .. } = &mut run.kind {
            *word_spacing = 2.5;
        }
        run.inset = 1.0;
        assert_eq!(run.inserted_width(), 5.0);
        assert_eq!(run.advance(), 36.0);
    }
}
