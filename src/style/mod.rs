//! # Style System
//!
//! The layout engine never runs a cascade. Each node carries a raw [`Style`]
//! (every property optional), which is resolved against the parent's
//! [`ResolvedStyle`] into concrete values grouped the way the engine consumes
//! them: position options, text options, column options, and the visual
//! descriptors handed through to the renderer.
//!
//! Text properties inherit; box properties do not.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::geometry::Edges;

/// The complete set of style properties for a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    // ── Box Model ──────────────────────────────────────────────
    /// Explicit border-box width.
    pub width: Option<Dimension>,
    /// Explicit border-box height.
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub min_height: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,
    #[serde(default)]
    pub padding: Option<Edges>,
    #[serde(default)]
    pub margin: Option<Edges>,
    /// Stretch the block to the available width instead of shrinking to content.
    pub fill_width: Option<bool>,

    // ── Positioning ─────────────────────────────────────────────
    pub position: Option<PositionMode>,
    pub float: Option<FloatMode>,
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub overflow: Option<OverflowAction>,
    pub overflow_split: Option<OverflowSplit>,
    pub transform: Option<Transform>,
    pub clip_inset: Option<Edges>,
    /// Render the block into its own self-contained stream.
    pub isolated: Option<bool>,
    /// `false` hides the node and everything below it.
    pub visible: Option<bool>,
    pub break_before: Option<BreakKind>,
    pub horizontal_align: Option<HorizontalAlign>,
    pub vertical_align: Option<VerticalAlign>,

    // ── Columns ─────────────────────────────────────────────────
    pub column_count: Option<u32>,
    pub column_gap: Option<f64>,
    pub column_widths: Option<ColumnWidths>,
    pub column_auto_flow: Option<bool>,

    // ── Typography ─────────────────────────────────────────────
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<u32>,
    pub font_style: Option<FontStyle>,
    /// Line height as a multiplier of font size.
    pub line_height: Option<f64>,
    pub first_line_inset: Option<f64>,
    pub word_spacing: Option<f64>,
    pub letter_spacing: Option<f64>,
    pub wrap: Option<WrapMode>,

    // ── Color & Border ─────────────────────────────────────────
    pub color: Option<Color>,
    pub background_color: Option<Color>,
    pub border_width: Option<Edges>,
    pub border_color: Option<Color>,

    // ── Lists ───────────────────────────────────────────────────
    pub list_style: Option<ListStyle>,
    pub list_inset: Option<f64>,

    // ── Generated content ───────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Box<PseudoStyle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Box<PseudoStyle>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counter_reset: Vec<CounterDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counter_increment: Vec<CounterDecl>,
}

/// A dimension that can be points, percentage, or auto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Dimension {
    Pt(f64),
    /// Percentage of the parent's corresponding dimension.
    Percent(f64),
    Auto,
}

impl Dimension {
    /// Resolve this dimension given a parent size. Returns None for Auto.
    pub fn resolve(&self, parent_size: f64) -> Option<f64> {
        match self {
            Dimension::Pt(v) => Some(*v),
            Dimension::Percent(p) => Some(parent_size * p / 100.0),
            Dimension::Auto => None,
        }
    }
}

/// Heights only resolve from points. Flow content has no definite
/// containing height, so a percentage is dropped.
fn definite_height(dimension: Option<Dimension>, property: &str) -> Option<f64> {
    match dimension? {
        Dimension::Percent(p) => {
            log::warn!("{property}: {p}% has no definite containing height; ignored");
            None
        }
        other => other.resolve(0.0),
    }
}

/// How a node participates in flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionMode {
    #[default]
    Block,
    Inline,
    InlineBlock,
    Relative,
    Absolute,
    Fixed,
}

impl PositionMode {
    /// Whether a node with this mode is laid out in its own positioned region.
    pub fn is_positioned(&self) -> bool {
        matches!(
            self,
            PositionMode::Relative
                | PositionMode::Absolute
                | PositionMode::Fixed
                | PositionMode::InlineBlock
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatMode {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowAction {
    #[default]
    Visible,
    Clip,
    Truncate,
    NewPage,
}

/// Whether a block's content may be divided across region boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowSplit {
    #[default]
    Any,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakKind {
    Page,
    Column,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
    #[default]
    Baseline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapMode {
    #[default]
    Word,
    Character,
    NoWrap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListStyle {
    #[default]
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
    Disc,
    None,
}

/// How a multi-column block divides its width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnWidths {
    Equal,
    /// Percentages of the available width, one per column.
    Percent(Vec<f64>),
    /// Widths in points, one per column.
    Explicit(Vec<f64>),
}

/// Rotation and scale are applied around the block's centre, then translated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    #[serde(default)]
    pub rotate: f64,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    #[serde(default)]
    pub translate_x: f64,
    #[serde(default)]
    pub translate_y: f64,
}

impl Transform {
    pub fn is_translation_only(&self) -> bool {
        self.rotate == 0.0
            && self.scale_x.unwrap_or(1.0) == 1.0
            && self.scale_y.unwrap_or(1.0) == 1.0
    }
}

/// A `name value` pair from a counter-reset or counter-increment declaration.
///
/// A missing value means 0 for a reset and 1 for an increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterDecl {
    pub name: String,
    #[serde(default)]
    pub value: Option<i32>,
}

/// Style and generated content of a `::before` or `::after` pseudo-state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PseudoStyle {
    #[serde(default)]
    pub content: Vec<PseudoContent>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub counter_reset: Vec<CounterDecl>,
    #[serde(default)]
    pub counter_increment: Vec<CounterDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PseudoContent {
    Text(String),
    /// The current value of a named counter.
    Counter(String),
    Image {
        src: String,
        width: Option<f64>,
        height: Option<f64>,
    },
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0) as f64 / 255.0;
        match hex.len() {
            3 => Self::rgb(
                channel(&hex[0..1].repeat(2)),
                channel(&hex[1..2].repeat(2)),
                channel(&hex[2..3].repeat(2)),
            ),
            6 => Self::rgb(channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
            _ => Self::BLACK,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

// ── Resolved style ─────────────────────────────────────────────

/// Font selection as consumed by the measurer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: u32,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Helvetica".to_string(),
            size: 12.0,
            weight: 400,
            italic: false,
        }
    }
}

/// Box and positioning options.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOptions {
    pub mode: PositionMode,
    pub float: FloatMode,
    pub margin: Edges,
    pub padding: Edges,
    pub border_width: Edges,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub fill_width: bool,
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub overflow_action: OverflowAction,
    pub overflow_split: OverflowSplit,
    pub transform: Option<Transform>,
    pub clip_inset: Edges,
    pub isolated: bool,
    pub h_align: HorizontalAlign,
    pub v_align: VerticalAlign,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            mode: PositionMode::Block,
            float: FloatMode::None,
            margin: Edges::default(),
            padding: Edges::default(),
            border_width: Edges::default(),
            width: None,
            height: None,
            min_width: 0.0,
            min_height: 0.0,
            max_width: f64::INFINITY,
            max_height: f64::INFINITY,
            fill_width: false,
            top: None,
            right: None,
            bottom: None,
            left: None,
            overflow_action: OverflowAction::Visible,
            overflow_split: OverflowSplit::Any,
            transform: None,
            clip_inset: Edges::default(),
            isolated: false,
            h_align: HorizontalAlign::Left,
            v_align: VerticalAlign::Baseline,
        }
    }
}

impl PositionOptions {
    /// Margin, border and padding combined.
    pub fn outer_edges(&self) -> Edges {
        self.margin.add(&self.border_width).add(&self.padding)
    }

    /// Border and padding only.
    pub fn inner_edges(&self) -> Edges {
        self.border_width.add(&self.padding)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub font: FontSpec,
    /// Line height multiplier.
    pub leading: f64,
    pub first_line_inset: f64,
    pub word_spacing: Option<f64>,
    pub char_spacing: Option<f64>,
    pub wrap: WrapMode,
    pub color: Color,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font: FontSpec::default(),
            leading: 1.2,
            first_line_inset: 0.0,
            word_spacing: None,
            char_spacing: None,
            wrap: WrapMode::Word,
            color: Color::BLACK,
        }
    }
}

impl TextOptions {
    pub fn line_height(&self) -> f64 {
        self.font.size * self.leading
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOptions {
    pub count: u32,
    pub alley_width: f64,
    pub widths: ColumnWidths,
    pub auto_flow: bool,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            count: 1,
            alley_width: 0.0,
            widths: ColumnWidths::Equal,
            auto_flow: true,
        }
    }
}

/// Background and border descriptors, passed to the renderer untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualOptions {
    pub background: Option<Color>,
    pub border_color: Color,
    pub border_width: Edges,
}

/// Resolved style: concrete values grouped per concern.
#[derive(Debug, Clone, Default)]
pub struct ResolvedStyle {
    pub invisible: bool,
    pub position: PositionOptions,
    pub text: TextOptions,
    pub columns: ColumnOptions,
    pub visual: VisualOptions,
    pub break_before: Option<BreakKind>,
    pub list_style: ListStyle,
    pub list_inset: Option<f64>,
    pub before: Option<Box<PseudoStyle>>,
    pub after: Option<Box<PseudoStyle>>,
    pub counter_reset: Vec<CounterDecl>,
    pub counter_increment: Vec<CounterDecl>,
    /// Identifier this style was cached under, if any.
    pub cache_key: Option<String>,
}

impl Style {
    /// Resolve this style against a parent's resolved style and available width.
    pub fn resolve(&self, parent: Option<&ResolvedStyle>, available_width: f64) -> ResolvedStyle {
        let parent_text = parent.map(|p| p.text.clone()).unwrap_or_default();
        let parent_align = parent
            .map(|p| p.position.h_align)
            .unwrap_or(HorizontalAlign::Left);
        let parent_list = parent.map(|p| p.list_style).unwrap_or_default();

        let border_width = self.border_width.unwrap_or_default();
        let font = FontSpec {
            family: self
                .font_family
                .clone()
                .unwrap_or(parent_text.font.family.clone()),
            size: self.font_size.unwrap_or(parent_text.font.size),
            weight: self.font_weight.unwrap_or(parent_text.font.weight),
            italic: self
                .font_style
                .map(|s| !matches!(s, FontStyle::Normal))
                .unwrap_or(parent_text.font.italic),
        };

        ResolvedStyle {
            invisible: self.visible == Some(false),
            position: PositionOptions {
                mode: self.position.unwrap_or_default(),
                float: self.float.unwrap_or_default(),
                margin: self.margin.unwrap_or_default(),
                padding: self.padding.unwrap_or_default(),
                border_width,
                width: self.width.and_then(|d| d.resolve(available_width)),
                height: definite_height(self.height, "height"),
                min_width: self
                    .min_width
                    .and_then(|d| d.resolve(available_width))
                    .unwrap_or(0.0),
                min_height: definite_height(self.min_height, "min-height").unwrap_or(0.0),
                max_width: self
                    .max_width
                    .and_then(|d| d.resolve(available_width))
                    .unwrap_or(f64::INFINITY),
                max_height: definite_height(self.max_height, "max-height")
                    .unwrap_or(f64::INFINITY),
                fill_width: self.fill_width.unwrap_or(false),
                top: self.top,
                right: self.right,
                bottom: self.bottom,
                left: self.left,
                overflow_action: self.overflow.unwrap_or_default(),
                overflow_split: self.overflow_split.unwrap_or_default(),
                transform: self.transform,
                clip_inset: self.clip_inset.unwrap_or_default(),
                isolated: self.isolated.unwrap_or(false),
                h_align: self.horizontal_align.unwrap_or(parent_align),
                v_align: self.vertical_align.unwrap_or_default(),
            },
            text: TextOptions {
                font,
                leading: self.line_height.unwrap_or(parent_text.leading),
                first_line_inset: self.first_line_inset.unwrap_or(0.0),
                word_spacing: self.word_spacing.or(parent_text.word_spacing),
                char_spacing: self.letter_spacing.or(parent_text.char_spacing),
                wrap: self.wrap.unwrap_or(parent_text.wrap),
                color: self.color.unwrap_or(parent_text.color),
            },
            columns: ColumnOptions {
                count: self.column_count.unwrap_or(1).max(1),
                alley_width: self.column_gap.unwrap_or(0.0),
                widths: self.column_widths.clone().unwrap_or(ColumnWidths::Equal),
                auto_flow: self.column_auto_flow.unwrap_or(true),
            },
            visual: VisualOptions {
                background: self.background_color,
                border_color: self.border_color.unwrap_or(Color::BLACK),
                border_width,
            },
            break_before: self.break_before,
            list_style: self.list_style.unwrap_or(parent_list),
            list_inset: self.list_inset,
            before: self.before.clone(),
            after: self.after.clone(),
            counter_reset: self.counter_reset.clone(),
            counter_increment: self.counter_increment.clone(),
            cache_key: None,
        }
    }
}

/// Resolved styles keyed by a node's style identifier and its parent's key.
///
/// Repeated rows and cells that share an identifier resolve once.
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: HashMap<String, Rc<ResolvedStyle>>,
    hits: usize,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached style for `style_id` under `parent`, resolving on a miss.
    ///
    /// Nodes without an identifier, or under a parent that was not cached,
    /// always resolve fresh.
    pub fn resolve(
        &mut self,
        style: &Style,
        style_id: Option<&str>,
        parent: &ResolvedStyle,
        available_width: f64,
    ) -> Rc<ResolvedStyle> {
        let key = match (style_id, parent.cache_key.as_deref()) {
            (Some(id), Some(parent_key)) => {
                format!("{parent_key}/{id}@{available_width:.3}")
            }
            _ => return Rc::new(style.resolve(Some(parent), available_width)),
        };
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return Rc::clone(hit);
        }
        let mut resolved = style.resolve(Some(parent), available_width);
        resolved.cache_key = Some(key.clone());
        let resolved = Rc::new(resolved);
        self.entries.insert(key, Rc::clone(&resolved));
        resolved
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_options_inherit_box_options_do_not() {
        let parent = Style {
            font_size: Some(20.0),
            padding: Some(Edges::uniform(5.0)),
            horizontal_align: Some(HorizontalAlign::Right),
            ..Default::default()
        }
        .resolve(None, 500.0);
        let child = Style::default().resolve(Some(&parent), 500.0);
        assert_eq!(child.text.font.size, 20.0);
        assert_eq!(child.position.h_align, HorizontalAlign::Right);
        assert_eq!(child.position.padding, Edges::default());
    }

    #[test]
    fn percent_width_resolves_against_available() {
        let s = Style {
            width: Some(Dimension::Percent(50.0)),
            ..Default::default()
        }
        .resolve(None, 300.0);
        assert_eq!(s.position.width, Some(150.0));
    }

    #[test]
    fn percent_heights_are_ignored() {
        let s = Style {
            height: Some(Dimension::Percent(50.0)),
            max_height: Some(Dimension::Percent(20.0)),
            min_height: Some(Dimension::Pt(12.0)),
            ..Default::default()
        }
        .resolve(None, 300.0);
        assert_eq!(s.position.height, None);
        assert_eq!(s.position.max_height, f64::INFINITY);
        assert_eq!(s.position.min_height, 12.0);
    }

    #[test]
    fn hidden_style_is_invisible() {
        let s = Style {
            visible: Some(false),
            ..Default::default()
        }
        .resolve(None, 100.0);
        assert!(s.invisible);
    }

    #[test]
    fn style_cache_reuses_identified_styles() {
        let mut cache = StyleCache::new();
        let parent = ResolvedStyle {
            cache_key: Some(String::new()),
            ..Default::default()
        };
        let style = Style {
            font_size: Some(9.0),
            ..Default::default()
        };
        let a = cache.resolve(&style, Some("cell"), &parent, 100.0);
        let b = cache.resolve(&style, Some("cell"), &parent, 100.0);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.hits(), 1);
        let c = cache.resolve(&style, None, &parent, 100.0);
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn color_hex_short_and_long() {
        assert_eq!(Color::hex("#fff"), Color::rgb(1.0, 1.0, 1.0));
        assert_eq!(Color::hex("000000"), Color::BLACK);
    }
}
