//! # Document Model
//!
//! The read-only content tree the layout engine consumes. A document is a
//! tree of nodes, each with a kind, a raw style, and children. It is easy to
//! produce from a markup front end or to write directly as JSON.
//!
//! The engine only asks nodes narrow questions: what are your children, are
//! you text, an image, a path, a viewport, a layout break, an invisible
//! container, or a self-rendering component.

use crate::geometry::Edges;
use crate::style::Style;
use serde::{Deserialize, Serialize};

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Top-level content, laid out into the page content block.
    pub children: Vec<Node>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Page size and margins for every page.
    #[serde(default)]
    pub default_page: PageConfig,

    /// Root style every top-level node inherits from.
    #[serde(default)]
    pub style: Style,

    /// Repeated at the top of every page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Node>,

    /// Repeated at the bottom of every page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<Node>,

    /// Custom fonts to register before layout.
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

/// A custom font to register with the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    pub family: String,
    /// Base64-encoded font data, or a data URI.
    pub src: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u32 {
    400
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Configuration for a page: size and margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default)]
    pub size: PageSize,

    #[serde(default)]
    pub margin: Edges,

    /// Whether content that overflows the page continues on a new page.
    #[serde(default = "default_true")]
    pub wrap: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: Edges::uniform(54.0), // ~0.75 inch
            wrap: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// A node in the content tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub kind: NodeKind,

    #[serde(default)]
    pub style: Style,

    #[serde(default)]
    pub children: Vec<Node>,

    /// Identifier used in error messages and placement callbacks.
    #[serde(default)]
    pub id: Option<String>,

    /// Shared style identifier. Nodes with the same identifier under the same
    /// parent resolve their style once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<String>,

    /// Registers an outline artefact targeting this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,

    /// Registers a link artefact covering this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// The different kinds of nodes in the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// A generic block container.
    View,
    /// A container drawn with its own background and border.
    Panel,
    /// An inline container that adds no box of its own.
    Span,
    /// Inline text.
    Text {
        #[serde(default)]
        content: String,
        /// Styled spans. When non-empty, `content` is ignored.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        spans: Vec<TextSpan>,
    },
    /// An image, sized explicitly or from its intrinsic pixel size.
    Image {
        src: String,
        width: Option<f64>,
        height: Option<f64>,
    },
    /// Vector path data drawn into a box of the given size.
    Path {
        width: f64,
        height: f64,
        #[serde(default)]
        data: String,
    },
    /// A component that renders itself into a box of the given size.
    Component {
        name: String,
        width: f64,
        height: f64,
    },
    /// A fixed-size container whose content is clipped and never paginated.
    Viewport { width: f64, height: f64 },
    Table,
    TableRow {
        /// Replayed at the top of every continuation of the table.
        #[serde(default)]
        repeat_at_top: bool,
    },
    TableCell {
        #[serde(default = "default_span")]
        col_span: i32,
    },
    List,
    ListItem,
    /// An explicit page, column or line break.
    Break { kind: BreakNodeKind },
}

fn default_span() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakNodeKind {
    Page,
    Column,
    Line,
}

/// A styled span within a Text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpan {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// A pre-measured width. The span is placed as one unbreakable run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_width: Option<f64>,
}

impl Node {
    fn bare(kind: NodeKind, style: Style, children: Vec<Node>) -> Self {
        Self {
            kind,
            style,
            children,
            id: None,
            style_id: None,
            bookmark: None,
            href: None,
        }
    }

    /// Create a View node with children.
    pub fn view(style: Style, children: Vec<Node>) -> Self {
        Self::bare(NodeKind::View, style, children)
    }

    /// Create a Text node.
    pub fn text(content: &str, style: Style) -> Self {
        Self::bare(
            NodeKind::Text {
                content: content.to_string(),
                spans: vec![],
            },
            style,
            vec![],
        )
    }

    pub fn image(src: &str, width: Option<f64>, height: Option<f64>, style: Style) -> Self {
        Self::bare(
            NodeKind::Image {
                src: src.to_string(),
                width,
                height,
            },
            style,
            vec![],
        )
    }

    pub fn component(name: &str, width: f64, height: f64, style: Style) -> Self {
        Self::bare(
            NodeKind::Component {
                name: name.to_string(),
                width,
                height,
            },
            style,
            vec![],
        )
    }

    pub fn table(style: Style, rows: Vec<Node>) -> Self {
        Self::bare(NodeKind::Table, style, rows)
    }

    pub fn row(repeat_at_top: bool, style: Style, cells: Vec<Node>) -> Self {
        Self::bare(NodeKind::TableRow { repeat_at_top }, style, cells)
    }

    pub fn cell(col_span: i32, style: Style, children: Vec<Node>) -> Self {
        Self::bare(NodeKind::TableCell { col_span }, style, children)
    }

    pub fn list(style: Style, items: Vec<Node>) -> Self {
        Self::bare(NodeKind::List, style, items)
    }

    pub fn list_item(style: Style, children: Vec<Node>) -> Self {
        Self::bare(NodeKind::ListItem, style, children)
    }

    pub fn span(style: Style, children: Vec<Node>) -> Self {
        Self::bare(NodeKind::Span, style, children)
    }

    pub fn break_node(kind: BreakNodeKind) -> Self {
        Self::bare(NodeKind::Break { kind }, Style::default(), vec![])
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_style_id(mut self, id: &str) -> Self {
        self.style_id = Some(id.to_string());
        self
    }

    /// Identifier for diagnostics: the explicit id, or the kind name.
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.kind_name().to_string(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::View => "View",
            NodeKind::Panel => "Panel",
            NodeKind::Span => "Span",
            NodeKind::Text { .. } => "Text",
            NodeKind::Image { .. } => "Image",
            NodeKind::Path { .. } => "Path",
            NodeKind::Component { .. } => "Component",
            NodeKind::Viewport { .. } => "Viewport",
            NodeKind::Table => "Table",
            NodeKind::TableRow { .. } => "TableRow",
            NodeKind::TableCell { .. } => "TableCell",
            NodeKind::List => "List",
            NodeKind::ListItem => "ListItem",
            NodeKind::Break { .. } => "Break",
        }
    }

    // ── Capability checks ───────────────────────────────────────

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, NodeKind::Image { .. })
    }

    pub fn is_path(&self) -> bool {
        matches!(self.kind, NodeKind::Path { .. })
    }

    pub fn is_viewport(&self) -> bool {
        matches!(self.kind, NodeKind::Viewport { .. })
    }

    pub fn is_layout_break(&self) -> bool {
        matches!(self.kind, NodeKind::Break { .. })
    }

    pub fn is_invisible_container(&self) -> bool {
        matches!(self.kind, NodeKind::Span)
    }

    pub fn is_self_rendering(&self) -> bool {
        matches!(self.kind, NodeKind::Component { .. })
    }
}
