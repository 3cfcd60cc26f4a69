//! Structured error types.
//!
//! [`LayoutError`] is the engine's fatal channel: malformed input and broken
//! structural invariants. Running out of space is not an error; the engine
//! reports it through the context's continue flag.
//!
//! [`QuireError`] is what the public entry points return, separating input
//! parsing, font loading and layout failures.

use thiserror::Error;

/// A fatal or strict-mode layout failure.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("column span must be at least 1, found {span}")]
    InvalidColumnSpan { span: i32 },

    #[error("a block cannot be started in inline mode")]
    InlineBlockMode,

    #[error("a transformed region must contain exactly one block, found {count} items")]
    InvalidTransformContent { count: usize },

    #[error("transform is not supported on {kind} content")]
    UnsupportedTransform { kind: &'static str },

    #[error("positioned region moved to another page and can no longer be measured")]
    PositionedRegionMoved,

    #[error("cannot add content to a closed {0}")]
    Closed(&'static str),

    #[error("expected {expected} as the last region item, found {found}")]
    UnexpectedItem { expected: String, found: String },

    #[error("no open block to lay out into")]
    NoCurrentBlock,

    #[error("layout of component '{component}' failed: {source}")]
    Component {
        component: String,
        #[source]
        source: Box<LayoutError>,
    },
}

impl LayoutError {
    /// Attach a component identifier, unless one is already attached.
    pub fn in_component(self, component: String) -> LayoutError {
        match self {
            LayoutError::Component { .. } => self,
            other => LayoutError::Component {
                component,
                source: Box::new(other),
            },
        }
    }
}

/// The unified error type returned by the public API.
#[derive(Debug, Error)]
pub enum QuireError {
    #[error("failed to parse document: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    #[error("font error: {0}")]
    Font(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the document schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Parse { source: e, hint }
    }
}
