//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, QuireError};

/// How recoverable inconsistencies are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conformance {
    /// Raise every inconsistency as an error.
    Strict,
    /// Log the inconsistency and fall back to a safe default.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub conformance: Conformance,

    /// Consecutive zero-progress line breaks the text engine tolerates
    /// before it gives up on a run.
    ///
    /// Defaults to `3`.
    pub zero_fit_guard: u32,

    /// Upper bound on pages created by one layout pass.
    ///
    /// Defaults to `10000`.
    pub max_pages: usize,

    /// Label column width for list items that do not declare one.
    ///
    /// Defaults to `30`.
    pub default_list_inset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            conformance: Conformance::Lenient,
            zero_fit_guard: 3,
            max_pages: 10_000,
            default_list_inset: 30.0,
        }
    }
}

impl LayoutConfig {
    pub fn strict() -> Self {
        Self {
            conformance: Conformance::Strict,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, QuireError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Raise `err` under strict conformance, log it and carry on otherwise.
    pub fn lenient(&self, err: LayoutError) -> Result<(), LayoutError> {
        match self.conformance {
            Conformance::Strict => Err(err),
            Conformance::Lenient => {
                log::warn!("{err}; continuing (lenient conformance)");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = LayoutConfig::from_json(r#"{ "conformance": "Strict" }"#).unwrap();
        assert_eq!(cfg.conformance, Conformance::Strict);
        assert_eq!(cfg.zero_fit_guard, 3);
    }

    #[test]
    fn lenient_swallows_strict_raises() {
        let err = || LayoutError::UnsupportedTransform { kind: "Text" };
        assert!(LayoutConfig::default().lenient(err()).is_ok());
        assert!(LayoutConfig::strict().lenient(err()).is_err());
    }
}
