//! Serialized form of a rule set.
//!
//! A document is the on-disk description of one language:
//!
//! ```json
//! {
//!   "name": "python",
//!   "extensions": ["py"],
//!   "formats": {
//!     "keyword": { "foreground": "#569cd6", "bold": true },
//!     "comment": { "foreground": "#6a9955", "italic": true }
//!   },
//!   "rules": [
//!     { "pattern": "#.*", "format": "comment" },
//!     { "pattern": "\\b(def|pass)\\b", "format": "keyword" }
//!   ]
//! }
//! ```
//!
//! Documents are validated and compiled into a [`RuleSet`](super::RuleSet);
//! they are never consulted during tokenization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SyntaxError, SyntaxResult};

/// Top-level rule set document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetDocument {
    /// Language name.
    pub name: String,
    /// File extensions (without the dot) this language applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Format applied to text no rule claims. Plain text when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Named formats.
    pub formats: BTreeMap<String, FormatDocument>,
    /// Ordered rules; earlier rules take precedence.
    pub rules: Vec<RuleDocument>,
}

/// A named format entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDocument {
    /// Foreground color as a hex string.
    pub foreground: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// A single pattern rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Regular expression source.
    pub pattern: String,
    /// Name of the format applied to matches.
    pub format: String,
    /// Capture group whose range is claimed; 0 claims the whole match.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub group: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl RuleSetDocument {
    /// Parse a JSON document.
    pub fn from_json(source: &str) -> SyntaxResult<Self> {
        serde_json::from_str(source).map_err(|e| SyntaxError::document(e.to_string()))
    }

    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> SyntaxResult<Self> {
        toml::from_str(source).map_err(|e| SyntaxError::document(e.to_string()))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> SyntaxResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SyntaxError::document(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_optional_fields() {
        let doc = RuleSetDocument::from_json(
            r##"{
                "name": "mini",
                "formats": { "kw": { "foreground": "#fff" } },
                "rules": [ { "pattern": "\\bif\\b", "format": "kw" } ]
            }"##,
        )
        .unwrap();

        assert_eq!(doc.name, "mini");
        assert!(doc.extensions.is_empty());
        assert_eq!(doc.default, None);
        assert!(!doc.formats["kw"].bold);
        assert_eq!(doc.rules[0].group, 0);
    }

    #[test]
    fn parses_toml() {
        let doc = RuleSetDocument::from_toml(
            r##"
name = "mini"
extensions = ["mi"]

[formats.kw]
foreground = "#ff0000"
italic = true

[[rules]]
pattern = '(\w+)\('
format = "kw"
group = 1
"##,
        )
        .unwrap();

        assert_eq!(doc.extensions, vec!["mi".to_string()]);
        assert!(doc.formats["kw"].italic);
        assert_eq!(doc.rules[0].group, 1);
    }

    #[test]
    fn malformed_document_is_reported() {
        let err = RuleSetDocument::from_json(r#"{ "name": "x", "rules": [] }"#).unwrap_err();
        assert!(matches!(err, SyntaxError::Document { .. }));
        assert!(err.to_string().contains("formats"));
    }

    #[test]
    fn json_round_trip_keeps_rules() {
        let doc = RuleSetDocument {
            name: "x".into(),
            extensions: vec![],
            default: None,
            formats: BTreeMap::from([(
                "kw".to_string(),
                FormatDocument {
                    foreground: "#123456".into(),
                    bold: true,
                    italic: false,
                },
            )]),
            rules: vec![RuleDocument {
                pattern: "a+".into(),
                format: "kw".into(),
                group: 0,
            }],
        };

        let json = doc.to_json().unwrap();
        assert!(!json.contains("group"));
        assert_eq!(RuleSetDocument::from_json(&json).unwrap(), doc);
    }
}
