//! Compiled, immutable rule sets.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use tracing::debug;

use super::document::{FormatDocument, RuleSetDocument};
use crate::error::{SyntaxError, SyntaxResult};
use crate::format::{Format, FormatId, Rgba};

/// Source of process-unique rule set versions.
static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Maximum number of formats a rule set may define.
pub const MAX_FORMATS: usize = u16::MAX as usize;

/// A compiled pattern rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    format: FormatId,
    group: usize,
}

impl Rule {
    /// The compiled pattern.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// The format applied to claimed ranges.
    pub fn format(&self) -> FormatId {
        self.format
    }

    /// Capture group claimed by this rule (0 for the whole match).
    pub fn group(&self) -> usize {
        self.group
    }
}

/// A named entry in the format table.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFormat {
    pub name: String,
    pub format: Format,
}

/// Ordered rules plus named formats for one language.
///
/// A rule set is loaded once and shared (usually as `Arc<RuleSet>`). Every
/// rule refers to a format that exists; this is checked when the rule set is
/// built, so tokenization has no failure path.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    extensions: Vec<String>,
    rules: Vec<Rule>,
    formats: Vec<NamedFormat>,
    default_format: Format,
    version: u64,
}

impl RuleSet {
    /// The rule set used when no language applies: no rules, plain text.
    pub fn plain() -> Self {
        Self {
            name: "plain".to_string(),
            extensions: Vec::new(),
            rules: Vec::new(),
            formats: Vec::new(),
            default_format: Format::default(),
            version: NEXT_VERSION.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Start building a rule set in code.
    pub fn builder(name: impl Into<String>) -> RuleSetBuilder {
        RuleSetBuilder::new(name)
    }

    /// Compile a parsed document.
    pub fn from_document(doc: &RuleSetDocument) -> SyntaxResult<Self> {
        let mut builder = RuleSetBuilder::new(doc.name.clone());
        builder.extensions = doc.extensions.clone();
        builder.default = doc.default.clone();

        for (name, entry) in &doc.formats {
            builder.formats.push(NamedFormat {
                name: name.clone(),
                format: parse_format(name, entry)?,
            });
        }
        for rule in &doc.rules {
            builder.rules.push(PendingRule {
                pattern: rule.pattern.clone(),
                format: rule.format.clone(),
                group: rule.group,
            });
        }

        builder.build()
    }

    /// Parse and compile a JSON document.
    pub fn from_json(source: &str) -> SyntaxResult<Self> {
        Self::from_document(&RuleSetDocument::from_json(source)?)
    }

    /// Parse and compile a TOML document.
    pub fn from_toml(source: &str) -> SyntaxResult<Self> {
        Self::from_document(&RuleSetDocument::from_toml(source)?)
    }

    /// Load a rule set file. Files ending in `.toml` are read as TOML,
    /// everything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> SyntaxResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SyntaxError::io(path, e))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Language name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File extensions this language applies to.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Rules in precedence order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// All named formats.
    pub fn formats(&self) -> &[NamedFormat] {
        &self.formats
    }

    /// Format applied to text no rule claims.
    pub fn default_format(&self) -> Format {
        self.default_format
    }

    /// Look up a format by id.
    pub fn format(&self, id: FormatId) -> Format {
        self.formats
            .get(id.index())
            .map(|f| f.format)
            .unwrap_or(self.default_format)
    }

    /// Name of a format by id.
    pub fn format_name(&self, id: FormatId) -> Option<&str> {
        self.formats.get(id.index()).map(|f| f.name.as_str())
    }

    /// Look up a format id by name.
    pub fn format_id(&self, name: &str) -> Option<FormatId> {
        self.formats
            .iter()
            .position(|f| f.name == name)
            .map(|i| FormatId(i as u16))
    }

    /// Process-unique version, usable as a cache key.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check whether the rule set has no rules.
    pub fn is_plain(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::plain()
    }
}

fn parse_format(name: &str, entry: &FormatDocument) -> SyntaxResult<Format> {
    let foreground = Rgba::from_hex(&entry.foreground).ok_or_else(|| SyntaxError::InvalidColor {
        format: name.to_string(),
        value: entry.foreground.clone(),
    })?;
    Ok(Format {
        foreground,
        bold: entry.bold,
        italic: entry.italic,
    })
}

#[derive(Debug, Clone)]
struct PendingRule {
    pattern: String,
    format: String,
    group: usize,
}

/// Builder for constructing a [`RuleSet`] in code.
///
/// Validation happens in [`build`](Self::build), exactly as for documents.
#[derive(Debug, Clone)]
pub struct RuleSetBuilder {
    name: String,
    extensions: Vec<String>,
    default: Option<String>,
    formats: Vec<NamedFormat>,
    rules: Vec<PendingRule>,
}

impl RuleSetBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Vec::new(),
            default: None,
            formats: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Add a file extension.
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Define a named format. Redefining a name replaces it.
    pub fn format(mut self, name: impl Into<String>, format: Format) -> Self {
        let name = name.into();
        match self.formats.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.format = format,
            None => self.formats.push(NamedFormat { name, format }),
        }
        self
    }

    /// Use a named format for unclaimed text.
    pub fn default_format(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Append a rule claiming whole matches.
    pub fn rule(self, pattern: impl Into<String>, format: impl Into<String>) -> Self {
        self.rule_group(pattern, format, 0)
    }

    /// Append a rule claiming one capture group.
    pub fn rule_group(
        mut self,
        pattern: impl Into<String>,
        format: impl Into<String>,
        group: usize,
    ) -> Self {
        self.rules.push(PendingRule {
            pattern: pattern.into(),
            format: format.into(),
            group,
        });
        self
    }

    /// Validate and compile.
    pub fn build(self) -> SyntaxResult<RuleSet> {
        if self.formats.len() > MAX_FORMATS {
            return Err(SyntaxError::TooManyFormats {
                count: self.formats.len(),
                max: MAX_FORMATS,
            });
        }

        let lookup = |name: &str| {
            self.formats
                .iter()
                .position(|f| f.name == name)
                .map(|i| FormatId(i as u16))
        };

        let default_format = match &self.default {
            Some(name) => {
                let id = lookup(name).ok_or_else(|| SyntaxError::UnknownDefault {
                    format: name.clone(),
                })?;
                self.formats[id.index()].format
            }
            None => Format::default(),
        };

        let mut rules = Vec::with_capacity(self.rules.len());
        for (index, pending) in self.rules.iter().enumerate() {
            let format = lookup(&pending.format)
                .ok_or_else(|| SyntaxError::unknown_format(index, &pending.format))?;
            let pattern = Regex::new(&pending.pattern)
                .map_err(|e| SyntaxError::invalid_pattern(index, &pending.pattern, e))?;

            // captures_len counts the implicit whole-match group.
            let available = pattern.captures_len() - 1;
            if pending.group > available {
                return Err(SyntaxError::InvalidGroup {
                    index,
                    group: pending.group,
                    available,
                });
            }

            rules.push(Rule {
                pattern,
                format,
                group: pending.group,
            });
        }

        let rule_set = RuleSet {
            name: self.name,
            extensions: self.extensions,
            rules,
            formats: self.formats,
            default_format,
            version: NEXT_VERSION.fetch_add(1, Ordering::Relaxed),
        };

        debug!(
            target: "glyphcast_syntax::rules",
            name = rule_set.name,
            rules = rule_set.rules.len(),
            formats = rule_set.formats.len(),
            "compiled rule set"
        );

        Ok(rule_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw() -> Format {
        Format::fg(Rgba::rgb(0x56, 0x9c, 0xd6)).with_bold()
    }

    #[test]
    fn builder_resolves_formats() {
        let set = RuleSet::builder("mini")
            .format("keyword", kw())
            .rule(r"\bif\b", "keyword")
            .build()
            .unwrap();

        assert_eq!(set.rules().len(), 1);
        let id = set.rules()[0].format();
        assert_eq!(set.format(id), kw());
        assert_eq!(set.format_name(id), Some("keyword"));
        assert_eq!(set.format_id("keyword"), Some(id));
    }

    #[test]
    fn dangling_format_is_load_error() {
        let err = RuleSet::builder("mini")
            .format("keyword", kw())
            .rule(r"\bif\b", "keyword")
            .rule(r"\d+", "number")
            .build()
            .unwrap_err();

        assert!(matches!(err, SyntaxError::UnknownFormat { index: 1, .. }));
    }

    #[test]
    fn bad_regex_reports_rule_index() {
        let err = RuleSet::builder("mini")
            .format("keyword", kw())
            .rule(r"ok", "keyword")
            .rule(r"(", "keyword")
            .build()
            .unwrap_err();

        assert_eq!(err.rule_index(), Some(1));
        assert!(matches!(err, SyntaxError::InvalidPattern { .. }));
    }

    #[test]
    fn group_must_exist() {
        let err = RuleSet::builder("mini")
            .format("keyword", kw())
            .rule_group(r"(a)b", "keyword", 2)
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            SyntaxError::InvalidGroup {
                index: 0,
                group: 2,
                available: 1
            }
        ));
    }

    #[test]
    fn unknown_default_is_rejected() {
        let err = RuleSet::builder("mini").default_format("text").build().unwrap_err();
        assert!(matches!(err, SyntaxError::UnknownDefault { .. }));
    }

    #[test]
    fn invalid_color_is_rejected() {
        let err = RuleSet::from_json(
            r#"{ "name": "x", "formats": { "a": { "foreground": "red" } }, "rules": [] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxError::InvalidColor { .. }));
    }

    #[test]
    fn versions_are_unique() {
        let a = RuleSet::plain();
        let b = RuleSet::plain();
        assert_ne!(a.version(), b.version());
        assert!(a.is_plain());
    }

    #[test]
    fn default_format_applies() {
        let text = Format::fg(Rgba::rgb(200, 200, 200));
        let set = RuleSet::builder("mini")
            .format("text", text)
            .default_format("text")
            .build()
            .unwrap();
        assert_eq!(set.default_format(), text);
    }
}
