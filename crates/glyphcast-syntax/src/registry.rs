//! Language registry.
//!
//! Maps language names and file extensions to shared rule sets. A language
//! whose rules fail to load is registered as plain text and a warning is
//! logged, so a broken rule file never stops text from rendering.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::SyntaxResult;
use crate::rules::RuleSet;

const PYTHON_RULES: &str = include_str!("languages/python.json");
const RUST_RULES: &str = include_str!("languages/rust.json");

/// Shared lookup of rule sets by language name and file extension.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<RuleSet>>,
    extensions: HashMap<String, String>,
    plain: Arc<RuleSet>,
}

impl LanguageRegistry {
    /// Create a registry that only knows plain text.
    pub fn new() -> Self {
        Self {
            languages: HashMap::new(),
            extensions: HashMap::new(),
            plain: Arc::new(RuleSet::plain()),
        }
    }

    /// Create a registry with the bundled languages (Python, Rust).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.load_or_plain("python", RuleSet::from_json(PYTHON_RULES));
        registry.load_or_plain("rust", RuleSet::from_json(RUST_RULES));
        registry
    }

    /// Register a rule set under its own name and extensions.
    ///
    /// Registering a name twice replaces the earlier rule set.
    pub fn register(&mut self, rules: RuleSet) -> Arc<RuleSet> {
        let rules = Arc::new(rules);
        let name = rules.name().to_string();

        for ext in rules.extensions() {
            self.extensions
                .insert(ext.trim_start_matches('.').to_ascii_lowercase(), name.clone());
        }

        info!(
            target: "glyphcast_syntax::registry",
            language = name,
            extensions = rules.extensions().len(),
            "registered language"
        );

        self.languages.insert(name, Arc::clone(&rules));
        rules
    }

    /// Register a loaded rule set, or plain text under `name` if loading failed.
    pub fn load_or_plain(&mut self, name: &str, loaded: SyntaxResult<RuleSet>) -> Arc<RuleSet> {
        match loaded {
            Ok(rules) => self.register(rules),
            Err(err) => {
                warn!(
                    target: "glyphcast_syntax::registry",
                    language = name,
                    rule = ?err.rule_index(),
                    error = %err,
                    "failed to load rule set, falling back to plain text"
                );
                let plain = Arc::clone(&self.plain);
                self.languages.insert(name.to_string(), Arc::clone(&plain));
                plain
            }
        }
    }

    /// Load a rule set file and register it, falling back to plain text.
    ///
    /// The language is named by the file stem when loading fails.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Arc<RuleSet> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plain".to_string());
        self.load_or_plain(&stem, RuleSet::from_file(path))
    }

    /// Look up a language by name.
    pub fn get(&self, name: &str) -> Option<Arc<RuleSet>> {
        self.languages.get(name).cloned()
    }

    /// Look up a language by file extension (with or without a leading dot).
    pub fn by_extension(&self, ext: &str) -> Option<Arc<RuleSet>> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.extensions.get(&ext).and_then(|name| self.get(name))
    }

    /// Rule set for a file path, plain text when the extension is unknown.
    pub fn for_path(&self, path: impl AsRef<Path>) -> Arc<RuleSet> {
        path.as_ref()
            .extension()
            .and_then(|ext| self.by_extension(&ext.to_string_lossy()))
            .unwrap_or_else(|| self.plain())
    }

    /// The shared plain-text rule set.
    pub fn plain(&self) -> Arc<RuleSet> {
        Arc::clone(&self.plain)
    }

    /// Names of all registered languages, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;

    #[test]
    fn builtins_load() {
        let registry = LanguageRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["python", "rust"]);

        let python = registry.get("python").unwrap();
        assert!(!python.is_plain());
        assert!(python.format_id("keyword").is_some());

        let rust = registry.get("rust").unwrap();
        assert!(!rust.is_plain());
    }

    #[test]
    fn extension_lookup() {
        let registry = LanguageRegistry::with_builtins();
        assert_eq!(registry.by_extension("py").unwrap().name(), "python");
        assert_eq!(registry.by_extension(".RS").unwrap().name(), "rust");
        assert!(registry.by_extension("txt").is_none());

        assert_eq!(registry.for_path("src/main.rs").name(), "rust");
        assert!(registry.for_path("notes.txt").is_plain());
        assert!(registry.for_path("Makefile").is_plain());
    }

    #[test]
    fn failed_load_falls_back_to_plain() {
        let mut registry = LanguageRegistry::new();
        let loaded = RuleSet::builder("broken")
            .format("kw", Default::default())
            .rule("(", "kw")
            .build();
        assert!(matches!(loaded, Err(SyntaxError::InvalidPattern { .. })));

        let rules = registry.load_or_plain("broken", loaded);
        assert!(rules.is_plain());
        assert!(registry.get("broken").unwrap().is_plain());
    }

    #[test]
    fn missing_file_falls_back_to_plain() {
        let mut registry = LanguageRegistry::new();
        let rules = registry.load_file("/nonexistent/glyphcast/lua.json");
        assert!(rules.is_plain());
        assert!(registry.get("lua").is_some());
    }
}
