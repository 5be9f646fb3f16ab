//! Data-driven syntax highlighting for Glyphcast.
//!
//! A language is described by a [`RuleSet`]: ordered regular-expression
//! rules, each naming a [`Format`] (foreground color, bold, italic). The
//! [`tokenize`] pass turns text into [`StyledSpan`]s that cover the whole
//! text, where earlier rules take precedence over later ones.
//!
//! - **Rule sets**: Load from JSON or TOML documents, or build in code
//! - **Tokenizer**: Pure, deterministic, never fails on any input
//! - **Incremental**: [`retokenize`] reports the range an edit restyled
//! - **Caching**: [`TokenCache`] memoizes span lists across threads
//! - **Registry**: [`LanguageRegistry`] maps names and file extensions to rules
//!
//! # Example
//!
//! ```
//! use glyphcast_syntax::{Format, Rgba, RuleSet, tokenize};
//!
//! let rules = RuleSet::builder("mini")
//!     .format("keyword", Format::fg(Rgba::rgb(0x56, 0x9c, 0xd6)).with_bold())
//!     .rule(r"\bdef\b", "keyword")
//!     .build()?;
//!
//! let spans = tokenize("def main", &rules);
//! assert_eq!(spans.len(), 2);
//! assert!(spans[0].format.bold);
//! # Ok::<(), glyphcast_syntax::SyntaxError>(())
//! ```

mod cache;
mod error;
mod format;
mod registry;
mod span;
mod tokenizer;

pub mod rules;

pub use cache::{DEFAULT_CACHE_CAPACITY, TokenCache, TokenCacheStats};
pub use error::{SyntaxError, SyntaxResult};
pub use format::{Format, FormatId, Rgba};
pub use registry::LanguageRegistry;
pub use rules::{Rule, RuleSet, RuleSetBuilder, RuleSetDocument};
pub use span::{StyledSpan, span_at};
pub use tokenizer::{DirtyRange, Retokenized, retokenize, tokenize};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::{
        DirtyRange, Format, LanguageRegistry, Retokenized, Rgba, RuleSet, StyledSpan,
        SyntaxError, SyntaxResult, TokenCache, retokenize, tokenize,
    };
}
