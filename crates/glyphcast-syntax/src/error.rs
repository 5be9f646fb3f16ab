//! Error types for rule set loading.

use std::path::PathBuf;

/// Result type alias for syntax operations.
pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

/// Errors that can occur while loading a rule set.
///
/// Tokenization itself never fails; every error here is raised when a rule
/// set is built, so a broken language definition is caught once at load time.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    /// The rule set document could not be parsed.
    #[error("malformed rule set document: {message}")]
    Document { message: String },

    /// A rule pattern failed to compile.
    #[error("rule {index} has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// A rule references a format that the rule set does not define.
    #[error("rule {index} references unknown format '{format}'")]
    UnknownFormat { index: usize, format: String },

    /// A rule selects a capture group its pattern does not have.
    #[error("rule {index} selects group {group}, but its pattern has {available} groups")]
    InvalidGroup {
        index: usize,
        group: usize,
        available: usize,
    },

    /// The default format named by the document does not exist.
    #[error("default format '{format}' is not defined")]
    UnknownDefault { format: String },

    /// A format declares a color string that cannot be parsed.
    #[error("format '{format}' has an invalid color '{value}'")]
    InvalidColor { format: String, value: String },

    /// The rule set defines more formats than a format id can index.
    #[error("rule set defines {count} formats, at most {max} are supported")]
    TooManyFormats { count: usize, max: usize },

    /// Reading a rule set file failed.
    #[error("failed to read rule set '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyntaxError {
    /// Create a document error.
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(index: usize, pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            index,
            pattern: pattern.into(),
            source: Box::new(source),
        }
    }

    /// Create an unknown format error.
    pub fn unknown_format(index: usize, format: impl Into<String>) -> Self {
        Self::UnknownFormat {
            index,
            format: format.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Index of the offending rule, if the error concerns a single rule.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            Self::InvalidPattern { index, .. }
            | Self::UnknownFormat { index, .. }
            | Self::InvalidGroup { index, .. } => Some(*index),
            _ => None,
        }
    }
}
