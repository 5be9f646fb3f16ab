//! Rule sets: ordered patterns plus named formats.

mod document;
mod rule_set;

pub use document::{FormatDocument, RuleDocument, RuleSetDocument};
pub use rule_set::{MAX_FORMATS, NamedFormat, Rule, RuleSet, RuleSetBuilder};
