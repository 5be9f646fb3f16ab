//! Rule-driven tokenizer.
//!
//! Tokenization is an interval-claiming pass. Rules run in rule-set order;
//! each rule scans the text for its non-overlapping leftmost-first matches
//! and claims a match's range only if none of its characters were claimed by
//! an earlier rule. Precedence therefore follows rule order, never match
//! position. Whatever no rule claims gets the rule set's default format.
//!
//! The claim table holds one entry per code point, so spans come out in
//! code-point offsets regardless of how the regex engine reports positions.

use std::ops::Range;

use tracing::trace;

use crate::format::FormatId;
use crate::rules::{Rule, RuleSet};
use crate::span::StyledSpan;

/// Tokenize `text` with `rules`.
///
/// The result covers the whole text with ordered, non-overlapping,
/// coalesced spans. This never fails: a text no rule matches comes back as a
/// single default span. Empty text yields no spans.
pub fn tokenize(text: &str, rules: &RuleSet) -> Vec<StyledSpan> {
    let index = CharIndex::new(text);
    let spans = build_spans(&claim(text, &index, rules), rules);

    trace!(
        target: "glyphcast_syntax::tokenizer",
        language = rules.name(),
        chars = index.char_count(),
        spans = spans.len(),
        "tokenized"
    );

    spans
}

/// Description of an edit, used as a hint for [`retokenize`].
///
/// Offsets are code points in the *new* text. `start..end` is the inserted
/// or replaced region (empty for a pure deletion) and `delta` is the new
/// length minus the old length, so the edit covered
/// `start..end - delta` in the old text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRange {
    pub start: usize,
    pub end: usize,
    pub delta: isize,
}

impl DirtyRange {
    /// Hint for `inserted` code points inserted at `at`.
    pub fn insertion(at: usize, inserted: usize) -> Self {
        Self {
            start: at,
            end: at + inserted,
            delta: inserted as isize,
        }
    }

    /// Hint for `removed` code points deleted at `at`.
    pub fn deletion(at: usize, removed: usize) -> Self {
        Self {
            start: at,
            end: at,
            delta: -(removed as isize),
        }
    }

    /// End of the edited region in the old text, if the hint fits a text of
    /// `old_len` code points that became `new_len` long.
    fn old_end(&self, old_len: usize, new_len: usize) -> Option<usize> {
        let old_end = self.end.checked_add_signed(self.delta.checked_neg()?)?;
        let fits = self.start <= self.end
            && self.end <= new_len
            && self.start <= old_end
            && old_end <= old_len
            && old_len.checked_add_signed(self.delta) == Some(new_len);
        fits.then_some(old_end)
    }
}

/// Result of [`retokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retokenized {
    /// Spans of the new text, identical to what [`tokenize`] returns.
    pub spans: Vec<StyledSpan>,
    /// Code-point range of the new text whose styling differs from the
    /// previous pass. Everything outside it kept its format, shifted by the
    /// edit's delta after the edit.
    pub restyled: Range<usize>,
}

impl Retokenized {
    /// Whether the edit changed any styling.
    pub fn is_unchanged(&self) -> bool {
        self.restyled.is_empty()
    }
}

/// Re-tokenize after an edit and report which part of the text restyled.
///
/// Regex matches can depend on text arbitrarily far ahead (a `/*` only
/// opens a comment if a `*/` follows), so every rule runs over the whole
/// new text and the spans always equal [`tokenize`]. `previous` (spans of
/// the old text under the same rule set) and `hint` bound the restyled
/// range: the common prefix before the edit and the common suffix after it,
/// compared at their shifted offsets, are excluded. A hint that does not
/// fit `previous` and `text` restyles the whole text.
pub fn retokenize(
    text: &str,
    rules: &RuleSet,
    previous: &[StyledSpan],
    hint: DirtyRange,
) -> Retokenized {
    let index = CharIndex::new(text);
    let claims = claim(text, &index, rules);
    let restyled = restyled_range(&claims, previous, hint);

    trace!(
        target: "glyphcast_syntax::tokenizer",
        language = rules.name(),
        chars = claims.len(),
        restyled = ?restyled,
        "retokenized"
    );

    Retokenized {
        spans: build_spans(&claims, rules),
        restyled,
    }
}

impl RuleSet {
    /// Tokenize `text` with this rule set. See [`tokenize`].
    pub fn tokenize(&self, text: &str) -> Vec<StyledSpan> {
        tokenize(text, self)
    }
}

/// Narrow `0..claims.len()` to the part whose claims differ from `previous`.
fn restyled_range(
    claims: &[Option<FormatId>],
    previous: &[StyledSpan],
    hint: DirtyRange,
) -> Range<usize> {
    let new_len = claims.len();
    let old_len = previous.last().map_or(0, |s| s.end);
    let Some(old_end) = hint.old_end(old_len, new_len).filter(|_| !previous.is_empty()) else {
        return 0..new_len;
    };

    let mut old: Vec<Option<FormatId>> = vec![None; old_len];
    for span in previous {
        old[span.start.min(old_len)..span.end.min(old_len)].fill(span.id);
    }

    let mut lo = 0;
    while lo < hint.start && claims[lo] == old[lo] {
        lo += 1;
    }

    let (mut hi, mut old_hi) = (new_len, old_len);
    while hi > hint.end && old_hi > old_end && claims[hi - 1] == old[old_hi - 1] {
        hi -= 1;
        old_hi -= 1;
    }

    lo..hi
}

/// Run every rule over `text` and return the claim of each code point.
fn claim(text: &str, index: &CharIndex, rules: &RuleSet) -> Vec<Option<FormatId>> {
    let mut claims: Vec<Option<FormatId>> = vec![None; index.char_count()];

    for rule in rules.rules() {
        for_each_claim(rule, text, |start_byte, end_byte| {
            let range = &mut claims[index.char_of(start_byte)..index.char_of(end_byte)];
            if range.iter().all(Option::is_none) {
                range.fill(Some(rule.format()));
            }
        });
    }

    claims
}

/// Call `claim` with the byte range each match of `rule` wants to claim.
///
/// Matches are found leftmost-first and never overlap within one rule.
/// Empty matches and empty groups claim nothing.
fn for_each_claim(rule: &Rule, text: &str, mut claim: impl FnMut(usize, usize)) {
    let pattern = rule.pattern();
    let group = rule.group();
    let mut pos = 0;

    while pos <= text.len() {
        let (whole_start, whole_end, target) = if group == 0 {
            let Some(m) = pattern.find_at(text, pos) else {
                break;
            };
            (m.start(), m.end(), Some((m.start(), m.end())))
        } else {
            let Some(caps) = pattern.captures_at(text, pos) else {
                break;
            };
            let Some(m) = caps.get(0) else {
                break;
            };
            (m.start(), m.end(), caps.get(group).map(|g| (g.start(), g.end())))
        };

        if let Some((start, end)) = target {
            if start < end {
                claim(start, end);
            }
        }

        pos = if whole_end > whole_start {
            whole_end
        } else {
            next_boundary(text, whole_end)
        };
    }
}

fn next_boundary(text: &str, byte: usize) -> usize {
    text[byte..]
        .chars()
        .next()
        .map_or(byte + 1, |c| byte + c.len_utf8())
}

fn build_spans(claims: &[Option<FormatId>], rules: &RuleSet) -> Vec<StyledSpan> {
    let mut spans: Vec<StyledSpan> = Vec::new();
    let mut run_start = 0;

    for i in 1..=claims.len() {
        if i == claims.len() || claims[i] != claims[run_start] {
            let id = claims[run_start];
            let format = match id {
                Some(id) => rules.format(id),
                None => rules.default_format(),
            };
            spans.push(StyledSpan::new(run_start, i, format, id));
            run_start = i;
        }
    }

    spans
}

/// Byte/code-point offset conversion for one text.
struct CharIndex {
    /// Byte offset of each code point, plus the text length at the end.
    char_to_byte: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self { char_to_byte }
    }

    fn char_count(&self) -> usize {
        self.char_to_byte.len() - 1
    }

    /// Code-point index of a byte offset on a char boundary.
    fn char_of(&self, byte: usize) -> usize {
        self.char_to_byte.partition_point(|&b| b < byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, Rgba};

    fn rules() -> RuleSet {
        RuleSet::builder("test")
            .format("class", Format::fg(Rgba::rgb(255, 0, 0)))
            .format("builtin", Format::fg(Rgba::rgb(0, 255, 0)))
            .format("comment", Format::fg(Rgba::rgb(0, 0, 255)).with_italic())
            .rule(r"#.*", "comment")
            .rule(r"\bclass\b", "class")
            .rule(r"\b[A-Z][A-Za-z]*\b", "builtin")
            .build()
            .unwrap()
    }

    fn named<'a>(set: &'a RuleSet, text: &str, spans: &[StyledSpan]) -> Vec<(String, &'a str)> {
        let chars: Vec<char> = text.chars().collect();
        spans
            .iter()
            .filter_map(|s| {
                let name = set.format_name(s.id?)?;
                Some((chars[s.start..s.end].iter().collect(), name))
            })
            .collect()
    }

    #[test]
    fn earlier_rule_wins() {
        let set = RuleSet::builder("test")
            .format("class", Format::fg(Rgba::rgb(255, 0, 0)))
            .format("builtin", Format::fg(Rgba::rgb(0, 255, 0)))
            .rule(r"\bclass\b", "class")
            .rule(r"\b[A-Z][A-Za-z]*\b", "builtin")
            .build()
            .unwrap();

        let spans = tokenize("class Foo", &set);
        assert_eq!(
            named(&set, "class Foo", &spans),
            vec![("class".to_string(), "class"), ("Foo".to_string(), "builtin")]
        );
    }

    #[test]
    fn later_rule_cannot_split_claim() {
        // The comment claims `# Foo`, so the capitalized-word rule loses.
        let set = rules();
        let spans = tokenize("x # Foo", &set);
        assert_eq!(named(&set, "x # Foo", &spans), vec![("# Foo".to_string(), "comment")]);
    }

    #[test]
    fn partial_overlap_is_rejected() {
        let set = RuleSet::builder("test")
            .format("a", Format::fg(Rgba::rgb(1, 1, 1)))
            .format("b", Format::fg(Rgba::rgb(2, 2, 2)))
            .rule(r"cd", "a")
            .rule(r"bcde", "b")
            .build()
            .unwrap();

        let spans = tokenize("abcdef", &set);
        assert_eq!(named(&set, "abcdef", &spans), vec![("cd".to_string(), "a")]);
    }

    #[test]
    fn spans_cover_text_in_order() {
        let set = rules();
        let text = "class Foo # note\nBar";
        let spans = tokenize(text, &set);

        assert_eq!(spans.first().map(|s| s.start), Some(0));
        assert_eq!(spans.last().map(|s| s.end), Some(text.chars().count()));
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_ne!(pair[0].id, pair[1].id, "adjacent spans must be coalesced");
        }
    }

    #[test]
    fn zero_length_matches_are_ignored() {
        let set = RuleSet::builder("test")
            .format("empty", Format::fg(Rgba::rgb(1, 1, 1)))
            .rule(r"x*", "empty")
            .rule(r"\b", "empty")
            .build()
            .unwrap();

        let spans = tokenize("abc", &set);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_default());

        let spans = tokenize("axxb", &set);
        assert_eq!(named(&set, "axxb", &spans), vec![("xx".to_string(), "empty")]);
    }

    #[test]
    fn offsets_are_code_points() {
        let set = rules();
        let text = "é # ü";
        let spans = tokenize(text, &set);
        let comment = spans.iter().find(|s| s.id.is_some()).unwrap();
        assert_eq!((comment.start, comment.end), (2, 5));
    }

    #[test]
    fn group_claims_only_group() {
        let set = RuleSet::builder("test")
            .format("function", Format::fg(Rgba::rgb(1, 1, 1)))
            .rule_group(r"\b([a-z]+)\s*\(", "function", 1)
            .build()
            .unwrap();

        let spans = tokenize("call(x) and go (y)", &set);
        assert_eq!(
            named(&set, "call(x) and go (y)", &spans),
            vec![("call".to_string(), "function"), ("go".to_string(), "function")]
        );
    }

    #[test]
    fn unterminated_pattern_claims_to_end() {
        let set = RuleSet::builder("test")
            .format("string", Format::fg(Rgba::rgb(1, 1, 1)))
            .rule(r#""""[\s\S]*?(?:"""|\z)"#, "string")
            .build()
            .unwrap();

        let text = "x = \"\"\"open\nstill open";
        let spans = tokenize(text, &set);
        let last = spans.last().unwrap();
        assert!(last.id.is_some());
        assert_eq!(last.start, 4);
        assert_eq!(last.end, text.chars().count());
    }

    #[test]
    fn empty_text_has_no_spans() {
        assert!(tokenize("", &rules()).is_empty());
        assert_eq!(tokenize("plain", &RuleSet::plain()).len(), 1);
    }

    #[test]
    fn retokenize_matches_full_pass() {
        let set = rules();
        let before = "class A\n# one\nx = Foo\ny = 1\n";
        let after = "class A\n# one\nx = Foo Bar\ny = 1\n";
        let previous = tokenize(before, &set);

        // " Bar" inserted after "Foo" on line 3.
        let hint = DirtyRange::insertion(21, 4);
        let result = retokenize(after, &set, &previous, hint);
        assert_eq!(result.spans, tokenize(after, &set));
        assert_eq!(result.restyled, 21..25);
    }

    #[test]
    fn retokenize_keeps_rejections_from_before_edit() {
        // The word rule matches from the first `X` to the end, so its only
        // match is rejected and every later line stays unclaimed.
        let set = RuleSet::builder("test")
            .format("x", Format::fg(Rgba::rgb(1, 1, 1)))
            .format("word", Format::fg(Rgba::rgb(2, 2, 2)))
            .rule(r"X", "x")
            .rule(r"[a-zX\n]+", "word")
            .build()
            .unwrap();

        let before = "X\nab\ncd\nef\n";
        let after = "X\nab\ncd\neX\n";
        let previous = tokenize(before, &set);
        assert_eq!(named(&set, before, &previous), vec![("X".to_string(), "x")]);

        let hint = DirtyRange {
            start: 9,
            end: 10,
            delta: 0,
        };
        let result = retokenize(after, &set, &previous, hint);
        assert_eq!(result.spans, tokenize(after, &set));
        assert_eq!(
            named(&set, after, &result.spans),
            vec![("X".to_string(), "x"), ("X".to_string(), "x")]
        );
        assert_eq!(result.restyled, 9..10);
    }

    #[test]
    fn retokenize_handles_deletion_and_bad_hints() {
        let set = rules();
        let before = "a\nb\nclass C # c\nd";
        let after = "a\nb\nclass C\nd";
        let previous = tokenize(before, &set);

        let hint = DirtyRange::deletion(11, 4);
        let result = retokenize(after, &set, &previous, hint);
        assert_eq!(result.spans, tokenize(after, &set));
        // The comment was deleted outright; no remaining text changed style.
        assert!(result.is_unchanged());

        let full = 0..after.chars().count();
        let bogus = DirtyRange::insertion(1000, 1);
        assert_eq!(retokenize(after, &set, &previous, bogus).restyled, full);

        // Right place, wrong length.
        let short = DirtyRange::deletion(11, 3);
        assert_eq!(retokenize(after, &set, &previous, short).restyled, full);

        let result = retokenize(after, &set, &[], hint);
        assert_eq!(result.spans, tokenize(after, &set));
        assert_eq!(result.restyled, full);
    }

    #[test]
    fn restyled_range_follows_comment_opened_by_edit() {
        let set = rules();
        let before = "x Foo\nBar\n";
        let after = "x #Foo\nBar\n";
        let previous = tokenize(before, &set);

        let result = retokenize(after, &set, &previous, DirtyRange::insertion(2, 1));
        assert_eq!(result.spans, tokenize(after, &set));
        // "#Foo" turned into a comment; the next line kept its style.
        assert_eq!(result.restyled, 2..6);
    }

    #[test]
    fn char_index_conversions() {
        let index = CharIndex::new("aé b");
        assert_eq!(index.char_count(), 4);
        assert_eq!(index.char_of(0), 0);
        assert_eq!(index.char_of(3), 2);
        assert_eq!(index.char_of(5), 4);
    }
}
