//! Memoization of tokenizer output.
//!
//! Tokenization is a pure function of (text, rule set), so its output can be
//! cached under a hash of the text and the rule set's version. The cache is
//! shareable between a worker thread that tokenizes ahead of time and the
//! render thread that consumes the spans.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::rules::RuleSet;
use crate::span::StyledSpan;
use crate::tokenizer::tokenize;

/// Default number of cached span lists.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    text_hash: u64,
    text_len: usize,
    rules_version: u64,
}

impl CacheKey {
    fn new(text: &str, rules: &RuleSet) -> Self {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        Self {
            text_hash: hasher.finish(),
            text_len: text.len(),
            rules_version: rules.version(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Arc<[StyledSpan]>>,
    order: VecDeque<CacheKey>,
    stats: TokenCacheStats,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// A bounded, thread-safe cache of span lists.
///
/// When full, the oldest entry is evicted first.
#[derive(Debug)]
pub struct TokenCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl TokenCache {
    /// Create a cache with [`DEFAULT_CACHE_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `capacity` span lists (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return cached spans for `text`, tokenizing on a miss.
    pub fn tokenize(&self, text: &str, rules: &RuleSet) -> Arc<[StyledSpan]> {
        let key = CacheKey::new(text, rules);

        {
            let mut state = self.state.lock();
            if let Some(spans) = state.entries.get(&key).cloned() {
                state.stats.hits += 1;
                return spans;
            }
            state.stats.misses += 1;
        }

        // Tokenize without holding the lock.
        let spans: Arc<[StyledSpan]> = tokenize(text, rules).into();

        let mut state = self.state.lock();
        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.capacity {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                if state.entries.remove(&oldest).is_some() {
                    state.stats.evictions += 1;
                }
            }
            state.entries.insert(key, Arc::clone(&spans));
            state.order.push_back(key);
        }

        trace!(
            target: "glyphcast_syntax::cache",
            language = rules.name(),
            entries = state.entries.len(),
            "cached span list"
        );

        spans
    }

    /// Drop every entry produced with the given rule set.
    pub fn invalidate(&self, rules: &RuleSet) {
        let version = rules.version();
        let mut state = self.state.lock();
        state.entries.retain(|k, _| k.rules_version != version);
        state.order.retain(|k| k.rules_version != version);
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Number of cached span lists.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usage statistics.
    pub fn stats(&self) -> TokenCacheStats {
        self.state.lock().stats
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, Rgba};

    fn rules() -> RuleSet {
        RuleSet::builder("t")
            .format("num", Format::fg(Rgba::rgb(1, 2, 3)))
            .rule(r"\d+", "num")
            .build()
            .unwrap()
    }

    #[test]
    fn hit_returns_same_spans() {
        let cache = TokenCache::new();
        let set = rules();

        let first = cache.tokenize("a 12 b", &set);
        let second = cache.tokenize("a 12 b", &set);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, tokenize("a 12 b", &set).as_slice());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn key_includes_rule_set_version() {
        let cache = TokenCache::new();
        let a = rules();
        let b = rules();

        cache.tokenize("1", &a);
        cache.tokenize("1", &b);
        assert_eq!(cache.len(), 2);

        cache.invalidate(&a);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_oldest() {
        let cache = TokenCache::with_capacity(2);
        let set = rules();

        let first = cache.tokenize("1", &set);
        cache.tokenize("2", &set);
        cache.tokenize("3", &set);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);

        // "1" was evicted, so this is a fresh tokenization.
        let again = cache.tokenize("1", &set);
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(TokenCache::new());
        let set = Arc::new(rules());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let set = Arc::clone(&set);
                std::thread::spawn(move || cache.tokenize(&format!("x {i}"), &set).len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
        assert_eq!(cache.len(), 4);
    }
}
