//! Script-level cache for sandbox evaluation results (§4.I).
//!
//! Keyed by `"rule-name:hash(fragment)"` with a 64-bit FNV hash of the
//! fragment text, exactly as spec.md specifies. Bounded at 100 entries;
//! a conservative flush (drop everything) on overflow rather than an
//! LRU eviction policy, per spec's "a conservative flush is
//! acceptable" — cache misses just cost a re-evaluation, they're never
//! wrong.

use std::collections::HashMap;
use std::hash::Hasher;

use fnv::FnvHasher;

use crate::ast::LiteralValue;

pub const CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub enum CacheEntry {
    Literal(LiteralValue),
    BadValue,
}

pub struct ScriptCache {
    entries: HashMap<String, CacheEntry>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn key(rule_name: &str, fragment: &str) -> String {
        let mut hasher = FnvHasher::default();
        hasher.write(fragment.as_bytes());
        format!("{}:{:x}", rule_name, hasher.finish())
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        if self.entries.len() >= CAPACITY {
            self.entries.clear();
        }
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ScriptCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rule_and_fragment_produce_the_same_key() {
        assert_eq!(ScriptCache::key("fold", "1+2"), ScriptCache::key("fold", "1+2"));
        assert_ne!(ScriptCache::key("fold", "1+2"), ScriptCache::key("eval", "1+2"));
    }

    #[test]
    fn overflow_flushes_the_whole_cache() {
        let mut cache = ScriptCache::new();
        for i in 0..CAPACITY {
            cache.insert(format!("k{i}"), CacheEntry::BadValue);
        }
        assert_eq!(cache.len(), CAPACITY);
        cache.insert("one-more".to_string(), CacheEntry::BadValue);
        assert_eq!(cache.len(), 1);
    }
}
