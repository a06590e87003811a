//! Thread-safe façade over one static trie.
//!
//! All descent and iteration serializes through a single mutex; the
//! contention path is one descent plus a bounded enumeration. A bounded
//! negative-lookup set remembers words the trie reported absent during the
//! current session so repeated membership probes for the same misspelling
//! short-circuit. Both are reset on reload.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use super::{DictError, StaticTrie};

pub struct TrieLookup {
    name: &'static str,
    trie: Mutex<Option<StaticTrie>>,
    negative: Mutex<HashSet<String>>,
    negative_cap: usize,
}

impl TrieLookup {
    pub fn new(name: &'static str, negative_cap: usize) -> Self {
        Self {
            name,
            trie: Mutex::new(None),
            negative: Mutex::new(HashSet::new()),
            negative_cap,
        }
    }

    /// Install a trie, dropping any previous one and the negative set.
    pub fn install(&self, trie: StaticTrie) {
        debug!(dict = self.name, keys = trie.len(), "dictionary installed");
        *self.trie.lock().unwrap() = Some(trie);
        self.negative.lock().unwrap().clear();
    }

    pub fn load_path(&self, path: &Path) -> Result<(), DictError> {
        let trie = StaticTrie::open(path)?;
        self.install(trie);
        Ok(())
    }

    pub fn unload(&self) {
        *self.trie.lock().unwrap() = None;
        self.negative.lock().unwrap().clear();
    }

    pub fn is_loaded(&self) -> bool {
        self.trie.lock().unwrap().is_some()
    }

    pub fn key_count(&self) -> usize {
        self.trie.lock().unwrap().as_ref().map_or(0, StaticTrie::len)
    }

    pub fn negative_len(&self) -> usize {
        self.negative.lock().unwrap().len()
    }

    /// Membership test. An unloaded trie answers `false` rather than
    /// erroring; absent words are remembered up to the cap.
    pub fn exact_match(&self, word: &str) -> bool {
        if self.negative.lock().unwrap().contains(word) {
            return false;
        }

        let found = {
            let guard = self.trie.lock().unwrap();
            match guard.as_ref() {
                Some(trie) => trie.exact_match(word),
                None => return false,
            }
        };

        if !found {
            let mut negative = self.negative.lock().unwrap();
            if negative.len() < self.negative_cap {
                negative.insert(word.to_string());
            }
        }
        found
    }

    /// Up to `max` keys extending `prefix`, in trie order, excluding the key
    /// equal to the prefix itself. Empty prefixes enumerate nothing.
    pub fn prefix_enumerate(&self, prefix: &str, max: usize) -> Vec<String> {
        if prefix.is_empty() || max == 0 {
            return Vec::new();
        }
        let guard = self.trie.lock().unwrap();
        let Some(trie) = guard.as_ref() else {
            return Vec::new();
        };
        trie.predictive_search(prefix)
            .filter(|key| key != prefix)
            .take(max)
            .collect()
    }

    /// Like `prefix_enumerate` but keeps the prefix key; used by the bigram
    /// path where the query prefix is never itself a full key.
    pub fn prefix_enumerate_all(&self, prefix: &str, max: usize) -> Vec<String> {
        if prefix.is_empty() || max == 0 {
            return Vec::new();
        }
        let guard = self.trie.lock().unwrap();
        let Some(trie) = guard.as_ref() else {
            return Vec::new();
        };
        trie.predictive_search(prefix).take(max).collect()
    }
}
