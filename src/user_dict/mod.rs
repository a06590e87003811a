//! User dictionary: a mutable working set behind a writer lock, published
//! to readers as immutable versioned snapshots.
//!
//! Writers mutate the working set under the exclusive side of an `RwLock`,
//! bump a pending-update counter and nudge the background builder; the
//! builder takes the shared side, deep-copies everything into a new
//! [`Snapshot`] and swaps it in. End-user searches never touch the working
//! set: they clone the current snapshot handle and traverse it lock-free.

mod persistence;
pub mod snapshot;

pub use snapshot::Snapshot;

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::normalize::normalize;
use crate::settings::settings;

pub(crate) const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One learned word. `normalized` is the identity key: two entries never
/// share it, and `contexts` holds normalized previous words only.
#[derive(Debug, Clone)]
pub struct UserEntry {
    pub word: String,
    pub normalized: String,
    pub frequency: i32,
    pub contexts: Vec<String>,
    pub created_ms: u64,
    pub last_used_ms: u64,
}

#[derive(Debug, Default)]
pub(crate) struct TrieNode {
    pub(crate) children: HashMap<u16, TrieNode>,
    /// Normalized keys of entries ending at this node.
    pub(crate) entries: Vec<String>,
}

/// Writer-owned state. Entries live in `entries` (normalized key is
/// authoritative); the other maps and the trie reference them by key, so the
/// whole structure stays a tree plus flat maps.
#[derive(Debug, Default)]
pub(crate) struct WorkingSet {
    pub(crate) root: TrieNode,
    pub(crate) entries: HashMap<String, UserEntry>,
    /// As-typed word → normalized key, populated at entry creation.
    pub(crate) words: HashMap<String, String>,
    /// Normalized context → normalized keys, insertion-ordered.
    pub(crate) contexts: HashMap<String, Vec<String>>,
    pub(crate) word_count: usize,
    pub(crate) total_frequency: i64,
    pub(crate) dirty: bool,
}

impl WorkingSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn add_word(&mut self, word: &str, frequency: i32, now: u64) -> bool {
        let normalized = normalize(word);
        if normalized.is_empty() {
            return false;
        }

        if let Some(entry) = self.entries.get_mut(&normalized) {
            entry.frequency = entry.frequency.saturating_add(frequency);
            entry.last_used_ms = now;
            self.total_frequency += i64::from(frequency);
            self.dirty = true;
            return true;
        }

        let entry = UserEntry {
            word: word.to_string(),
            normalized: normalized.clone(),
            frequency,
            contexts: Vec::new(),
            created_ms: now,
            last_used_ms: now,
        };
        self.trie_insert(&normalized);
        self.words.insert(word.to_string(), normalized.clone());
        self.entries.insert(normalized, entry);
        self.word_count += 1;
        self.total_frequency += i64::from(frequency);
        self.dirty = true;
        true
    }

    fn add_word_with_context(&mut self, word: &str, context: &str, frequency: i32, now: u64) -> bool {
        let normalized_context = normalize(context);
        if normalized_context.is_empty() || !self.add_word(word, frequency, now) {
            return false;
        }

        let normalized = normalize(word);
        if let Some(entry) = self.entries.get_mut(&normalized) {
            if !entry.contexts.contains(&normalized_context) {
                entry.contexts.push(normalized_context.clone());
                self.contexts
                    .entry(normalized_context)
                    .or_default()
                    .push(normalized);
            }
        }
        self.dirty = true;
        true
    }

    fn remove_word(&mut self, word: &str) -> bool {
        let normalized = normalize(word);
        let Some(entry) = self.entries.remove(&normalized) else {
            return false;
        };

        self.trie_remove(&normalized);
        for context in &entry.contexts {
            if let Some(list) = self.contexts.get_mut(context) {
                list.retain(|n| n != &normalized);
                if list.is_empty() {
                    self.contexts.remove(context);
                }
            }
        }
        self.words.remove(&entry.word);
        self.total_frequency -= i64::from(entry.frequency);
        self.word_count -= 1;
        self.dirty = true;
        true
    }

    fn trie_insert(&mut self, normalized: &str) {
        let mut node = &mut self.root;
        for unit in normalized.encode_utf16() {
            node = node.children.entry(unit).or_default();
        }
        if !node.entries.iter().any(|n| n == normalized) {
            node.entries.push(normalized.to_string());
        }
    }

    fn trie_remove(&mut self, normalized: &str) {
        let mut node = &mut self.root;
        for unit in normalized.encode_utf16() {
            match node.children.get_mut(&unit) {
                Some(child) => node = child,
                None => return,
            }
        }
        node.entries.retain(|n| n != normalized);
    }
}

pub(crate) struct BuilderStats {
    pub(crate) builds: u64,
    pub(crate) coalesced_updates: u64,
}

pub(crate) struct Shared {
    pub(crate) working: RwLock<WorkingSet>,
    pub(crate) current: Mutex<Arc<Snapshot>>,
    pub(crate) pending: AtomicUsize,
    pub(crate) signal_lock: Mutex<()>,
    pub(crate) signal: Condvar,
    pub(crate) shutdown: AtomicBool,
    pub(crate) version: AtomicU64,
    pub(crate) stats: Mutex<BuilderStats>,
}

pub struct UserDictionary {
    shared: Arc<Shared>,
    builder: Mutex<Option<thread::JoinHandle<()>>>,
}

impl UserDictionary {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            working: RwLock::new(WorkingSet::new()),
            current: Mutex::new(Arc::new(Snapshot::empty())),
            pending: AtomicUsize::new(0),
            signal_lock: Mutex::new(()),
            signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
            version: AtomicU64::new(0),
            stats: Mutex::new(BuilderStats {
                builds: 0,
                coalesced_updates: 0,
            }),
        });

        let builder_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("qazkey-userdict".into())
            .spawn(move || snapshot::builder_loop(builder_shared))
            .expect("failed to spawn snapshot builder");

        Self {
            shared,
            builder: Mutex::new(Some(handle)),
        }
    }

    fn request_snapshot(&self) {
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        let _guard = self.shared.signal_lock.lock().unwrap();
        self.shared.signal.notify_one();
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.shared.current.lock().unwrap())
    }

    // ------------------------------------------------------------------
    // Writer operations
    // ------------------------------------------------------------------

    pub fn add(&self, word: &str, frequency: i32) -> bool {
        if word.is_empty() || frequency <= 0 {
            return false;
        }
        let added = self
            .shared
            .working
            .write()
            .unwrap()
            .add_word(word, frequency, now_ms());
        if added {
            self.request_snapshot();
        }
        added
    }

    pub fn add_with_context(&self, word: &str, context: &str, frequency: i32) -> bool {
        if word.is_empty() || context.is_empty() || frequency <= 0 {
            return false;
        }
        let added = self.shared.working.write().unwrap().add_word_with_context(
            word,
            context,
            frequency,
            now_ms(),
        );
        if added {
            self.request_snapshot();
        }
        added
    }

    pub fn remove(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        let removed = self.shared.working.write().unwrap().remove_word(word);
        if removed {
            self.request_snapshot();
        }
        removed
    }

    /// Shift a word's frequency; dropping to zero or below removes it.
    pub fn update_frequency(&self, word: &str, delta: i32) -> bool {
        if word.is_empty() {
            return false;
        }
        let normalized = normalize(word);
        let changed = {
            let mut working = self.shared.working.write().unwrap();
            let Some(entry) = working.entries.get_mut(&normalized) else {
                return false;
            };
            if entry.frequency.saturating_add(delta) <= 0 {
                working.remove_word(word)
            } else {
                entry.frequency += delta;
                entry.last_used_ms = now_ms();
                working.total_frequency += i64::from(delta);
                working.dirty = true;
                true
            }
        };
        if changed {
            self.request_snapshot();
        }
        changed
    }

    /// Record a confirmed word from the input stream: add-or-bump by one,
    /// with an optional preceding-word context.
    pub fn learn(&self, word: &str, context: Option<&str>) {
        if word.is_empty() {
            return;
        }
        {
            let mut working = self.shared.working.write().unwrap();
            match context {
                Some(ctx) if !ctx.is_empty() => {
                    working.add_word_with_context(word, ctx, 1, now_ms());
                }
                _ => {
                    working.add_word(word, 1, now_ms());
                }
            }
        }
        self.request_snapshot();
    }

    /// Age out stale entries: anything unused for the configured window
    /// loses one frequency point, never dropping below one.
    pub fn decay_old(&self) {
        let cutoff = now_ms().saturating_sub(settings().user_dict.decay_after_days * MS_PER_DAY);
        let changed = {
            let mut working = self.shared.working.write().unwrap();
            let mut changed = false;
            for entry in working.entries.values_mut() {
                if entry.last_used_ms < cutoff && entry.frequency > 1 {
                    entry.frequency -= 1;
                    changed = true;
                }
            }
            if changed {
                let total: i64 = working.entries.values().map(|e| i64::from(e.frequency)).sum();
                working.total_frequency = total;
                working.dirty = true;
            }
            changed
        };
        if changed {
            self.request_snapshot();
        }
    }

    /// Bulk add with frequency one per word; a single snapshot request
    /// covers the whole batch.
    pub fn import(&self, words: &[String]) -> bool {
        let mut all_ok = true;
        {
            let mut working = self.shared.working.write().unwrap();
            let now = now_ms();
            for word in words {
                if word.is_empty() {
                    continue;
                }
                if !working.add_word(word, 1, now) {
                    all_ok = false;
                }
            }
        }
        self.request_snapshot();
        all_ok
    }

    pub fn clear(&self) {
        {
            let mut working = self.shared.working.write().unwrap();
            *working = WorkingSet::new();
            working.dirty = true;
        }
        self.request_snapshot();
        debug!("user dictionary cleared");
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Load from `path`. A missing, empty, corrupt or version-mismatched
    /// file yields an empty working set and success; losing the dictionary
    /// must never break typing. Only genuine IO failures are reported.
    pub fn load(&self, path: &Path) -> Result<(), io::Error> {
        let loaded = persistence::read_working_set(path)?;
        {
            let mut working = self.shared.working.write().unwrap();
            *working = loaded;
        }
        self.request_snapshot();
        Ok(())
    }

    /// Write the whole working set and clear the dirty flag. The write goes
    /// through a temp file, is fsynced and renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), io::Error> {
        let mut working = self.shared.working.write().unwrap();
        persistence::write_working_set(&working, path)?;
        working.dirty = false;
        Ok(())
    }

    pub fn export(&self, path: &Path) -> Result<(), io::Error> {
        self.save(path)
    }

    pub fn is_dirty(&self) -> bool {
        self.shared.working.read().unwrap().dirty
    }

    // ------------------------------------------------------------------
    // Reader operations (snapshot only)
    // ------------------------------------------------------------------

    pub fn contains(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        self.snapshot().entries.contains_key(&normalize(word))
    }

    pub fn word_count(&self) -> usize {
        self.snapshot().word_count
    }

    pub fn total_frequency(&self) -> i64 {
        self.snapshot().total_frequency
    }

    /// As-typed words matching the (normalized) prefix, most frequent and
    /// most recent first.
    pub fn search_prefix(&self, prefix: &str, max: usize) -> Vec<String> {
        if prefix.is_empty() || max == 0 {
            return Vec::new();
        }
        let snapshot = self.snapshot();
        snapshot
            .search_prefix(&normalize(prefix), max)
            .iter()
            .map(|entry| entry.word.clone())
            .collect()
    }

    /// Words previously typed after `prev`, filtered by the current prefix.
    pub fn search_with_context(&self, prev: &str, cur_prefix: &str, max: usize) -> Vec<String> {
        if prev.is_empty() || max == 0 {
            return Vec::new();
        }
        let snapshot = self.snapshot();
        snapshot
            .search_with_context(&normalize(prev), &normalize(cur_prefix), max)
            .iter()
            .map(|entry| entry.word.clone())
            .collect()
    }

    pub fn stats(&self) -> String {
        let snapshot = self.snapshot();
        let stats = self.shared.stats.lock().unwrap();
        let mut out = String::from("=== Kazakh User Dictionary ===\n");
        out.push_str(&format!("Snapshot version: {}\n", snapshot.version));
        out.push_str(&format!("Snapshot timestamp: {}\n", snapshot.timestamp_ms));
        out.push_str(&format!("Words: {}\n", snapshot.word_count));
        out.push_str(&format!("Total frequency: {}\n", snapshot.total_frequency));
        out.push_str(&format!("Snapshot builds: {}\n", stats.builds));
        out.push_str(&format!("Coalesced updates: {}\n", stats.coalesced_updates));
        out.push_str(&format!("Dirty: {}\n", self.is_dirty()));
        out
    }

    /// Stop the snapshot builder and join it. No final snapshot is forced;
    /// persistence happens only through [`UserDictionary::save`].
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let _guard = self.shared.signal_lock.lock().unwrap();
            self.shared.signal.notify_all();
        }
        if let Some(handle) = self.builder.lock().unwrap().take() {
            let _ = handle.join();
        }
        debug!("user dictionary shut down");
    }
}

impl Default for UserDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UserDictionary {
    fn drop(&mut self) {
        self.shutdown();
    }
}
