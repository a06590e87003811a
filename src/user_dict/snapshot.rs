//! Immutable snapshots of the user dictionary and the background builder.
//!
//! The builder waits up to the configured interval for pending updates,
//! drains the counter, deep-copies the working set under its shared lock
//! and publishes the result by swapping the snapshot pointer. Bursts of
//! writes landing during a build coalesce into the next one; builds never
//! overlap because there is exactly one builder thread.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::settings::settings;

use super::{now_ms, Shared, TrieNode, UserEntry, WorkingSet};

#[derive(Debug, Default)]
pub(crate) struct SnapNode {
    pub(crate) children: HashMap<u16, SnapNode>,
    pub(crate) entries: Vec<Arc<UserEntry>>,
}

/// One published read view. Never mutated after publication; readers hold it
/// by `Arc` and it dies when the last reader and the next snapshot let go.
pub struct Snapshot {
    pub version: u64,
    pub timestamp_ms: u64,
    pub word_count: usize,
    pub total_frequency: i64,
    /// Normalized key → entry.
    pub(crate) entries: HashMap<String, Arc<UserEntry>>,
    /// As-typed word → entry.
    pub(crate) words: HashMap<String, Arc<UserEntry>>,
    /// Normalized context → entries, insertion-ordered.
    pub(crate) contexts: HashMap<String, Vec<Arc<UserEntry>>>,
    /// Every proper prefix of every normalized word → its entries.
    pub(crate) prefix_map: HashMap<String, Vec<Arc<UserEntry>>>,
    pub(crate) root: SnapNode,
}

impl Snapshot {
    pub(crate) fn empty() -> Self {
        Self {
            version: 0,
            timestamp_ms: now_ms(),
            word_count: 0,
            total_frequency: 0,
            entries: HashMap::new(),
            words: HashMap::new(),
            contexts: HashMap::new(),
            prefix_map: HashMap::new(),
            root: SnapNode::default(),
        }
    }

    /// Entries whose normalized word starts with `normalized_prefix`, best
    /// first. The precomputed prefix map answers most queries; whole-word
    /// and unmapped prefixes fall back to a bounded trie walk.
    pub(crate) fn search_prefix(&self, normalized_prefix: &str, max: usize) -> Vec<Arc<UserEntry>> {
        if max == 0 {
            return Vec::new();
        }
        if let Some(bucket) = self.prefix_map.get(normalized_prefix) {
            return top_entries(bucket.clone(), max);
        }

        let mut node = &self.root;
        for unit in normalized_prefix.encode_utf16() {
            match node.children.get(&unit) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut found: Vec<Arc<UserEntry>> = Vec::new();
        let mut queue: VecDeque<&SnapNode> = VecDeque::new();
        queue.push_back(node);
        let mut visited = 0;
        let node_limit = settings().user_dict.bfs_node_limit;
        while let Some(current) = queue.pop_front() {
            visited += 1;
            if visited > node_limit {
                break;
            }
            found.extend(current.entries.iter().cloned());
            queue.extend(current.children.values());
        }
        top_entries(found, max)
    }

    /// Entries recorded after `normalized_prev`, filtered by the normalized
    /// current prefix, best first.
    pub(crate) fn search_with_context(
        &self,
        normalized_prev: &str,
        normalized_cur_prefix: &str,
        max: usize,
    ) -> Vec<Arc<UserEntry>> {
        if max == 0 {
            return Vec::new();
        }
        let Some(bucket) = self.contexts.get(normalized_prev) else {
            return Vec::new();
        };
        let filtered: Vec<Arc<UserEntry>> = bucket
            .iter()
            .filter(|entry| entry.normalized.starts_with(normalized_cur_prefix))
            .cloned()
            .collect();
        top_entries(filtered, max)
    }

    /// Direct lookup by the as-typed word.
    pub fn lookup_word(&self, word: &str) -> Option<&UserEntry> {
        self.words.get(word).map(Arc::as_ref)
    }
}

/// Partial sort to `max` by `(frequency desc, last_used desc)`.
fn top_entries(mut entries: Vec<Arc<UserEntry>>, max: usize) -> Vec<Arc<UserEntry>> {
    let cmp = |a: &Arc<UserEntry>, b: &Arc<UserEntry>| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| b.last_used_ms.cmp(&a.last_used_ms))
    };
    if entries.len() > max {
        entries.select_nth_unstable_by(max - 1, cmp);
        entries.truncate(max);
    }
    entries.sort_by(cmp);
    entries
}

// ----------------------------------------------------------------------
// Builder
// ----------------------------------------------------------------------

pub(crate) fn builder_loop(shared: Arc<Shared>) {
    let wait = Duration::from_millis(settings().user_dict.snapshot_wait_ms);
    loop {
        {
            let guard = shared.signal_lock.lock().unwrap();
            let _unused = shared.signal.wait_timeout(guard, wait).unwrap();
        }
        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }

        let pending = shared.pending.swap(0, Ordering::SeqCst);
        if pending == 0 {
            continue;
        }

        let snapshot = {
            let working = shared.working.read().unwrap();
            let version = shared.version.fetch_add(1, Ordering::SeqCst) + 1;
            build_snapshot(&working, version)
        };

        {
            let mut stats = shared.stats.lock().unwrap();
            stats.builds += 1;
            stats.coalesced_updates += pending as u64 - 1;
        }
        debug!(
            version = snapshot.version,
            words = snapshot.word_count,
            pending,
            "published user-dict snapshot"
        );
        *shared.current.lock().unwrap() = Arc::new(snapshot);
    }
}

fn build_snapshot(working: &WorkingSet, version: u64) -> Snapshot {
    let mut entries: HashMap<String, Arc<UserEntry>> =
        HashMap::with_capacity(working.entries.len());
    for (normalized, entry) in &working.entries {
        entries.insert(normalized.clone(), Arc::new(entry.clone()));
    }

    let mut words = HashMap::with_capacity(entries.len());
    for entry in entries.values() {
        words.insert(entry.word.clone(), Arc::clone(entry));
    }

    let mut contexts: HashMap<String, Vec<Arc<UserEntry>>> =
        HashMap::with_capacity(working.contexts.len());
    for (context, keys) in &working.contexts {
        let resolved: Vec<Arc<UserEntry>> = keys
            .iter()
            .filter_map(|key| entries.get(key).cloned())
            .collect();
        if !resolved.is_empty() {
            contexts.insert(context.clone(), resolved);
        }
    }

    let mut prefix_map: HashMap<String, Vec<Arc<UserEntry>>> = HashMap::new();
    for (normalized, entry) in &entries {
        let units: Vec<char> = normalized.chars().collect();
        let mut prefix = String::new();
        // Proper prefixes only; the whole word is reachable through the trie.
        for &c in &units[..units.len().saturating_sub(1)] {
            prefix.push(c);
            prefix_map
                .entry(prefix.clone())
                .or_default()
                .push(Arc::clone(entry));
        }
    }

    Snapshot {
        version,
        timestamp_ms: now_ms(),
        word_count: working.word_count,
        total_frequency: working.total_frequency,
        root: clone_trie(&working.root, &entries),
        entries,
        words,
        contexts,
        prefix_map,
    }
}

fn clone_trie(node: &TrieNode, entries: &HashMap<String, Arc<UserEntry>>) -> SnapNode {
    SnapNode {
        children: node
            .children
            .iter()
            .map(|(&unit, child)| (unit, clone_trie(child, entries)))
            .collect(),
        entries: node
            .entries
            .iter()
            .filter_map(|key| entries.get(key).cloned())
            .collect(),
    }
}
