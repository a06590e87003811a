//! Tiered completion and correction over the static dictionaries.
//!
//! Stage-1 answers prefix completions straight from the unigram trie (LRU
//! first), Stage-2 runs the bounded keyboard/phonetic correction
//! synchronously for short inputs, and Stage-3 runs the full candidate
//! sweep on the task-queue worker under a generation counter so only the
//! newest submission may ever invoke its callback. The bigram trie serves
//! context prediction with Stage-1 top-ups.

mod candidates;
mod distance;
mod tables;
#[cfg(test)]
mod tests;

pub use candidates::{generate, GenerationMode};
pub use distance::bounded_damerau;
pub use tables::{keyboard_neighbors, phonetic_partners};

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::cache::LruCache;
use crate::dict::{DictError, StaticTrie, TrieLookup};
use crate::settings::settings;
use crate::task_queue::TaskQueue;
use crate::unicode::decode_utf32;

/// Stage-3 runs below everything else the queue might carry.
const HEAVY_PRIORITY: i32 = 10;
const HEAVY_TAG_PREFIX: &str = "heavy:";

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("request superseded by a newer submission")]
    Cancelled,
    #[error("result not ready within the wait budget")]
    Timeout,
}

pub struct ContextPredictor {
    unigram: TrieLookup,
    bigram: TrieLookup,
    prefix_cache: LruCache<String, Vec<String>>,
    spell_cache: LruCache<String, Vec<String>>,
    context_cache: LruCache<String, Vec<String>>,
    utf32_cache: LruCache<String, Vec<char>>,
    queue: TaskQueue,
    heavy_generation: AtomicU64,
    last_word: Mutex<String>,
}

impl ContextPredictor {
    pub fn new() -> Self {
        let s = settings();
        Self {
            unigram: TrieLookup::new("unigram", s.caches.negative_lookup),
            bigram: TrieLookup::new("bigram", s.caches.negative_lookup),
            prefix_cache: LruCache::new(s.caches.prefix),
            spell_cache: LruCache::new(s.caches.spell),
            context_cache: LruCache::new(s.caches.context),
            utf32_cache: LruCache::new(s.caches.utf32),
            queue: TaskQueue::new(),
            heavy_generation: AtomicU64::new(0),
            last_word: Mutex::new(String::new()),
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    pub fn load_unigram(&self, path: &Path) -> Result<(), DictError> {
        self.unigram.load_path(path)?;
        self.drain_caches();
        Ok(())
    }

    pub fn load_bigram(&self, path: &Path) -> Result<(), DictError> {
        self.bigram.load_path(path)?;
        self.drain_caches();
        Ok(())
    }

    /// Install pre-built tries; used by tests and host tooling.
    pub fn install_unigram(&self, trie: StaticTrie) {
        self.unigram.install(trie);
        self.drain_caches();
    }

    pub fn install_bigram(&self, trie: StaticTrie) {
        self.bigram.install(trie);
        self.drain_caches();
    }

    pub fn is_unigram_loaded(&self) -> bool {
        self.unigram.is_loaded()
    }

    pub fn is_bigram_loaded(&self) -> bool {
        self.bigram.is_loaded()
    }

    /// Unload both tries and reset every stage cache.
    pub fn clear(&self) {
        self.unigram.unload();
        self.bigram.unload();
        self.drain_caches();
        self.heavy_generation.fetch_add(1, Ordering::SeqCst);
        self.queue.cancel(HEAVY_TAG_PREFIX);
        *self.last_word.lock().unwrap() = String::new();
    }

    fn drain_caches(&self) {
        self.prefix_cache.clear();
        self.spell_cache.clear();
        self.context_cache.clear();
        self.utf32_cache.clear();
    }

    // ------------------------------------------------------------------
    // Stage 1: prefix completion
    // ------------------------------------------------------------------

    pub fn exact_match(&self, word: &str) -> bool {
        self.unigram.exact_match(word)
    }

    pub fn fast_predict(&self, prefix: &str, max: usize) -> Vec<String> {
        if prefix.is_empty() || max == 0 {
            return Vec::new();
        }
        let key = format!("prefix:{prefix}:{max}");
        if let Some(hit) = self.prefix_cache.get(&key) {
            return hit;
        }
        let results = self.unigram.prefix_enumerate(prefix, max);
        self.prefix_cache.put(key, results.clone());
        results
    }

    // ------------------------------------------------------------------
    // Stage 2: synchronous correction
    // ------------------------------------------------------------------

    /// Keyboard/phonetic correction for short inputs. Inputs longer than the
    /// configured code-point limit return empty so the synchronous budget
    /// holds.
    pub fn spell_correct(&self, input: &str, max: usize) -> Vec<String> {
        if input.is_empty() || max == 0 || !self.unigram.is_loaded() {
            return Vec::new();
        }
        let input_u32 = self.utf32_cached(input);
        if input_u32.is_empty() || input_u32.len() > settings().correction.max_input_len {
            return Vec::new();
        }

        let key = format!("fast:{input}:{max}");
        if let Some(hit) = self.spell_cache.get(&key) {
            return hit;
        }

        let cands = generate(&input_u32, GenerationMode::Fast, max, None);
        let results = self.score_candidates(
            &input_u32,
            cands,
            settings().correction.fast_max_distance,
            max,
        );
        debug!(input, results = results.len(), "stage-2 correction");
        self.spell_cache.put(key, results.clone());
        results
    }

    /// Exact hit, else Stage-1 completions topped up with Stage-2
    /// corrections, deduplicated keeping the earlier stage's position.
    pub fn smart_predict(&self, prefix: &str, max: usize) -> Vec<String> {
        if prefix.is_empty() || max == 0 {
            return Vec::new();
        }
        if self.exact_match(prefix) {
            return vec![prefix.to_string()];
        }
        let mut results = self.fast_predict(prefix, max);
        if results.len() < max {
            for word in self.spell_correct(prefix, max - results.len()) {
                if !results.contains(&word) {
                    results.push(word);
                }
            }
        }
        results
    }

    // ------------------------------------------------------------------
    // Bigram context prediction
    // ------------------------------------------------------------------

    /// Next-word candidates for `prev` whose continuation starts with
    /// `cur_prefix`; bigram hits first (trie order), then Stage-1 top-ups.
    /// Degrades to Stage-1 alone when no bigram is available.
    pub fn context_predict(&self, prev: &str, cur_prefix: &str, max: usize) -> Vec<String> {
        if max == 0 {
            return Vec::new();
        }
        let key = format!("context:{prev}|{cur_prefix}:{max}");
        if let Some(hit) = self.context_cache.get(&key) {
            return hit;
        }

        let results = if prev.is_empty() || !self.bigram.is_loaded() {
            self.fast_predict(cur_prefix, max)
        } else {
            let shared = format!("{prev} ");
            let search_prefix = format!("{shared}{cur_prefix}");
            let mut results: Vec<String> = self
                .bigram
                .prefix_enumerate_all(&search_prefix, max * 2)
                .iter()
                .filter_map(|full_key| full_key.strip_prefix(&shared))
                .filter(|next| !next.is_empty())
                .map(str::to_string)
                .collect();
            results.truncate(max);

            if results.len() < max {
                for word in self.fast_predict(cur_prefix, max - results.len()) {
                    if !results.contains(&word) {
                        results.push(word);
                    }
                }
            }
            results
        };

        self.context_cache.put(key, results.clone());
        results
    }

    /// Bigram-only continuation of `prev`, no Stage-1 top-up.
    pub fn pure_context_predict(&self, prev: &str, max: usize) -> Vec<String> {
        if prev.is_empty() || max == 0 || !self.bigram.is_loaded() {
            return Vec::new();
        }
        let shared = format!("{prev} ");
        self.bigram
            .prefix_enumerate_all(&shared, max)
            .iter()
            .filter_map(|full_key| full_key.strip_prefix(&shared))
            .filter(|next| !next.is_empty())
            .map(str::to_string)
            .collect()
    }

    // ------------------------------------------------------------------
    // Stage 3: asynchronous full correction
    // ------------------------------------------------------------------

    /// Enqueue the full correction sweep. A new submission supersedes every
    /// pending one: the generation is bumped, stale tagged tasks are removed,
    /// and the worker re-checks the generation before work and before the
    /// callback, so at most the newest submission reports results.
    pub fn heavy_spell_correct_async<F>(self: &Arc<Self>, input: &str, callback: F)
    where
        F: FnOnce(Vec<String>) + Send + 'static,
    {
        let generation = self.heavy_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let dropped = self.queue.cancel(HEAVY_TAG_PREFIX);
        if dropped > 0 {
            debug!(dropped, "superseded pending corrections");
        }

        let me = Arc::clone(self);
        let input = input.to_string();
        self.queue.submit(
            HEAVY_PRIORITY,
            format!("{HEAVY_TAG_PREFIX}{generation}"),
            move || {
                if me.heavy_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                let results =
                    me.full_correct(&input, settings().predictor.heavy_results, generation);
                if me.heavy_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                callback(results);
            },
        );
    }

    /// Blocking wrapper around [`Self::heavy_spell_correct_async`] with the
    /// configured caller-side wait budget.
    pub fn heavy_spell_correct(self: &Arc<Self>, input: &str) -> Result<Vec<String>, PredictError> {
        let (tx, rx) = mpsc::channel();
        self.heavy_spell_correct_async(input, move |results| {
            let _ = tx.send(results);
        });
        rx.recv_timeout(Duration::from_millis(settings().predictor.heavy_timeout_ms))
            .map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => PredictError::Timeout,
                // The worker dropped the callback without firing: superseded.
                mpsc::RecvTimeoutError::Disconnected => PredictError::Cancelled,
            })
    }

    fn full_correct(&self, input: &str, max: usize, generation: u64) -> Vec<String> {
        if input.is_empty() || max == 0 || !self.unigram.is_loaded() {
            return Vec::new();
        }
        let key = format!("heavy:{input}:{max}");
        if let Some(hit) = self.spell_cache.get(&key) {
            return hit;
        }
        let input_u32 = self.utf32_cached(input);
        if input_u32.is_empty() {
            return Vec::new();
        }

        let stale = || self.heavy_generation.load(Ordering::SeqCst) != generation;
        let cands = generate(&input_u32, GenerationMode::Full, max, Some(&stale));
        if stale() {
            // Never cache a truncated batch.
            return Vec::new();
        }
        let results = self.score_candidates(
            &input_u32,
            cands,
            settings().correction.full_max_distance,
            max,
        );
        if stale() {
            return Vec::new();
        }
        debug!(input, results = results.len(), "stage-3 correction");
        self.spell_cache.put(key, results.clone());
        results
    }

    // ------------------------------------------------------------------
    // Shared scoring
    // ------------------------------------------------------------------

    /// Keep candidates that are dictionary members within `max_dist` of the
    /// input, sorted by ascending distance with ties in trie (byte) order.
    fn score_candidates(
        &self,
        input: &[char],
        cands: Vec<String>,
        max_dist: usize,
        max: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(String, usize)> = Vec::new();
        for cand in cands {
            if !self.unigram.exact_match(&cand) {
                continue;
            }
            let cand_u32 = self.utf32_cached(&cand);
            if cand_u32.is_empty() && !cand.is_empty() {
                continue; // unconvertible candidate, skipped per policy
            }
            let dist = bounded_damerau(input, &cand_u32, max_dist);
            if dist <= max_dist {
                scored.push((cand, dist));
            }
        }
        top_by_distance(scored, max)
    }

    fn utf32_cached(&self, word: &str) -> Vec<char> {
        let key = word.to_string();
        if let Some(hit) = self.utf32_cache.get(&key) {
            return hit;
        }
        match decode_utf32(word.as_bytes()) {
            Ok(cps) => {
                self.utf32_cache.put(key, cps.clone());
                cps
            }
            Err(e) => {
                debug!(error = %e, "skipping unconvertible text");
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Session bookkeeping
    // ------------------------------------------------------------------

    /// Record the last confirmed word for the next context query. Does not
    /// mutate any dictionary.
    pub fn process_word_submission(&self, word: &str) {
        *self.last_word.lock().unwrap() = word.to_string();
    }

    pub fn last_word(&self) -> String {
        self.last_word.lock().unwrap().clone()
    }

    pub fn info(&self) -> String {
        let mut out = String::from("=== Kazakh Context Predictor ===\n");
        for (name, lookup) in [("Unigram", &self.unigram), ("Bigram", &self.bigram)] {
            if lookup.is_loaded() {
                out.push_str(&format!("{name}: loaded ({} keys)\n", lookup.key_count()));
            } else {
                out.push_str(&format!("{name}: not loaded\n"));
            }
        }
        out.push_str(&format!(
            "Caches: prefix={} spell={} context={} utf32={}\n",
            self.prefix_cache.len(),
            self.spell_cache.len(),
            self.context_cache.len(),
            self.utf32_cache.len(),
        ));
        out.push_str(&format!(
            "Negative lookups: {}\n",
            self.unigram.negative_len()
        ));
        out
    }

    /// Stop accepting Stage-3 work and drain the queue.
    pub fn close(&self) {
        self.heavy_generation.fetch_add(1, Ordering::SeqCst);
        self.queue.shutdown();
    }
}

impl Default for ContextPredictor {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial sort: the `max` best `(word, distance)` pairs by ascending
/// distance, ties in byte order.
fn top_by_distance(mut scored: Vec<(String, usize)>, max: usize) -> Vec<String> {
    if max == 0 {
        return Vec::new();
    }
    let cmp =
        |a: &(String, usize), b: &(String, usize)| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0));
    if scored.len() > max {
        scored.select_nth_unstable_by(max - 1, cmp);
        scored.truncate(max);
    }
    scored.sort_by(cmp);
    scored.into_iter().map(|(word, _)| word).collect()
}
