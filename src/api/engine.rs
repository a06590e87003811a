use std::path::Path;
use std::sync::Arc;

use crate::predictor::ContextPredictor;
use crate::user_dict::UserDictionary;

use super::EngineError;

/// One engine instance per input session host.
///
/// All prediction inputs and outputs are UTF-8 strings. Static-trie reads
/// never take the engine-level locks; load and clear serialize inside the
/// trie façades.
pub struct Engine {
    predictor: Arc<ContextPredictor>,
    user_dict: Arc<UserDictionary>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            predictor: Arc::new(ContextPredictor::new()),
            user_dict: Arc::new(UserDictionary::new()),
        }
    }

    // ------------------------------------------------------------------
    // Static-dictionary façade
    // ------------------------------------------------------------------

    pub fn load_unigram(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.predictor.load_unigram(path.as_ref())?;
        Ok(())
    }

    pub fn load_bigram(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.predictor.load_bigram(path.as_ref())?;
        Ok(())
    }

    pub fn is_unigram_loaded(&self) -> bool {
        self.predictor.is_unigram_loaded()
    }

    pub fn is_bigram_loaded(&self) -> bool {
        self.predictor.is_bigram_loaded()
    }

    pub fn exact_match(&self, word: &str) -> bool {
        self.predictor.exact_match(word)
    }

    /// Prefix completions in trie order (default `max` 20).
    pub fn prefix_search(&self, prefix: &str, max: usize) -> Vec<String> {
        self.predictor.fast_predict(prefix, max)
    }

    /// Stage-1 completion (default `max` 10).
    pub fn fast_predict(&self, prefix: &str, max: usize) -> Vec<String> {
        self.predictor.fast_predict(prefix, max)
    }

    /// Stage-2 synchronous correction (default `max` 10).
    pub fn spell_correct(&self, input: &str, max: usize) -> Vec<String> {
        self.predictor.spell_correct(input, max)
    }

    /// Exact hit, completions, then corrections (default `max` 15).
    pub fn smart_predict(&self, prefix: &str, max: usize) -> Vec<String> {
        self.predictor.smart_predict(prefix, max)
    }

    /// Bigram continuations topped up with completions (default `max` 15).
    pub fn context_predict(&self, prev: &str, cur_prefix: &str, max: usize) -> Vec<String> {
        self.predictor.context_predict(prev, cur_prefix, max)
    }

    /// Bigram-only continuations (default `max` 10).
    pub fn pure_context_predict(&self, prev: &str, max: usize) -> Vec<String> {
        self.predictor.pure_context_predict(prev, max)
    }

    pub fn heavy_spell_correct_async<F>(&self, input: &str, callback: F)
    where
        F: FnOnce(Vec<String>) + Send + 'static,
    {
        self.predictor.heavy_spell_correct_async(input, callback);
    }

    /// Blocking Stage-3 wrapper with the configured caller-side budget.
    pub fn heavy_spell_correct(&self, input: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.predictor.heavy_spell_correct(input)?)
    }

    pub fn process_word_submission(&self, word: &str) {
        self.predictor.process_word_submission(word);
    }

    pub fn info(&self) -> String {
        self.predictor.info()
    }

    /// Drain the task queue and stop Stage-3.
    pub fn close(&self) {
        self.predictor.close();
    }

    // ------------------------------------------------------------------
    // User-dictionary façade
    // ------------------------------------------------------------------

    pub fn user_dict(&self) -> &UserDictionary {
        &self.user_dict
    }

    /// Tear down both subsystems: drain the task queue, join the snapshot
    /// builder. Persistence happens only through an explicit save.
    pub fn shutdown(&self) {
        self.close();
        self.user_dict.shutdown();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
