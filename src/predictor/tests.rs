use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use super::{ContextPredictor, PredictError};
use crate::dict::StaticTrie;

fn predictor_with_unigram(words: &[&str]) -> Arc<ContextPredictor> {
    let p = Arc::new(ContextPredictor::new());
    p.install_unigram(StaticTrie::from_words(words));
    p
}

/// Park the task-queue worker inside a Stage-3 callback so later
/// submissions pile up behind it. Returns a sender that releases the worker.
fn block_worker(p: &Arc<ContextPredictor>) -> mpsc::Sender<()> {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    p.heavy_spell_correct_async("алма", move |_| {
        started_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    });
    started_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("gate callback did not start");
    release_tx
}

#[test]
fn fast_predict_in_trie_order() {
    let p = predictor_with_unigram(&["алма", "алмас", "ана", "ата"]);
    assert_eq!(p.fast_predict("ал", 10), vec!["алма", "алмас"]);
    assert_eq!(p.fast_predict("а", 10), vec!["алма", "алмас", "ана", "ата"]);
    assert_eq!(p.fast_predict("а", 2), vec!["алма", "алмас"]);
}

#[test]
fn fast_predict_unloaded_or_empty_is_empty() {
    let p = Arc::new(ContextPredictor::new());
    assert!(p.fast_predict("ал", 10).is_empty());
    let p = predictor_with_unigram(&["алма"]);
    assert!(p.fast_predict("", 10).is_empty());
    assert!(p.fast_predict("бөл", 10).is_empty());
}

#[test]
fn spell_correct_finds_phonetic_variant() {
    let p = predictor_with_unigram(&["алма", "алмас", "ана", "ата", "сәлем"]);
    let results = p.spell_correct("салем", 5);
    assert!(results.contains(&"сәлем".to_string()), "{results:?}");
}

#[test]
fn spell_correct_orders_by_distance() {
    // "сәлем" is distance 1 from the input, "сал" distance 2.
    let p = predictor_with_unigram(&["сәлем", "сал"]);
    assert_eq!(p.spell_correct("салем", 5), vec!["сәлем", "сал"]);
}

#[test]
fn spell_correct_rejects_long_input() {
    let p = predictor_with_unigram(&["алма"]);
    assert!(p.spell_correct("абвгдежзийк", 5).is_empty()); // 11 code points
}

#[test]
fn spell_correct_foreign_letter_yields_nothing() {
    let p = predictor_with_unigram(&["кітап"]);
    assert!(p.spell_correct("kітап", 5).is_empty());
}

#[test]
fn smart_predict_exact_hit_wins() {
    let p = predictor_with_unigram(&["алма", "алмас"]);
    assert_eq!(p.smart_predict("алма", 5), vec!["алма"]);
}

#[test]
fn smart_predict_tops_up_with_corrections() {
    let p = predictor_with_unigram(&["сәлем"]);
    // No completions for the misspelled prefix; Stage-2 fills in.
    assert_eq!(p.smart_predict("салем", 5), vec!["сәлем"]);
}

#[test]
fn smart_predict_dedups_across_stages() {
    let p = predictor_with_unigram(&["алма", "алмас", "адма"]);
    let results = p.smart_predict("алм", 10);
    let mut deduped = results.clone();
    deduped.dedup();
    assert_eq!(results, deduped);
    assert_eq!(results[0], "алма");
}

#[test]
fn context_predict_bigram_then_top_up() {
    let p = predictor_with_unigram(&["қазір", "қалт"]);
    p.install_bigram(StaticTrie::from_words(["сіз қалай", "сіз қайда", "сен кім"]));

    // Bigram continuations in trie order ("қайда" < "қалай" by bytes),
    // then Stage-1 completions of the current prefix.
    assert_eq!(
        p.context_predict("сіз", "қа", 5),
        vec!["қайда", "қалай", "қазір", "қалт"]
    );
}

#[test]
fn context_predict_bounds_bigram_results() {
    let p = Arc::new(ContextPredictor::new());
    p.install_unigram(StaticTrie::from_words(["бар"]));
    p.install_bigram(StaticTrie::from_words([
        "ол бара",
        "ол барды",
        "ол барған",
        "ол барса",
    ]));
    assert_eq!(p.context_predict("ол", "бар", 2).len(), 2);
}

#[test]
fn context_predict_degrades_without_bigram() {
    let p = predictor_with_unigram(&["қалай", "қайда"]);
    assert_eq!(p.context_predict("сіз", "қа", 5), vec!["қайда", "қалай"]);
    assert_eq!(p.context_predict("", "қа", 5), vec!["қайда", "қалай"]);
}

#[test]
fn pure_context_predict_is_bigram_only() {
    let p = predictor_with_unigram(&["қазір"]);
    p.install_bigram(StaticTrie::from_words(["сіз қалай", "сіз қайда"]));
    assert_eq!(p.pure_context_predict("сіз", 10), vec!["қайда", "қалай"]);
    assert!(p.pure_context_predict("ол", 10).is_empty());
    assert!(p.pure_context_predict("", 10).is_empty());
}

#[test]
fn heavy_async_only_newest_generation_fires() {
    let p = predictor_with_unigram(&["алма", "алмас", "сәлем"]);
    let release = block_worker(&p);

    let cb1_fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cb1_fired);
    p.heavy_spell_correct_async("абвг", move |_| {
        flag.store(true, Ordering::SeqCst);
    });

    let (tx, rx) = mpsc::channel();
    p.heavy_spell_correct_async("салем", move |results| {
        tx.send(results).unwrap();
    });

    release.send(()).unwrap();

    let results = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("newest submission must fire");
    assert!(results.contains(&"сәлем".to_string()));
    assert!(!cb1_fired.load(Ordering::SeqCst));
}

#[test]
fn heavy_blocking_times_out_while_worker_is_busy() {
    let p = predictor_with_unigram(&["алма"]);
    let release = block_worker(&p);

    let err = p.heavy_spell_correct("салем").unwrap_err();
    assert!(matches!(err, PredictError::Timeout));

    release.send(()).unwrap();
}

#[test]
fn heavy_blocking_after_close_is_cancelled() {
    let p = predictor_with_unigram(&["алма"]);
    p.close();
    let err = p.heavy_spell_correct("салем").unwrap_err();
    assert!(matches!(err, PredictError::Cancelled));
}

#[test]
fn heavy_blocking_returns_results() {
    let p = predictor_with_unigram(&["сәлем"]);
    let results = p.heavy_spell_correct("салем").unwrap();
    assert_eq!(results, vec!["сәлем"]);
}

#[test]
fn process_word_submission_records_last_word() {
    let p = predictor_with_unigram(&["алма"]);
    p.process_word_submission("сәлем");
    assert_eq!(p.last_word(), "сәлем");
    assert!(p.exact_match("алма")); // tries untouched
}

#[test]
fn clear_unloads_and_resets() {
    let p = predictor_with_unigram(&["алма"]);
    assert!(p.is_unigram_loaded());
    p.clear();
    assert!(!p.is_unigram_loaded());
    assert!(p.fast_predict("ал", 10).is_empty());
    assert_eq!(p.last_word(), "");
}

#[test]
fn info_reports_load_state() {
    let p = predictor_with_unigram(&["алма", "ана"]);
    let info = p.info();
    assert!(info.contains("Unigram: loaded (2 keys)"));
    assert!(info.contains("Bigram: not loaded"));
}

#[test]
fn load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let uni = dir.path().join("unigram.qzkd");
    let bi = dir.path().join("bigram.qzkd");
    std::fs::write(&uni, StaticTrie::from_words(["алма"]).to_bytes()).unwrap();
    std::fs::write(&bi, StaticTrie::from_words(["сіз қалай"]).to_bytes()).unwrap();

    let p = Arc::new(ContextPredictor::new());
    p.load_unigram(&uni).unwrap();
    p.load_bigram(&bi).unwrap();
    assert!(p.is_unigram_loaded());
    assert!(p.is_bigram_loaded());
    assert_eq!(p.context_predict("сіз", "қ", 5), vec!["қалай"]);

    assert!(p.load_unigram(&dir.path().join("missing.qzkd")).is_err());
}
