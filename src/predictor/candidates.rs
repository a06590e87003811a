//! Deterministic edit-candidate generation for the correction stages.
//!
//! Both modes walk the input positions and apply keyboard-neighbor
//! substitution, single-position deletion, phonetic-class substitution and
//! adjacent swaps, deduplicating as they go. Fast mode caps substitutions
//! per position and the candidate total tightly enough for the synchronous
//! Stage-2 budget; Full mode allows every table entry under a larger total
//! cap and honors a cancellation probe between positions.

use std::collections::HashSet;

use crate::settings::settings;

use super::tables::{keyboard_neighbors, phonetic_partners};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Stage-2: bounded per-position substitutions, total cap 5 × max_results.
    Fast,
    /// Stage-3: all table entries, total cap 10 × max_results.
    Full,
}

/// Generate candidate words for `input`. `cancelled` is probed between
/// positions in Full mode; once it reports true the whole batch is
/// abandoned (the caller discards stale work anyway).
pub fn generate(
    input: &[char],
    mode: GenerationMode,
    max_results: usize,
    cancelled: Option<&dyn Fn() -> bool>,
) -> Vec<String> {
    let cfg = &settings().correction;
    let (per_position, total_cap) = match mode {
        GenerationMode::Fast => (
            cfg.fast_per_position,
            cfg.fast_candidate_factor * max_results,
        ),
        GenerationMode::Full => (usize::MAX, cfg.full_candidate_factor * max_results),
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    let push = |word: String, seen: &mut HashSet<String>, out: &mut Vec<String>| {
        if seen.insert(word.clone()) {
            out.push(word);
        }
    };

    let is_cancelled = || cancelled.is_some_and(|f| f());

    // Keyboard substitutions and deletions.
    for i in 0..input.len() {
        if out.len() >= total_cap {
            break;
        }
        if mode == GenerationMode::Full && is_cancelled() {
            return Vec::new();
        }

        for &neighbor in keyboard_neighbors(input[i]).iter().take(per_position) {
            if out.len() >= total_cap {
                break;
            }
            let mut candidate = input.to_vec();
            candidate[i] = neighbor;
            push(candidate.into_iter().collect(), &mut seen, &mut out);
        }

        if input.len() > 1 && out.len() < total_cap {
            let mut candidate = input.to_vec();
            candidate.remove(i);
            push(candidate.into_iter().collect(), &mut seen, &mut out);
        }
    }

    // Phonetic-class substitutions.
    for i in 0..input.len() {
        if out.len() >= total_cap {
            break;
        }
        if mode == GenerationMode::Full && is_cancelled() {
            return Vec::new();
        }

        for &partner in phonetic_partners(input[i]).iter().take(per_position) {
            if out.len() >= total_cap {
                break;
            }
            let mut candidate = input.to_vec();
            candidate[i] = partner;
            push(candidate.into_iter().collect(), &mut seen, &mut out);
        }
    }

    // Adjacent swaps.
    for i in 0..input.len().saturating_sub(1) {
        if out.len() >= total_cap {
            break;
        }
        if mode == GenerationMode::Full && is_cancelled() {
            return Vec::new();
        }
        let mut candidate = input.to_vec();
        candidate.swap(i, i + 1);
        push(candidate.into_iter().collect(), &mut seen, &mut out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn phonetic_substitution_present() {
        let out = generate(&chars("салем"), GenerationMode::Fast, 10, None);
        assert!(out.contains(&"сәлем".to_string()));
    }

    #[test]
    fn keyboard_substitution_present() {
        // л → д is the first keyboard alternative.
        let out = generate(&chars("алма"), GenerationMode::Fast, 10, None);
        assert!(out.contains(&"адма".to_string()));
    }

    #[test]
    fn deletion_and_swap_present() {
        let out = generate(&chars("аллма"), GenerationMode::Fast, 20, None);
        assert!(out.contains(&"алма".to_string())); // delete
        let out = generate(&chars("амла"), GenerationMode::Fast, 20, None);
        assert!(out.contains(&"алма".to_string())); // adjacent swap
    }

    #[test]
    fn single_char_words_are_never_deleted_to_empty() {
        let out = generate(&chars("а"), GenerationMode::Fast, 10, None);
        assert!(!out.contains(&String::new()));
    }

    #[test]
    fn deduplicated() {
        let out = generate(&chars("алма"), GenerationMode::Full, 10, None);
        let unique: HashSet<_> = out.iter().collect();
        assert_eq!(unique.len(), out.len());
    }

    #[test]
    fn fast_total_cap_obeyed() {
        let max_results = 2;
        let out = generate(&chars("алмалыққа"), GenerationMode::Fast, max_results, None);
        assert!(out.len() <= 5 * max_results);
    }

    #[test]
    fn full_generates_superset_of_fast() {
        let input = chars("қалай");
        let fast: HashSet<_> = generate(&input, GenerationMode::Fast, 10, None)
            .into_iter()
            .collect();
        let full: HashSet<_> = generate(&input, GenerationMode::Full, 10, None)
            .into_iter()
            .collect();
        assert!(fast.is_subset(&full));
    }

    #[test]
    fn cancelled_full_returns_nothing() {
        let cancelled = || true;
        let out = generate(
            &chars("алма"),
            GenerationMode::Full,
            10,
            Some(&cancelled),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn non_cyrillic_input_gets_no_substitutions() {
        let out = generate(&chars("ab"), GenerationMode::Fast, 10, None);
        // Only delete and swap candidates exist for letters outside the tables.
        let got: HashSet<String> = out.into_iter().collect();
        let want: HashSet<String> = ["a", "b", "ba"].iter().map(|s| s.to_string()).collect();
        assert_eq!(got, want);
    }
}
