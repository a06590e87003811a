//! Static dictionary storage.
//!
//! `StaticTrie` is the immutable prefix-iterating trie behind the tiered
//! predictor; `TrieLookup` wraps one trie with the mutex-serialized access
//! and the negative-lookup filter the predictor shares across stages.

mod lookup;
mod static_trie;
mod trie_io;

pub use lookup::TrieLookup;
pub use static_trie::StaticTrie;

use std::io;
use std::path::PathBuf;

/// Unified error type for static-dictionary loading.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("dictionary not loaded")]
    NotLoaded,

    #[error("dictionary file missing: {0}")]
    FileMissing(PathBuf),

    #[error("dictionary file corrupt: {0}")]
    FileCorrupt(String),

    #[error("unsupported dictionary version: {0}")]
    VersionMismatch(u8),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
