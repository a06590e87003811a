//! Binary serialization for `StaticTrie`.
//!
//! Layout (little-endian, no padding):
//! magic `QZKD` (4) + version (1) + reserved (3) + key_count (u32), then per
//! key `u32 len; bytes[len]` with keys sorted lexicographically. The sorted
//! order lets `from_bytes` rebuild the arena with plain inserts and end up
//! bit-identical to `from_words` on the same set.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use super::static_trie::StaticTrie;
use super::DictError;

const MAGIC: &[u8; 4] = b"QZKD";
const VERSION: u8 = 1;
// magic(4) + version(1) + reserved(3) + key_count(4)
const HEADER_SIZE: usize = 12;

impl StaticTrie {
    pub fn to_bytes(&self) -> Vec<u8> {
        let keys: Vec<String> = self.predictive_search("").collect();
        let body: usize = keys.iter().map(|k| 4 + k.len()).sum();

        let mut buf = Vec::with_capacity(HEADER_SIZE + body);
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&[0u8; 3]); // reserved
        buf.extend_from_slice(&(keys.len() as u32).to_le_bytes());
        for key in &keys {
            buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
            buf.extend_from_slice(key.as_bytes());
        }
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DictError> {
        if data.len() < HEADER_SIZE {
            return Err(DictError::FileCorrupt("truncated header".into()));
        }
        if &data[..4] != MAGIC {
            return Err(DictError::FileCorrupt("bad magic".into()));
        }
        if data[4] != VERSION {
            return Err(DictError::VersionMismatch(data[4]));
        }

        let key_count = u32::from_le_bytes(data[8..12].try_into().unwrap()) as usize;
        let mut trie = Self::new();
        let mut pos = HEADER_SIZE;
        for i in 0..key_count {
            if pos + 4 > data.len() {
                return Err(DictError::FileCorrupt(format!(
                    "key {i}: length field past end of file"
                )));
            }
            let len = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
            pos += 4;
            if pos + len > data.len() {
                return Err(DictError::FileCorrupt(format!(
                    "key {i}: {len} bytes past end of file"
                )));
            }
            let key = std::str::from_utf8(&data[pos..pos + len])
                .map_err(|_| DictError::FileCorrupt(format!("key {i}: not UTF-8")))?;
            trie.insert(key);
            pos += len;
        }
        Ok(trie)
    }

    /// Load a dictionary file. The mapping is parsed into the arena and
    /// released; a missing file is reported as [`DictError::FileMissing`].
    pub fn open(path: &Path) -> Result<Self, DictError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DictError::FileMissing(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        // SAFETY: the file is opened read-only and the mapping is dropped
        // before this function returns.
        let mmap = unsafe { Mmap::map(&file)? };
        let trie = Self::from_bytes(&mmap)?;
        debug!(path = %path.display(), keys = trie.len(), "loaded static dictionary");
        Ok(trie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let trie = StaticTrie::from_words(["алма", "алмас", "ана", "сәлем"]);
        let restored = StaticTrie::from_bytes(&trie.to_bytes()).unwrap();
        assert_eq!(restored.len(), 4);
        let keys: Vec<String> = restored.predictive_search("").collect();
        assert_eq!(keys, vec!["алма", "алмас", "ана", "сәлем"]);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unigram.qzkd");
        let trie = StaticTrie::from_words(["кітап", "қалам"]);
        std::fs::write(&path, trie.to_bytes()).unwrap();

        let loaded = StaticTrie::open(&path).unwrap();
        assert!(loaded.exact_match("кітап"));
        assert!(loaded.exact_match("қалам"));
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = StaticTrie::open(&dir.path().join("absent.qzkd")).unwrap_err();
        assert!(matches!(err, DictError::FileMissing(_)));
    }

    #[test]
    fn from_bytes_bad_magic() {
        let err = StaticTrie::from_bytes(b"XXXX\x01\x00\x00\x00\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, DictError::FileCorrupt(_)));
    }

    #[test]
    fn from_bytes_version_mismatch() {
        let err = StaticTrie::from_bytes(b"QZKD\x07\x00\x00\x00\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, DictError::VersionMismatch(7)));
    }

    #[test]
    fn from_bytes_short_read() {
        let mut bytes = StaticTrie::from_words(["алма"]).to_bytes();
        bytes.truncate(bytes.len() - 2);
        let err = StaticTrie::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DictError::FileCorrupt(_)));
    }
}
