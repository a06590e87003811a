//! Versioned binary serialization of the user-dictionary working set.
//!
//! Layout (little-endian, no padding), `FILE_FORMAT_VERSION = 3`:
//!
//! ```text
//! u32 version
//! u32 entry_count
//! repeat entry_count:
//!   u32 word_len; bytes[word_len]                  // UTF-8 as typed
//!   u32 norm_len; bytes[norm_len]                  // UTF-8 normalized
//!   i32 frequency
//!   u64 created_ms
//!   u64 last_used_ms
//!   u32 ctx_count
//!   repeat ctx_count: u32 ctx_len; bytes[ctx_len]  // UTF-8 normalized
//! ```
//!
//! The layout is normative, so fields are written by hand rather than
//! through a serialization crate. Loading is forgiving: a missing, empty,
//! corrupt or version-mismatched file becomes an empty working set.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::{UserEntry, WorkingSet};

pub(crate) const FILE_FORMAT_VERSION: u32 = 3;

pub(crate) fn write_working_set(working: &WorkingSet, path: &Path) -> io::Result<()> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&FILE_FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(working.entries.len() as u32).to_le_bytes());
    for entry in working.entries.values() {
        write_field(&mut buf, &entry.word);
        write_field(&mut buf, &entry.normalized);
        buf.extend_from_slice(&entry.frequency.to_le_bytes());
        buf.extend_from_slice(&entry.created_ms.to_le_bytes());
        buf.extend_from_slice(&entry.last_used_ms.to_le_bytes());
        buf.extend_from_slice(&(entry.contexts.len() as u32).to_le_bytes());
        for context in &entry.contexts {
            write_field(&mut buf, context);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(&buf)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), entries = working.entries.len(), "saved user dictionary");
    Ok(())
}

pub(crate) fn read_working_set(path: &Path) -> io::Result<WorkingSet> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no user dictionary file; starting empty");
            return Ok(WorkingSet::new());
        }
        Err(e) => return Err(e),
    };
    if bytes.is_empty() {
        return Ok(WorkingSet::new());
    }

    match parse(&bytes) {
        Ok(working) => {
            debug!(path = %path.display(), entries = working.entries.len(), "loaded user dictionary");
            Ok(working)
        }
        Err(reason) => {
            warn!(path = %path.display(), reason, "unreadable user dictionary; starting empty");
            Ok(WorkingSet::new())
        }
    }
}

fn write_field(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn parse(bytes: &[u8]) -> Result<WorkingSet, String> {
    let mut r = Reader { bytes, pos: 0 };

    let version = r.u32()?;
    if version != FILE_FORMAT_VERSION {
        return Err(format!("version {version} != {FILE_FORMAT_VERSION}"));
    }

    let count = r.u32()?;
    let mut working = WorkingSet::new();
    for i in 0..count {
        let word = r.string().map_err(|e| format!("entry {i}: {e}"))?;
        let normalized = r.string().map_err(|e| format!("entry {i}: {e}"))?;
        let frequency = r.i32().map_err(|e| format!("entry {i}: {e}"))?;
        let created_ms = r.u64().map_err(|e| format!("entry {i}: {e}"))?;
        let last_used_ms = r.u64().map_err(|e| format!("entry {i}: {e}"))?;
        let ctx_count = r.u32().map_err(|e| format!("entry {i}: {e}"))?;
        let mut contexts = Vec::new();
        for j in 0..ctx_count {
            contexts.push(
                r.string()
                    .map_err(|e| format!("entry {i} context {j}: {e}"))?,
            );
        }

        if normalized.is_empty() || frequency <= 0 {
            return Err(format!("entry {i}: invalid word or frequency"));
        }

        working.trie_insert(&normalized);
        for context in &contexts {
            working
                .contexts
                .entry(context.clone())
                .or_default()
                .push(normalized.clone());
        }
        working.words.insert(word.clone(), normalized.clone());
        working.word_count += 1;
        working.total_frequency += i64::from(frequency);
        working.entries.insert(
            normalized.clone(),
            UserEntry {
                word,
                normalized,
                frequency,
                contexts,
                created_ms,
                last_used_ms,
            },
        );
    }

    working.dirty = false;
    Ok(working)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, len: usize) -> Result<&[u8], String> {
        if self.pos + len > self.bytes.len() {
            return Err(format!(
                "short read: {len} bytes at offset {} past end of file",
                self.pos
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, String> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, String> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, String> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String, String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| "field is not UTF-8".to_string())
    }
}
