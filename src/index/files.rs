//! File-identity registry: maps frontend streams to file rows.
//!
//! Each stream resolves once per run. Paths are stored relative to the
//! project root; anything outside contributes no records. A stale mtime
//! invalidates the file row (cascade clears its index records) before a
//! fresh insert.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use tracing::debug;

use super::Index;

/// Resolution state of one frontend stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSlot {
    /// Not looked at yet.
    Fresh,
    /// Outside the project root, or not a regular file.
    Ignored,
    /// Resolved to a file row.
    File(i64),
}

/// Arena of stream slots, indexed by the frontend's stream numbers.
/// Grows lazily; never shrinks during a run.
#[derive(Debug, Default)]
pub struct StreamMap {
    slots: Vec<StreamSlot>,
}

impl StreamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `stream`, registering its file on first sight.
    ///
    /// The lookup / delete-if-stale / insert sequence runs under a held
    /// write transaction so concurrent indexers cannot both insert the
    /// same path.
    pub fn ensure(
        &mut self,
        index: &Index,
        root: &Path,
        path: &Path,
        stream: usize,
    ) -> Result<StreamSlot> {
        if stream >= self.slots.len() {
            self.slots.resize(stream + 1, StreamSlot::Fresh);
        }
        if self.slots[stream] != StreamSlot::Fresh {
            return Ok(self.slots[stream]);
        }

        let meta = fs::metadata(path).with_context(|| format!("stat: {}", path.display()))?;
        let mtime = meta
            .modified()
            .with_context(|| format!("stat: {}", path.display()))?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let real = fs::canonicalize(path)
            .with_context(|| format!("realpath: {}", path.display()))?;

        let name = match real.strip_prefix(root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
            _ => {
                self.slots[stream] = StreamSlot::Ignored;
                return Ok(StreamSlot::Ignored);
            }
        };

        debug!(stream, name = %name, "registering stream");

        let txn = index.begin_immediate()?;
        let id = index.register_file(&name, mtime)?;
        txn.commit()?;

        self.slots[stream] = StreamSlot::File(id);
        Ok(StreamSlot::File(id))
    }
}

impl Index {
    /// Look up `name`, invalidating a stale row, and return its file id.
    /// Must run inside a write transaction.
    fn register_file(&self, name: &str, mtime: i64) -> Result<i64> {
        let mut select = self
            .conn()
            .prepare_cached("SELECT id, mtime FROM file WHERE name == ?")?;
        let found: Option<(i64, i64)> = select
            .query_row([name], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        if let Some((id, old_mtime)) = found {
            if old_mtime == mtime {
                return Ok(id);
            }
            debug!(name, old_mtime, mtime, "mtime changed, reindexing");
            let mut delete = self
                .conn()
                .prepare_cached("DELETE FROM file WHERE name == ?")?;
            delete.execute([name])?;
        }

        let mut insert = self
            .conn()
            .prepare_cached("INSERT INTO file (name, mtime) VALUES (?, ?)")?;
        insert.execute(rusqlite::params![name, mtime])?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Delete every file whose name matches one of the GLOB patterns;
    /// cascade clears the index records. Callers hold the transaction.
    pub fn remove_files(&self, patterns: &[String]) -> Result<usize> {
        let mut stmt = self
            .conn()
            .prepare_cached("DELETE FROM file WHERE name GLOB ?")?;
        let mut removed = 0;
        for pattern in patterns {
            debug!(pattern = %pattern, "removing files");
            removed += stmt.execute([pattern.as_str()])?;
        }
        Ok(removed)
    }

    /// Number of file rows; used by tests and diagnostics.
    pub fn file_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
