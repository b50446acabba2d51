//! Store bootstrap: open modes, pragmas, schema, version gate.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::Index;

/// Bumped whenever the on-disk layout changes; older stores are rebuilt,
/// never migrated.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE file (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    mtime INTEGER NOT NULL
);
CREATE TABLE sindex (
    file INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE,
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    symbol TEXT NOT NULL,
    kind INTEGER NOT NULL,
    context TEXT,
    mode INTEGER NOT NULL
);
CREATE UNIQUE INDEX sindex_0 ON sindex (symbol, kind, mode, file, line, column);
CREATE INDEX sindex_1 ON sindex (file);
";

/// How a command opens the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
    /// Read-write, creating and initializing the store when absent.
    Create,
}

impl Index {
    /// Open (or create) the store at `path`.
    ///
    /// An existing store whose schema version is older than
    /// [`SCHEMA_VERSION`] is rejected before any write touches it.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let exists = path.exists();

        let flags = match mode {
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::Create => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        };

        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("unable to open database: {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.pragma_update(None, "secure_delete", "FAST")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_millis(2147483647))?;

        let index = Self { conn };

        if exists {
            let version = index.schema_version()?;
            if version < SCHEMA_VERSION {
                bail!(
                    "{}: Database too old. Please rebuild it.",
                    path.display()
                );
            }
        } else {
            debug!(path = %path.display(), "creating index schema");
            index
                .conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
            index
                .conn
                .execute_batch(SCHEMA)
                .context("unable to create index schema")?;
        }

        Ok(index)
    }

    fn schema_version(&self) -> Result<i64> {
        self.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| anyhow!("unable to read schema version: {}", e))
    }

    /// Start a write transaction released on every exit path: `commit()`
    /// consumes the guard, dropping it rolls back.
    pub fn begin_immediate(&self) -> Result<TxnGuard<'_>> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .context("unable to begin transaction")?;
        Ok(TxnGuard {
            conn: &self.conn,
            committed: false,
        })
    }
}

/// Scoped write transaction over the index connection.
pub struct TxnGuard<'c> {
    conn: &'c Connection,
    committed: bool,
}

impl TxnGuard<'_> {
    pub fn commit(mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("unable to commit transaction")?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TxnGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
