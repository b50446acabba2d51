//! In-memory staging table and atomic publication.
//!
//! Records accumulate in an attached `:memory:` database during analysis
//! and merge into the persistent table in a single transaction, so readers
//! never observe a partially written update.

use anyhow::{Context, Result};
use rusqlite::named_params;
use tracing::debug;

use super::Index;

// Same columns and order as the persistent table, minus the FK clause:
// `file` references a table in a different attached database. The unique
// index makes duplicate emissions coalesce already at staging time.
const STAGE_SCHEMA: &str = "
ATTACH ':memory:' AS stage;
CREATE TABLE stage.sindex (
    file INTEGER NOT NULL,
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    symbol TEXT NOT NULL,
    kind INTEGER NOT NULL,
    context TEXT,
    mode INTEGER NOT NULL
);
CREATE UNIQUE INDEX stage.sindex_0 ON sindex (symbol, kind, mode, file, line, column);
";

/// One normalized occurrence, ready for staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord<'a> {
    pub file: i64,
    pub line: u32,
    pub column: u32,
    pub symbol: &'a str,
    pub kind: u8,
    pub context: &'a str,
    pub mode: u32,
}

impl Index {
    /// Attach and create the scratch staging table. Called once at the
    /// start of an `add` run.
    pub fn attach_stage(&self) -> Result<()> {
        self.conn()
            .execute_batch(STAGE_SCHEMA)
            .context("unable to attach staging database")
    }

    /// Stage one record; duplicates of the uniqueness key are dropped.
    pub fn insert_record(&self, rec: &IndexRecord<'_>) -> Result<()> {
        let mut stmt = self.conn().prepare_cached(
            "INSERT OR IGNORE INTO stage.sindex \
             (file, line, column, symbol, kind, context, mode) \
             VALUES (@file, @line, @column, @symbol, @kind, @context, @mode)",
        )?;
        stmt.execute(named_params! {
            "@file": rec.file,
            "@line": rec.line,
            "@column": rec.column,
            "@symbol": rec.symbol,
            "@kind": rec.kind as i64,
            "@context": rec.context,
            "@mode": rec.mode,
        })?;
        Ok(())
    }

    /// Merge the staging table into the persistent index atomically.
    pub fn publish_stage(&self) -> Result<()> {
        let txn = self.begin_immediate()?;
        let merged = self
            .conn()
            .execute("INSERT OR IGNORE INTO sindex SELECT * FROM stage.sindex", [])?;
        txn.commit()?;
        debug!(merged, "published staging table");
        Ok(())
    }

    /// Number of persistent index records; used by tests and diagnostics.
    pub fn record_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM sindex", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::mode::{DEF, R_VAL};
    use crate::index::OpenMode;

    fn staged_index() -> (tempfile::TempDir, Index) {
        let dir = tempfile::TempDir::new().unwrap();
        let index = Index::open(dir.path().join("sindex.sqlite"), OpenMode::Create).unwrap();
        index.attach_stage().unwrap();
        (dir, index)
    }

    fn file_row(index: &Index, name: &str) -> i64 {
        index
            .conn()
            .execute(
                "INSERT INTO file (name, mtime) VALUES (?, 1)",
                [name],
            )
            .unwrap();
        index.conn().last_insert_rowid()
    }

    fn record(file: i64) -> IndexRecord<'static> {
        IndexRecord {
            file,
            line: 1,
            column: 5,
            symbol: "x",
            kind: b'v',
            context: "",
            mode: DEF,
        }
    }

    #[test]
    fn staged_records_publish_once() {
        let (_dir, index) = staged_index();
        let file = file_row(&index, "a.c");

        index.insert_record(&record(file)).unwrap();
        index.publish_stage().unwrap();

        assert_eq!(index.record_count().unwrap(), 1);
    }

    #[test]
    fn duplicate_emissions_coalesce() {
        let (_dir, index) = staged_index();
        let file = file_row(&index, "a.c");

        index.insert_record(&record(file)).unwrap();
        index.insert_record(&record(file)).unwrap();
        index.publish_stage().unwrap();

        assert_eq!(index.record_count().unwrap(), 1);
    }

    #[test]
    fn publish_tolerates_existing_rows() {
        let (_dir, index) = staged_index();
        let file = file_row(&index, "a.c");

        index.insert_record(&record(file)).unwrap();
        index.publish_stage().unwrap();

        // Same record staged again in a "second run".
        index.insert_record(&record(file)).unwrap();
        index
            .insert_record(&IndexRecord {
                mode: R_VAL,
                line: 2,
                ..record(file)
            })
            .unwrap();
        index.publish_stage().unwrap();

        assert_eq!(index.record_count().unwrap(), 2);
    }

    #[test]
    fn cascade_clears_records_with_the_file() {
        let (_dir, index) = staged_index();
        let file = file_row(&index, "a.c");

        index.insert_record(&record(file)).unwrap();
        index.publish_stage().unwrap();

        index
            .conn()
            .execute("DELETE FROM file WHERE name == 'a.c'", [])
            .unwrap();

        assert_eq!(index.record_count().unwrap(), 0);
    }
}
