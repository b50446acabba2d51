//! Persistent semantic index backed by SQLite.
//!
//! One `Index` owns the connection. Write paths run under scoped
//! `BEGIN IMMEDIATE` transactions; cross-process contention is absorbed
//! by the store's busy timeout.

mod files;
pub mod mode;
mod query;
pub mod render;
mod sink;
mod stage;
mod store;

pub use files::{StreamMap, StreamSlot};
pub use query::{FileLoc, LocationQuery, SearchOptions, SearchRow};
pub use sink::IndexSink;
pub use stage::IndexRecord;
pub use store::{OpenMode, TxnGuard, SCHEMA_VERSION};

/// Handle to an on-disk semantic index.
pub struct Index {
    conn: rusqlite::Connection,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index").finish_non_exhaustive()
    }
}

impl Index {
    /// Raw connection access for queries the typed API does not cover.
    pub fn conn(&self) -> &rusqlite::Connection {
        &self.conn
    }
}
