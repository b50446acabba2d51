//! sindex: a persistent semantic index for C source code.
//!
//! The indexing pipeline consumes reporter callbacks from a C analyzer,
//! normalizes them into index records, stages the records in memory, and
//! merges them atomically into a SQLite store. Queries compile structured
//! search options into one parameterized SELECT whose rows feed a
//! format-string renderer.
//!
//! # Position Conventions
//!
//! - Lines are 1-indexed.
//! - Columns are 1-indexed byte offsets within the line (a tab counts as
//!   one column).
//! - Paths are stored relative to the project root, the working directory
//!   at invocation time; sources outside it contribute no records.

pub mod frontend;
pub mod index;
pub mod version;

pub use frontend::{Dissector, InputStream, Position, Reporter, SymbolEvent, SymbolKind};
pub use index::{
    FileLoc, Index, IndexRecord, IndexSink, LocationQuery, OpenMode, SearchOptions, SearchRow,
    StreamMap, StreamSlot,
};
