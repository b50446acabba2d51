//! C frontend interface: streams, positions, symbol events, and the
//! reporter capability consumed by the analyzer.
//!
//! Positions are 1-based for both lines and columns; a column counts
//! bytes within the line, so a tab occupies exactly one column.

mod dissect;

use std::path::PathBuf;

use anyhow::Result;

pub use dissect::Dissector;

use crate::index::mode;

/// A point in one input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub stream: usize,
    pub line: u32,
    pub column: u32,
}

/// One-letter symbol classifier; the ASCII code is what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Struct, union, or enum tag.
    StructTag,
    Function,
    Variable,
    Member,
}

impl SymbolKind {
    pub fn code(self) -> u8 {
        match self {
            SymbolKind::StructTag => b's',
            SymbolKind::Function => b'f',
            SymbolKind::Variable => b'v',
            SymbolKind::Member => b'm',
        }
    }
}

/// A symbol as seen by the analyzer at one point.
///
/// `context` carries the identifier of the enclosing top-level
/// definition, `None` at file scope.
#[derive(Debug, Clone, Copy)]
pub struct SymbolEvent<'a> {
    pub ident: Option<&'a str>,
    pub kind: SymbolKind,
    pub pos: Position,
    pub is_local: bool,
    pub context: Option<&'a str>,
}

/// Callback set consumed by the analyzer.
///
/// Definitions delegate to the use callbacks with the definition mode by
/// default, so a sink only has to implement `symbol` and `member`.
pub trait Reporter {
    /// A use of `sym` with the given access mode.
    fn symbol(&mut self, mode: u32, pos: Position, sym: &SymbolEvent<'_>) -> Result<()>;

    /// A use of a member of the aggregate `tag`; `member == None` means
    /// the entire aggregate is accessed.
    fn member(
        &mut self,
        mode: u32,
        pos: Position,
        tag: &SymbolEvent<'_>,
        member: Option<&SymbolEvent<'_>>,
    ) -> Result<()>;

    /// A definition of `sym`.
    fn symdef(&mut self, sym: &SymbolEvent<'_>) -> Result<()> {
        self.symbol(mode::DEF, sym.pos, sym)
    }

    /// A definition of a struct/union member.
    fn memdef(&mut self, tag: &SymbolEvent<'_>, member: &SymbolEvent<'_>) -> Result<()> {
        self.member(mode::DEF, member.pos, tag, Some(member))
    }
}

/// One translation-unit input; stream numbers index into the list.
#[derive(Debug, Clone)]
pub struct InputStream {
    pub path: PathBuf,
}

/// Build the stream list from the CLI tail.
///
/// Compiler-style options are accepted and skipped; the remaining tokens
/// name input files in order.
pub fn initialize(tail: &[String]) -> Vec<InputStream> {
    tail.iter()
        .filter(|arg| !arg.starts_with('-'))
        .map(|arg| InputStream {
            path: PathBuf::from(arg),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes() {
        assert_eq!(SymbolKind::StructTag.code(), b's');
        assert_eq!(SymbolKind::Function.code(), b'f');
        assert_eq!(SymbolKind::Variable.code(), b'v');
        assert_eq!(SymbolKind::Member.code(), b'm');
    }

    #[test]
    fn initialize_skips_options() {
        let tail: Vec<String> = ["-I", "-DFOO=1", "a.c", "sub/b.c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let streams = initialize(&tail);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].path, PathBuf::from("a.c"));
        assert_eq!(streams[1].path, PathBuf::from("sub/b.c"));
    }
}
