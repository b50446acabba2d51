//! Reporter sink: normalizes frontend callbacks into staged records.
//!
//! Filtering order per callback: resolve the stream (dropping ignored
//! ones), apply the locality filter, then reject anonymous symbols with
//! a warning. Member references get the composite `<tag>.<member>`
//! symbol, `?` standing in for missing idents and `*` for access to the
//! whole aggregate.

use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

use crate::frontend::{InputStream, Position, Reporter, SymbolEvent};

use super::{Index, IndexRecord, StreamMap, StreamSlot};

pub struct IndexSink<'a> {
    index: &'a Index,
    streams: StreamMap,
    inputs: &'a [InputStream],
    root: PathBuf,
    include_locals: bool,
}

impl<'a> IndexSink<'a> {
    /// `root` is the project root; records for sources outside it are
    /// silently dropped.
    pub fn new(
        index: &'a Index,
        inputs: &'a [InputStream],
        root: PathBuf,
        include_locals: bool,
    ) -> Self {
        Self {
            index,
            streams: StreamMap::new(),
            inputs,
            root,
            include_locals,
        }
    }

    fn file_id(&mut self, stream: usize) -> Result<Option<i64>> {
        let path = match self.inputs.get(stream) {
            Some(input) => input.path.clone(),
            None => return Ok(None),
        };
        match self.streams.ensure(self.index, &self.root, &path, stream)? {
            StreamSlot::File(id) => Ok(Some(id)),
            _ => Ok(None),
        }
    }
}

impl Reporter for IndexSink<'_> {
    fn symbol(&mut self, mode: u32, pos: Position, sym: &SymbolEvent<'_>) -> Result<()> {
        let Some(file) = self.file_id(pos.stream)? else {
            return Ok(());
        };
        if sym.is_local && !self.include_locals {
            return Ok(());
        }
        let Some(ident) = sym.ident else {
            warn!(line = pos.line, column = pos.column, "empty ident");
            return Ok(());
        };

        self.index.insert_record(&IndexRecord {
            file,
            line: pos.line,
            column: pos.column,
            symbol: ident,
            kind: sym.kind.code(),
            context: sym.context.unwrap_or(""),
            mode,
        })
    }

    fn member(
        &mut self,
        mode: u32,
        pos: Position,
        tag: &SymbolEvent<'_>,
        member: Option<&SymbolEvent<'_>>,
    ) -> Result<()> {
        let Some(file) = self.file_id(pos.stream)? else {
            return Ok(());
        };
        if tag.is_local && !self.include_locals {
            return Ok(());
        }

        // `member == None` means the entire aggregate is accessed.
        let tag_name = tag.ident.unwrap_or("?");
        let member_name = match member {
            Some(m) => m.ident.unwrap_or("?"),
            None => "*",
        };
        let symbol = format!("{}.{}", tag_name, member_name);
        let context = member
            .and_then(|m| m.context)
            .or(tag.context)
            .unwrap_or("");

        self.index.insert_record(&IndexRecord {
            file,
            line: pos.line,
            column: pos.column,
            symbol: &symbol,
            kind: b'm',
            context,
            mode,
        })
    }
}
