//! Search query compilation.
//!
//! Translates structured search options into one parameterized SELECT.
//! Every user-supplied value travels as a bound parameter; the only
//! interpolated fragments are column names and fixed comparators.

use anyhow::Result;
use rusqlite::types::ToSql;
use tracing::debug;

use super::mode::ModeFilter;
use super::Index;

/// A `filename[:line[:column]]` location argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLoc {
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Location-driven search modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationQuery {
    /// Every record at the given point.
    Explain(FileLoc),
    /// Every record whose symbol occurs at the given point.
    Usage(FileLoc),
}

/// AND-combined search filters; all optional.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub symbol: Option<String>,
    pub path: Option<String>,
    pub kind: Option<u8>,
    pub mode: Option<ModeFilter>,
    pub location: Option<LocationQuery>,
}

/// One projected result row, in renderer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub file: String,
    pub line: i64,
    pub column: i64,
    pub context: String,
    pub symbol: String,
    pub mode: u32,
    pub kind: i64,
}

/// GLOB metacharacters turn a symbol argument into a pattern match.
fn is_pattern(text: &str) -> bool {
    text.bytes()
        .any(|b| matches!(b, b'*' | b'?' | b'[' | b']'))
}

fn push_loc(sql: &mut String, params: &mut Vec<Box<dyn ToSql>>, loc: &FileLoc) {
    sql.push_str(" AND file.name == ?");
    params.push(Box::new(loc.file.clone()));
    if let Some(line) = loc.line {
        sql.push_str(" AND sindex.line == ?");
        params.push(Box::new(line));
    }
    if let Some(column) = loc.column {
        sql.push_str(" AND sindex.column == ?");
        params.push(Box::new(column));
    }
}

impl Index {
    /// Run a compiled search; rows come back ordered by
    /// `(file.name, line, column)` ascending, which the renderer's
    /// source-line cursor depends on.
    pub fn search(&self, opts: &SearchOptions) -> Result<Vec<SearchRow>> {
        let mut sql = String::from(
            "SELECT file.name, sindex.line, sindex.column, sindex.context, \
             sindex.symbol, sindex.mode, sindex.kind \
             FROM sindex, file WHERE sindex.file == file.id",
        );
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(kind) = opts.kind {
            sql.push_str(" AND sindex.kind == ?");
            params.push(Box::new(kind as i64));
        }

        if let Some(symbol) = &opts.symbol {
            if is_pattern(symbol) {
                sql.push_str(" AND sindex.symbol GLOB ?");
            } else {
                sql.push_str(" AND sindex.symbol == ?");
            }
            params.push(Box::new(symbol.clone()));
        }

        match opts.mode {
            Some(ModeFilter::Exact(value)) => {
                sql.push_str(" AND sindex.mode == ?");
                params.push(Box::new(value));
            }
            Some(ModeFilter::Any(mask)) => {
                sql.push_str(" AND (sindex.mode & ?) != 0");
                params.push(Box::new(mask));
            }
            None => {}
        }

        if let Some(path) = &opts.path {
            sql.push_str(" AND file.name GLOB ?");
            params.push(Box::new(path.clone()));
        }

        match &opts.location {
            Some(LocationQuery::Explain(loc)) => push_loc(&mut sql, &mut params, loc),
            Some(LocationQuery::Usage(loc)) => {
                sql.push_str(
                    " AND sindex.symbol IN (\
                     SELECT sindex.symbol FROM sindex, file \
                     WHERE sindex.file == file.id",
                );
                push_loc(&mut sql, &mut params, loc);
                sql.push(')');
            }
            None => {}
        }

        sql.push_str(" ORDER BY file.name, sindex.line, sindex.column ASC");

        debug!(sql = %sql, "search query");

        let mut stmt = self.conn().prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(&param_refs[..], |row| {
                Ok(SearchRow {
                    file: row.get(0)?,
                    line: row.get(1)?,
                    column: row.get(2)?,
                    context: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    symbol: row.get(4)?,
                    mode: row.get(5)?,
                    kind: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}
