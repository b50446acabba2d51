//! `search` command: compile the query, render the rows.

use std::io::Write;

use anyhow::Result;

use sindex::index::render::{self, SourceLines};
use sindex::index::{Index, OpenMode, SearchOptions};

use crate::cli::Config;

pub fn run_search(config: &Config, format: &str, options: &SearchOptions) -> Result<()> {
    // A malformed format string fails before the store is touched.
    let pieces = render::compile_format(format)?;

    let index = Index::open(&config.database, OpenMode::ReadOnly)?;
    let rows = index.search(options)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut source = SourceLines::new();
    for row in &rows {
        render::render_row(&pieces, row, &mut source, &mut out)?;
    }
    out.flush()?;
    Ok(())
}
