//! `rm` command: delete files from the index by pattern.

use anyhow::Result;
use tracing::info;

use sindex::index::{Index, OpenMode};

use crate::cli::Config;

pub fn run_rm(config: &Config, patterns: &[String]) -> Result<()> {
    let index = Index::open(&config.database, OpenMode::ReadWrite)?;

    let txn = index.begin_immediate()?;
    let removed = index.remove_files(patterns)?;
    txn.commit()?;

    info!(removed, "files removed from index");
    Ok(())
}
