//! `add` command: drive the C analyzer and merge its records.

use anyhow::{Context, Result};
use tracing::info;

use sindex::frontend::{self, Dissector};
use sindex::index::{Index, IndexSink, OpenMode};

use crate::cli::Config;

pub fn run_add(config: &Config, include_local_syms: bool, tail: &[String]) -> Result<()> {
    let index = Index::open(&config.database, OpenMode::Create)?;
    index.attach_stage()?;

    let inputs = frontend::initialize(tail);
    let cwd = std::env::current_dir().context("unable to get current directory")?;
    let root =
        std::fs::canonicalize(&cwd).with_context(|| format!("realpath: {}", cwd.display()))?;

    let mut sink = IndexSink::new(&index, &inputs, root, include_local_syms);
    let mut dissector = Dissector::new()?;
    dissector.dissect(&inputs, &mut sink)?;

    index.publish_stage()?;
    info!(files = inputs.len(), "index updated");
    Ok(())
}
