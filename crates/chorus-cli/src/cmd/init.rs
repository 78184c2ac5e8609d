//! `chorus init` — create the store and search schema.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use tracing::info;

use chorus_core::config::{CHORUS_DIR, STORE_FILE};
use chorus_core::store;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct InitArgs {}

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    store_path: String,
    already_initialized: bool,
}

pub fn run_init(
    _args: &InitArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let chorus_dir = project_root.join(CHORUS_DIR);
    let already_initialized = chorus_dir.join(STORE_FILE).exists();

    let store_path = chorus_dir.join(STORE_FILE);
    let conn = store::open_store(&store_path)?;
    chorus_search::ensure_schema(&conn)?;

    info!(path = %store_path.display(), "store initialized");

    let result = InitOutput {
        ok: true,
        store_path: store_path.display().to_string(),
        already_initialized,
    };

    render(output, &result, |r, w| {
        if r.already_initialized {
            writeln!(w, "chorus store already present at {}", r.store_path)
        } else {
            writeln!(w, "initialized chorus store at {}", r.store_path)
        }
    })
}
