//! `chorus search` — full-text search over note bodies.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;

use chorus_core::store::query;
use chorus_search::search_notes;

use crate::cmd::open_project;
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// FTS5 query (supports stemming, prefix `*`, boolean operators).
    pub query: String,

    /// Maximum hits to return.
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
struct SearchHitOutput {
    event_id: i64,
    rank: f64,
    kind: String,
    body: String,
}

pub fn run_search(
    args: &SearchArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    chorus_search::ensure_schema(&project.conn)?;

    let hits = search_notes(&project.conn, &args.query, args.limit)?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(event) = query::load_event(&project.conn, hit.event_id)? else {
            continue;
        };
        results.push(SearchHitOutput {
            event_id: hit.event_id,
            rank: hit.rank,
            kind: event.kind.to_string(),
            body: event.body().unwrap_or_default().to_string(),
        });
    }

    render(output, &results, |list, w| {
        if list.is_empty() {
            writeln!(w, "(no matching notes)")?;
            return Ok(());
        }
        for hit in list {
            writeln!(w, "#{} {}  {}", hit.event_id, hit.kind, hit.body)?;
        }
        Ok(())
    })
}
