//! `chorus tag` — replace an entity's tag set and search tags.

use std::io::Write as _;
use std::path::Path;
use std::str::FromStr as _;

use clap::{Args, Subcommand};
use serde::Serialize;

use chorus_core::model::{EntityRef, EntityType};
use chorus_core::store::entity;
use chorus_search::{TagError, search_tags, set_tags, tags_for};

use crate::cmd::open_project;
use crate::output::{CliError, OutputMode, render, render_error};

#[derive(Args, Debug)]
pub struct TagArgs {
    #[command(subcommand)]
    pub command: TagCommand,
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    #[command(about = "Replace the tag set of an entity")]
    Set(TagSetArgs),

    #[command(about = "Search tag names by prefix")]
    Search(TagSearchArgs),
}

#[derive(Args, Debug)]
pub struct TagSetArgs {
    /// Entity type: workspace, dataset, workfile, instance, or user.
    pub entity_type: String,

    /// Entity id.
    pub entity_id: i64,

    /// Tag names (the new complete set; empty clears all tags).
    pub names: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TagSearchArgs {
    /// Name prefix to search for (empty lists everything).
    #[arg(default_value = "")]
    pub query: String,

    /// Entries to skip.
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Page size.
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
struct TagSetOutput {
    ok: bool,
    entity: String,
    tags: Vec<String>,
}

pub fn run_tag(args: &TagArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    chorus_search::ensure_schema(&project.conn)?;

    match &args.command {
        TagCommand::Set(set) => {
            let Ok(entity_type) = EntityType::from_str(&set.entity_type) else {
                let msg = format!("unknown entity type '{}'", set.entity_type);
                render_error(output, &CliError::new(&msg, "invalid_entity_type"))?;
                anyhow::bail!("{msg}");
            };
            let reference = EntityRef::new(entity_type, set.entity_id);

            if entity::find_entity(&project.conn, entity_type, set.entity_id)?.is_none() {
                let msg = format!("{reference} not found");
                render_error(output, &CliError::new(&msg, "entity_not_found"))?;
                anyhow::bail!("{msg}");
            }

            if let Err(error) = set_tags(&project.conn, reference, &set.names) {
                let code = match error {
                    TagError::EmptyName => "invalid_tag",
                    TagError::TooLong { .. } => "tag_too_long",
                    TagError::Storage(_) => "store_error",
                };
                render_error(output, &CliError::new(&error.to_string(), code))?;
                anyhow::bail!("{error}");
            }

            let tags = tags_for(&project.conn, reference)?;
            let result = TagSetOutput {
                ok: true,
                entity: reference.to_string(),
                tags,
            };
            render(output, &result, |r, w| {
                writeln!(w, "✓ {} tagged: {}", r.entity, r.tags.join(", "))
            })
        }
        TagCommand::Search(search) => {
            let hits = search_tags(&project.conn, &search.query, search.offset, search.limit)?;
            render(output, &hits, |list, w| {
                if list.is_empty() {
                    writeln!(w, "(no matching tags)")?;
                    return Ok(());
                }
                for hit in list {
                    writeln!(w, "{:>4}  {}", hit.count, hit.name)?;
                }
                Ok(())
            })
        }
    }
}
