//! `chorus dataset` — register and remove workspace datasets.

use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use chorus_core::event::{EmitRequest, EventKind, TargetRole, emit};
use chorus_core::model::{EntityRef, EntityType, User, Workspace};
use chorus_core::store::entity;

use crate::cmd::{open_project, resolve_identity};
use crate::output::{CliError, OutputMode, render, render_error};

#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub command: DatasetCommand,
}

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    #[command(about = "Register a source table in a workspace")]
    Add(DatasetAddArgs),

    #[command(about = "Remove a dataset (old feed references tombstone)")]
    Rm(DatasetRmArgs),
}

#[derive(Args, Debug)]
pub struct DatasetAddArgs {
    /// Workspace id.
    pub workspace: i64,

    /// Dataset (table) name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct DatasetRmArgs {
    /// Dataset id.
    pub dataset: i64,
}

#[derive(Debug, Serialize)]
struct DatasetOutput {
    ok: bool,
    dataset_id: i64,
    event_id: Option<i64>,
}

/// Datasets may be touched by workspace members and site admins.
fn member_gate(
    actor: &User,
    workspace: &Workspace,
    output: OutputMode,
) -> anyhow::Result<()> {
    if actor.is_admin || workspace.has_member(actor.id) {
        return Ok(());
    }
    let msg = format!(
        "user {} is not a member of workspace {}",
        actor.id, workspace.id
    );
    render_error(
        output,
        &CliError::with_details(&msg, "Ask the owner for membership", "permission_denied"),
    )?;
    anyhow::bail!("{msg}");
}

pub fn run_dataset(
    args: &DatasetArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut project = open_project(project_root, output)?;
    let actor = resolve_identity(&project.conn, user_flag, output)?;

    match &args.command {
        DatasetCommand::Add(add) => {
            let Some(workspace) = entity::get_workspace(&project.conn, add.workspace)? else {
                let msg = format!("workspace {} not found", add.workspace);
                render_error(output, &CliError::new(&msg, "workspace_not_found"))?;
                anyhow::bail!("{msg}");
            };
            member_gate(&actor, &workspace, output)?;

            let dataset_id = entity::create_dataset(&project.conn, add.workspace, &add.name)?;
            let event = emit(
                &mut project.conn,
                &EmitRequest::new(EventKind::SourceTableCreated, actor.id)
                    .target(
                        TargetRole::Target1,
                        EntityRef::new(EntityType::Dataset, dataset_id),
                    )
                    .target(
                        TargetRole::Workspace,
                        EntityRef::new(EntityType::Workspace, add.workspace),
                    ),
            )?;

            let result = DatasetOutput {
                ok: true,
                dataset_id,
                event_id: Some(event.id),
            };
            render(output, &result, |r, w| {
                writeln!(w, "✓ dataset {} registered", r.dataset_id)
            })
        }
        DatasetCommand::Rm(rm) => {
            let Some(dataset) = entity::get_dataset(&project.conn, rm.dataset)? else {
                let msg = format!("dataset {} not found", rm.dataset);
                render_error(output, &CliError::new(&msg, "entity_not_found"))?;
                anyhow::bail!("{msg}");
            };
            let Some(workspace) = entity::get_workspace(&project.conn, dataset.workspace_id)?
            else {
                let msg = format!("workspace {} not found", dataset.workspace_id);
                render_error(output, &CliError::new(&msg, "workspace_not_found"))?;
                anyhow::bail!("{msg}");
            };
            member_gate(&actor, &workspace, output)?;

            entity::delete_dataset(&project.conn, rm.dataset)?;
            let result = DatasetOutput {
                ok: true,
                dataset_id: rm.dataset,
                event_id: None,
            };
            render(output, &result, |r, w| {
                writeln!(w, "✓ dataset {} removed", r.dataset_id)
            })
        }
    }
}
