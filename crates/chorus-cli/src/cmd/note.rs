//! `chorus note` — post a free-text note on an entity.
//!
//! The entity type picks the event kind: instance notes split by flavor,
//! dataset and workfile notes carry their owning workspace role, workspace
//! notes carry only the workspace role. Posted notes are indexed for
//! search-within-feed immediately.

use std::io::Write as _;
use std::path::Path;
use std::str::FromStr as _;

use clap::Args;
use serde::Serialize;

use chorus_core::access;
use chorus_core::event::{EmitRequest, EventKind, TargetRole, emit};
use chorus_core::model::{Entity, EntityRef, EntityType, InstanceFlavor};
use chorus_core::store::entity;

use crate::cmd::{open_project, resolve_identity};
use crate::output::{CliError, OutputMode, render, render_error};
use crate::validate;

#[derive(Args, Debug)]
pub struct NoteArgs {
    /// Entity type: workspace, dataset, workfile, or instance.
    pub entity_type: String,

    /// Entity id.
    pub entity_id: i64,

    /// Note body.
    pub body: String,
}

#[derive(Debug, Serialize)]
struct NoteOutput {
    ok: bool,
    event_id: i64,
    kind: String,
    ts: i64,
}

pub fn run_note(
    args: &NoteArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut project = open_project(project_root, output)?;
    let actor = resolve_identity(&project.conn, user_flag, output)?;

    if let Err(e) = validate::validate_body(&args.body, project.config.notes.max_body_chars) {
        render_error(output, &e.to_cli_error())?;
        anyhow::bail!("{}", e.reason);
    }

    let Ok(entity_type) = EntityType::from_str(&args.entity_type) else {
        let msg = format!("unknown entity type '{}'", args.entity_type);
        render_error(
            output,
            &CliError::with_details(
                &msg,
                "Use workspace, dataset, workfile, or instance",
                "invalid_entity_type",
            ),
        )?;
        anyhow::bail!("{msg}");
    };

    if entity_type == EntityType::User {
        let msg = "notes on users are not supported";
        render_error(
            output,
            &CliError::with_details(
                msg,
                "Use workspace, dataset, workfile, or instance",
                "invalid_entity_type",
            ),
        )?;
        anyhow::bail!("{msg}");
    }

    let Some(target) = entity::find_entity(&project.conn, entity_type, args.entity_id)? else {
        let msg = format!("{} {} not found", entity_type, args.entity_id);
        render_error(output, &CliError::new(&msg, "entity_not_found"))?;
        anyhow::bail!("{msg}");
    };

    // Workspace-scoped subjects require the actor to see the workspace.
    if let Some(workspace_id) = target.workspace_id() {
        let Some(workspace) = entity::get_workspace(&project.conn, workspace_id)? else {
            let msg = format!("workspace {workspace_id} not found");
            render_error(output, &CliError::new(&msg, "workspace_not_found"))?;
            anyhow::bail!("{msg}");
        };
        if !access::can_view(&actor, &workspace) {
            let msg = format!(
                "user {} may not post to workspace {}",
                actor.id, workspace_id
            );
            render_error(
                output,
                &CliError::with_details(&msg, "Ask the owner for membership", "permission_denied"),
            )?;
            anyhow::bail!("{msg}");
        }
    }

    let request = note_request(&target, actor.id, args.entity_id, &args.body);
    let event = emit(&mut project.conn, &request)?;

    chorus_search::ensure_schema(&project.conn)?;
    chorus_search::index_event(&project.conn, &event)?;

    let result = NoteOutput {
        ok: true,
        event_id: event.id,
        kind: event.kind.to_string(),
        ts: event.created_at_us,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ note posted (event {})", r.event_id)
    })
}

/// Build the kind-correct emit request for a note subject.
fn note_request(target: &Entity, actor_id: i64, entity_id: i64, body: &str) -> EmitRequest {
    match target {
        Entity::Instance(instance) => {
            let kind = match instance.flavor {
                InstanceFlavor::Greenplum => EventKind::NoteOnGreenplumInstance,
                InstanceFlavor::Hadoop => EventKind::NoteOnHadoopInstance,
            };
            EmitRequest::new(kind, actor_id)
                .target(
                    TargetRole::Target1,
                    EntityRef::new(EntityType::Instance, entity_id),
                )
                .field("body", body)
        }
        Entity::Workspace(_) => EmitRequest::new(EventKind::NoteOnWorkspace, actor_id)
            .target(
                TargetRole::Workspace,
                EntityRef::new(EntityType::Workspace, entity_id),
            )
            .field("body", body),
        Entity::Dataset(dataset) => EmitRequest::new(EventKind::NoteOnDataset, actor_id)
            .target(
                TargetRole::Target1,
                EntityRef::new(EntityType::Dataset, entity_id),
            )
            .target(
                TargetRole::Workspace,
                EntityRef::new(EntityType::Workspace, dataset.workspace_id),
            )
            .field("body", body),
        Entity::Workfile(workfile) => EmitRequest::new(EventKind::NoteOnWorkfile, actor_id)
            .target(
                TargetRole::Target1,
                EntityRef::new(EntityType::Workfile, entity_id),
            )
            .target(
                TargetRole::Workspace,
                EntityRef::new(EntityType::Workspace, workfile.workspace_id),
            )
            .field("body", body),
        // Rejected before this point; kept total for the match.
        Entity::User(_) => unreachable!("user notes are rejected before emission"),
    }
}
