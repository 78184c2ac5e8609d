//! `chorus comment` — append and soft-delete comments on feed events.

use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use chorus_core::access;
use chorus_core::event::TargetRole;
use chorus_core::store::{entity, query};

use crate::cmd::{open_project, resolve_identity};
use crate::output::{CliError, OutputMode, render, render_error};
use crate::validate;

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    #[command(about = "Add a comment to an event")]
    Add(CommentAddArgs),

    #[command(about = "Delete your comment (soft delete)")]
    Delete(CommentDeleteArgs),
}

#[derive(Args, Debug)]
pub struct CommentAddArgs {
    /// Event id to comment on.
    pub event: i64,

    /// Comment body.
    pub body: String,
}

#[derive(Args, Debug)]
pub struct CommentDeleteArgs {
    /// Comment id.
    pub comment: i64,
}

#[derive(Debug, Serialize)]
struct CommentOutput {
    ok: bool,
    comment_id: i64,
    event_id: i64,
}

pub fn run_comment(
    args: &CommentArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        CommentCommand::Add(add) => run_add(add, user_flag, output, project_root),
        CommentCommand::Delete(delete) => run_delete(delete, user_flag, output, project_root),
    }
}

fn run_add(
    args: &CommentAddArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    let actor = resolve_identity(&project.conn, user_flag, output)?;

    if let Err(e) = validate::validate_body(&args.body, project.config.notes.max_body_chars) {
        render_error(output, &e.to_cli_error())?;
        anyhow::bail!("{}", e.reason);
    }

    let Some(event) = query::load_event(&project.conn, args.event)? else {
        let msg = format!("event {} not found", args.event);
        render_error(output, &CliError::new(&msg, "entity_not_found"))?;
        anyhow::bail!("{msg}");
    };

    // Commenting on a workspace-scoped event requires seeing the workspace.
    if let Some(ws_ref) = event.target(TargetRole::Workspace) {
        let visible = match entity::get_workspace(&project.conn, ws_ref.id)? {
            Some(workspace) => access::can_view(&actor, &workspace),
            None => actor.is_admin,
        };
        if !visible {
            let msg = format!("user {} may not comment on event {}", actor.id, event.id);
            render_error(
                output,
                &CliError::with_details(&msg, "Ask the owner for membership", "permission_denied"),
            )?;
            anyhow::bail!("{msg}");
        }
    }

    let comment_id = query::add_comment(&project.conn, event.id, actor.id, &args.body)?;
    let result = CommentOutput {
        ok: true,
        comment_id,
        event_id: event.id,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ comment {} added to event {}", r.comment_id, r.event_id)
    })
}

fn run_delete(
    args: &CommentDeleteArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    let actor = resolve_identity(&project.conn, user_flag, output)?;

    let Some(comment) = query::get_comment(&project.conn, args.comment)? else {
        let msg = format!("comment {} not found", args.comment);
        render_error(output, &CliError::new(&msg, "entity_not_found"))?;
        anyhow::bail!("{msg}");
    };

    if comment.author_id != actor.id && !actor.is_admin {
        let msg = format!(
            "user {} may not delete comment {} (author {})",
            actor.id, comment.id, comment.author_id
        );
        render_error(
            output,
            &CliError::with_details(&msg, "Only the author or an admin may", "permission_denied"),
        )?;
        anyhow::bail!("{msg}");
    }

    query::delete_comment(&project.conn, comment.id)?;
    let result = CommentOutput {
        ok: true,
        comment_id: comment.id,
        event_id: comment.event_id,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ comment {} deleted", r.comment_id)
    })
}
