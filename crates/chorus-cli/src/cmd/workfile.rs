//! `chorus workfile` — add workfiles to a workspace.

use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use chorus_core::access;
use chorus_core::event::{EmitRequest, EventKind, TargetRole, emit};
use chorus_core::model::{EntityRef, EntityType};
use chorus_core::store::entity;

use crate::cmd::{open_project, resolve_identity};
use crate::output::{CliError, OutputMode, render, render_error};

#[derive(Args, Debug)]
pub struct WorkfileArgs {
    #[command(subcommand)]
    pub command: WorkfileCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkfileCommand {
    #[command(about = "Add a workfile to a workspace")]
    Add(WorkfileAddArgs),
}

#[derive(Args, Debug)]
pub struct WorkfileAddArgs {
    /// Workspace id.
    pub workspace: i64,

    /// Workfile name.
    pub name: String,

    /// Optional commit message recorded on the event.
    #[arg(long)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct WorkfileOutput {
    ok: bool,
    workfile_id: i64,
    event_id: i64,
}

pub fn run_workfile(
    args: &WorkfileArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        WorkfileCommand::Add(add) => run_add(add, user_flag, output, project_root),
    }
}

fn run_add(
    args: &WorkfileAddArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut project = open_project(project_root, output)?;
    let actor = resolve_identity(&project.conn, user_flag, output)?;

    let Some(workspace) = entity::get_workspace(&project.conn, args.workspace)? else {
        let msg = format!("workspace {} not found", args.workspace);
        render_error(output, &CliError::new(&msg, "workspace_not_found"))?;
        anyhow::bail!("{msg}");
    };

    // Archival blocks workfile changes for everyone, including the owner.
    if !access::can_modify_workfiles(&actor, &workspace) {
        let (msg, hint) = if workspace.archived {
            (
                format!("workspace {} is archived", workspace.id),
                "Unarchive the workspace first",
            )
        } else {
            (
                format!(
                    "user {} may not modify workfiles in workspace {}",
                    actor.id, workspace.id
                ),
                "Ask the owner for membership",
            )
        };
        render_error(output, &CliError::with_details(&msg, hint, "permission_denied"))?;
        anyhow::bail!("{msg}");
    }

    let workfile_id = entity::create_workfile(&project.conn, args.workspace, &args.name)?;

    let mut request = EmitRequest::new(EventKind::WorkfileCreated, actor.id)
        .target(
            TargetRole::Target1,
            EntityRef::new(EntityType::Workfile, workfile_id),
        )
        .target(
            TargetRole::Workspace,
            EntityRef::new(EntityType::Workspace, args.workspace),
        );
    if let Some(message) = &args.message {
        request = request.field("commit_message", message.as_str());
    }
    let event = emit(&mut project.conn, &request)?;

    let result = WorkfileOutput {
        ok: true,
        workfile_id,
        event_id: event.id,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ workfile {} added", r.workfile_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::init::{InitArgs, run_init};
    use crate::cmd::user::{UserAddArgs, UserArgs, UserCommand, run_user};
    use crate::cmd::workspace::{
        CreateArgs, IdArg, WorkspaceArgs, WorkspaceCommand, run_workspace,
    };

    fn seeded_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tmpdir");
        run_init(&InitArgs {}, OutputMode::Json, dir.path()).expect("init");
        run_user(
            &UserArgs {
                command: UserCommand::Add(UserAddArgs {
                    username: "alice".into(),
                    admin: false,
                }),
            },
            None,
            OutputMode::Json,
            dir.path(),
        )
        .expect("seed user");
        run_workspace(
            &WorkspaceArgs {
                command: WorkspaceCommand::Create(CreateArgs {
                    name: "research".into(),
                    public: false,
                }),
            },
            Some("alice"),
            OutputMode::Json,
            dir.path(),
        )
        .expect("create workspace");
        dir
    }

    #[test]
    fn add_workfile_with_commit_message() {
        let dir = seeded_project();
        run_add(
            &WorkfileAddArgs {
                workspace: 1,
                name: "report.sql".into(),
                message: Some("initial import".into()),
            },
            Some("alice"),
            OutputMode::Json,
            dir.path(),
        )
        .expect("workfile add");
    }

    #[test]
    fn archived_workspace_blocks_even_the_owner() {
        let dir = seeded_project();
        run_workspace(
            &WorkspaceArgs {
                command: WorkspaceCommand::Archive(IdArg { workspace: 1 }),
            },
            Some("alice"),
            OutputMode::Json,
            dir.path(),
        )
        .expect("archive");

        assert!(
            run_add(
                &WorkfileAddArgs {
                    workspace: 1,
                    name: "report.sql".into(),
                    message: None,
                },
                Some("alice"),
                OutputMode::Json,
                dir.path(),
            )
            .is_err()
        );
    }
}
