//! `chorus workspace` — creation, archival, publication, and membership.
//!
//! Each mutation goes through the access layer's entry point and, on
//! success, emits the matching event so feeds record who did what.

use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use chorus_core::access::{self, AccessError};
use chorus_core::event::{EmitRequest, EventKind, TargetRole, emit};
use chorus_core::model::{EntityRef, EntityType, User};
use chorus_core::store::entity::{self, NewWorkspace};

use crate::cmd::{Project, open_project, resolve_identity};
use crate::output::{CliError, OutputMode, render, render_error};

#[derive(Args, Debug)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub command: WorkspaceCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommand {
    #[command(about = "Create a workspace (you become the owner)")]
    Create(CreateArgs),

    #[command(about = "Archive a workspace")]
    Archive(IdArg),

    #[command(about = "Restore an archived workspace")]
    Unarchive(IdArg),

    #[command(about = "Make a workspace public")]
    Publish(IdArg),

    #[command(about = "Make a workspace private")]
    Unpublish(IdArg),

    #[command(about = "Manage workspace membership")]
    Member(MemberArgs),

    #[command(about = "List workspaces you can see")]
    List,

    #[command(about = "Show the member list you are allowed to see")]
    Members(IdArg),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Workspace name.
    pub name: String,

    /// Create as public (visible to everyone).
    #[arg(long)]
    pub public: bool,
}

#[derive(Args, Debug)]
pub struct IdArg {
    /// Workspace id.
    pub workspace: i64,
}

#[derive(Args, Debug)]
pub struct MemberArgs {
    #[command(subcommand)]
    pub command: MemberCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    #[command(about = "Add a member")]
    Add(MemberChangeArgs),

    #[command(about = "Remove a member")]
    Remove(MemberChangeArgs),
}

#[derive(Args, Debug)]
pub struct MemberChangeArgs {
    /// Workspace id.
    pub workspace: i64,

    /// Username of the member.
    pub username: String,
}

#[derive(Debug, Serialize)]
struct WorkspaceOutput {
    ok: bool,
    workspace_id: i64,
    event_id: Option<i64>,
}

pub fn run_workspace(
    args: &WorkspaceArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut project = open_project(project_root, output)?;
    let actor = resolve_identity(&project.conn, user_flag, output)?;

    match &args.command {
        WorkspaceCommand::Create(create) => run_create(&mut project, &actor, create, output),
        WorkspaceCommand::Archive(id) => {
            run_flag_change(&mut project, &actor, id.workspace, FlagChange::Archive, output)
        }
        WorkspaceCommand::Unarchive(id) => {
            run_flag_change(&mut project, &actor, id.workspace, FlagChange::Unarchive, output)
        }
        WorkspaceCommand::Publish(id) => {
            run_flag_change(&mut project, &actor, id.workspace, FlagChange::Publish, output)
        }
        WorkspaceCommand::Unpublish(id) => {
            run_flag_change(&mut project, &actor, id.workspace, FlagChange::Unpublish, output)
        }
        WorkspaceCommand::Member(member) => match &member.command {
            MemberCommand::Add(change) => run_member_add(&mut project, &actor, change, output),
            MemberCommand::Remove(change) => {
                run_member_remove(&mut project, &actor, change, output)
            }
        },
        WorkspaceCommand::List => run_list(&project, &actor, output),
        WorkspaceCommand::Members(id) => run_members(&project, &actor, id.workspace, output),
    }
}

fn render_access_error(output: OutputMode, error: &AccessError) -> anyhow::Result<()> {
    let cli_error = match error {
        AccessError::PermissionDenied { .. } => CliError::with_details(
            &error.to_string(),
            "Only the workspace owner or a site admin may do this",
            "permission_denied",
        ),
        AccessError::WorkspaceNotFound(_) => {
            CliError::new(&error.to_string(), "workspace_not_found")
        }
        AccessError::UserNotFound(_) => CliError::new(&error.to_string(), "user_not_found"),
        AccessError::OwnerImmutable => CliError::with_details(
            &error.to_string(),
            "Transfer ownership before removing this member",
            "owner_immutable",
        ),
        AccessError::Storage(_) => CliError::new(&error.to_string(), "store_error"),
    };
    render_error(output, &cli_error)?;
    anyhow::bail!("{error}");
}

fn workspace_ref(workspace_id: i64) -> EntityRef {
    EntityRef::new(EntityType::Workspace, workspace_id)
}

fn run_create(
    project: &mut Project,
    actor: &User,
    args: &CreateArgs,
    output: OutputMode,
) -> anyhow::Result<()> {
    let new = if args.public {
        NewWorkspace::public(&args.name, actor.id)
    } else {
        NewWorkspace::private(&args.name, actor.id)
    };
    let workspace_id = entity::create_workspace(&project.conn, &new)?;

    let event = emit(
        &mut project.conn,
        &EmitRequest::new(EventKind::WorkspaceCreated, actor.id)
            .target(TargetRole::Workspace, workspace_ref(workspace_id)),
    )?;

    let result = WorkspaceOutput {
        ok: true,
        workspace_id,
        event_id: Some(event.id),
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ workspace {} created", r.workspace_id)
    })
}

#[derive(Debug, Clone, Copy)]
enum FlagChange {
    Archive,
    Unarchive,
    Publish,
    Unpublish,
}

impl FlagChange {
    const fn kind(self) -> EventKind {
        match self {
            Self::Archive => EventKind::WorkspaceArchived,
            Self::Unarchive => EventKind::WorkspaceUnarchived,
            Self::Publish => EventKind::WorkspaceMakePublic,
            Self::Unpublish => EventKind::WorkspaceMakePrivate,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::Archive => "archived",
            Self::Unarchive => "unarchived",
            Self::Publish => "made public",
            Self::Unpublish => "made private",
        }
    }
}

fn run_flag_change(
    project: &mut Project,
    actor: &User,
    workspace_id: i64,
    change: FlagChange,
    output: OutputMode,
) -> anyhow::Result<()> {
    let outcome = match change {
        FlagChange::Archive => access::set_archived(&project.conn, actor, workspace_id, true),
        FlagChange::Unarchive => access::set_archived(&project.conn, actor, workspace_id, false),
        FlagChange::Publish => access::set_public(&project.conn, actor, workspace_id, true),
        FlagChange::Unpublish => access::set_public(&project.conn, actor, workspace_id, false),
    };
    if let Err(error) = outcome {
        return render_access_error(output, &error);
    }

    let event = emit(
        &mut project.conn,
        &EmitRequest::new(change.kind(), actor.id)
            .target(TargetRole::Workspace, workspace_ref(workspace_id)),
    )?;

    let result = WorkspaceOutput {
        ok: true,
        workspace_id,
        event_id: Some(event.id),
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ workspace {} {}", r.workspace_id, change.describe())
    })
}

fn run_member_add(
    project: &mut Project,
    actor: &User,
    args: &MemberChangeArgs,
    output: OutputMode,
) -> anyhow::Result<()> {
    let Some(member) = entity::get_user_by_name(&project.conn, &args.username)? else {
        let msg = format!("user '{}' not found", args.username);
        render_error(output, &CliError::new(&msg, "user_not_found"))?;
        anyhow::bail!("{msg}");
    };

    if let Err(error) = access::add_member(&project.conn, actor, args.workspace, member.id) {
        return render_access_error(output, &error);
    }

    let event = emit(
        &mut project.conn,
        &EmitRequest::new(EventKind::MembersAdded, actor.id)
            .target(TargetRole::Workspace, workspace_ref(args.workspace))
            .field("num_added", 1_i64),
    )?;

    let result = WorkspaceOutput {
        ok: true,
        workspace_id: args.workspace,
        event_id: Some(event.id),
    };
    render(output, &result, |r, w| {
        writeln!(
            w,
            "✓ {} added to workspace {}",
            args.username, r.workspace_id
        )
    })
}

fn run_member_remove(
    project: &mut Project,
    actor: &User,
    args: &MemberChangeArgs,
    output: OutputMode,
) -> anyhow::Result<()> {
    let Some(member) = entity::get_user_by_name(&project.conn, &args.username)? else {
        let msg = format!("user '{}' not found", args.username);
        render_error(output, &CliError::new(&msg, "user_not_found"))?;
        anyhow::bail!("{msg}");
    };

    if let Err(error) = access::remove_member(&project.conn, actor, args.workspace, member.id) {
        return render_access_error(output, &error);
    }

    let result = WorkspaceOutput {
        ok: true,
        workspace_id: args.workspace,
        event_id: None,
    };
    render(output, &result, |r, w| {
        writeln!(
            w,
            "✓ {} removed from workspace {}",
            args.username, r.workspace_id
        )
    })
}

fn run_list(project: &Project, viewer: &User, output: OutputMode) -> anyhow::Result<()> {
    let workspaces = access::workspaces_visible_to(&project.conn, viewer)?;
    render(output, &workspaces, |list, w| {
        if list.is_empty() {
            writeln!(w, "(no visible workspaces)")?;
            return Ok(());
        }
        for ws in list {
            let mut flags = Vec::new();
            if ws.public {
                flags.push("public");
            }
            if ws.archived {
                flags.push("archived");
            }
            let suffix = if flags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", flags.join(", "))
            };
            writeln!(w, "{:>4}  {}{}", ws.id, ws.name, suffix)?;
        }
        Ok(())
    })
}

fn run_members(
    project: &Project,
    viewer: &User,
    workspace_id: i64,
    output: OutputMode,
) -> anyhow::Result<()> {
    match access::members_visible_to(&project.conn, viewer, workspace_id) {
        Ok(members) => render(output, &members, |list, w| {
            if list.is_empty() {
                writeln!(w, "(no visible members)")?;
                return Ok(());
            }
            for member in list {
                writeln!(w, "{:>4}  {}", member.id, member.username)?;
            }
            Ok(())
        }),
        Err(error) => render_access_error(output, &error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::init::{InitArgs, run_init};
    use crate::cmd::user::{UserAddArgs, UserArgs, UserCommand, run_user};
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        cmd: WorkspaceCommand,
    }

    fn seeded_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tmpdir");
        run_init(&InitArgs {}, OutputMode::Json, dir.path()).expect("init");
        for (name, admin) in [("alice", false), ("bob", false)] {
            run_user(
                &UserArgs {
                    command: UserCommand::Add(UserAddArgs {
                        username: name.into(),
                        admin,
                    }),
                },
                None,
                OutputMode::Json,
                dir.path(),
            )
            .expect("seed user");
        }
        dir
    }

    fn run(dir: &tempfile::TempDir, user: &str, cmd: WorkspaceCommand) -> anyhow::Result<()> {
        run_workspace(
            &WorkspaceArgs { command: cmd },
            Some(user),
            OutputMode::Json,
            dir.path(),
        )
    }

    #[test]
    fn member_add_args_parse() {
        let parsed = Wrapper::parse_from(["test", "member", "add", "3", "bob"]);
        match parsed.cmd {
            WorkspaceCommand::Member(member) => match member.command {
                MemberCommand::Add(change) => {
                    assert_eq!(change.workspace, 3);
                    assert_eq!(change.username, "bob");
                }
                MemberCommand::Remove(_) => panic!("expected add"),
            },
            _ => panic!("expected member"),
        }
    }

    #[test]
    fn create_then_membership_flow() {
        let dir = seeded_project();
        run(
            &dir,
            "alice",
            WorkspaceCommand::Create(CreateArgs {
                name: "research".into(),
                public: false,
            }),
        )
        .expect("create");

        // Non-owner cannot add members.
        assert!(
            run(
                &dir,
                "bob",
                WorkspaceCommand::Member(MemberArgs {
                    command: MemberCommand::Add(MemberChangeArgs {
                        workspace: 1,
                        username: "bob".into(),
                    }),
                }),
            )
            .is_err()
        );

        run(
            &dir,
            "alice",
            WorkspaceCommand::Member(MemberArgs {
                command: MemberCommand::Add(MemberChangeArgs {
                    workspace: 1,
                    username: "bob".into(),
                }),
            }),
        )
        .expect("owner adds member");

        let project = open_project(dir.path(), OutputMode::Json).expect("open");
        let ws = entity::get_workspace(&project.conn, 1).expect("q").expect("ws");
        assert_eq!(ws.members.len(), 2);

        // MEMBERS_ADDED landed in the workspace feed.
        let member_events: i64 = project
            .conn
            .query_row(
                "SELECT COUNT(*) FROM events WHERE kind = 'MEMBERS_ADDED'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(member_events, 1);
    }

    #[test]
    fn archive_flow_emits_event() {
        let dir = seeded_project();
        run(
            &dir,
            "alice",
            WorkspaceCommand::Create(CreateArgs {
                name: "research".into(),
                public: false,
            }),
        )
        .expect("create");
        run(&dir, "alice", WorkspaceCommand::Archive(IdArg { workspace: 1 }))
            .expect("archive");

        let project = open_project(dir.path(), OutputMode::Json).expect("open");
        let ws = entity::get_workspace(&project.conn, 1).expect("q").expect("ws");
        assert!(ws.archived);

        run(&dir, "alice", WorkspaceCommand::Unarchive(IdArg { workspace: 1 }))
            .expect("unarchive");
        let project = open_project(dir.path(), OutputMode::Json).expect("open");
        let ws = entity::get_workspace(&project.conn, 1).expect("q").expect("ws");
        assert!(!ws.archived);
    }
}
