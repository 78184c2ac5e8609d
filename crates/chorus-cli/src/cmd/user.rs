//! `chorus user` — account creation and listing.

use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use chorus_core::event::{EmitRequest, EventKind, TargetRole, emit};
use chorus_core::model::{EntityRef, EntityType};
use chorus_core::store::entity;

use crate::cmd::open_project;
use crate::output::{CliError, OutputMode, render, render_error};
use crate::validate;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    #[command(about = "Create a user account")]
    Add(UserAddArgs),

    #[command(about = "List user accounts")]
    List,
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Username for the new account.
    pub username: String,

    /// Grant site-admin visibility.
    #[arg(long)]
    pub admin: bool,
}

#[derive(Debug, Serialize)]
struct UserAddOutput {
    ok: bool,
    user_id: i64,
    username: String,
    is_admin: bool,
    event_id: i64,
}

pub fn run_user(
    args: &UserArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        UserCommand::Add(add) => run_user_add(add, user_flag, output, project_root),
        UserCommand::List => run_user_list(output, project_root),
    }
}

fn run_user_add(
    args: &UserAddArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    if let Err(e) = validate::validate_username(&args.username) {
        render_error(output, &e.to_cli_error())?;
        anyhow::bail!("{}", e.reason);
    }

    let mut project = open_project(project_root, output)?;

    if entity::get_user_by_name(&project.conn, &args.username)?.is_some() {
        let msg = format!("user '{}' already exists", args.username);
        render_error(output, &CliError::new(&msg, "duplicate_username"))?;
        anyhow::bail!("{msg}");
    }

    let user_id = entity::create_user(&project.conn, &args.username, args.admin)?;

    // The creating admin is the actor when identified; the very first
    // account bootstraps by acting for itself.
    let actor_id = match user_flag {
        Some(name) => entity::get_user_by_name(&project.conn, name)?
            .map_or(user_id, |user| user.id),
        None => user_id,
    };

    let event = emit(
        &mut project.conn,
        &EmitRequest::new(EventKind::UserAdded, actor_id).target(
            TargetRole::Target1,
            EntityRef::new(EntityType::User, user_id),
        ),
    )?;

    let result = UserAddOutput {
        ok: true,
        user_id,
        username: args.username.clone(),
        is_admin: args.admin,
        event_id: event.id,
    };

    render(output, &result, |r, w| {
        writeln!(
            w,
            "✓ user {} created{}",
            r.username,
            if r.is_admin { " (admin)" } else { "" }
        )
    })
}

fn run_user_list(output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    let users = entity::list_users(&project.conn)?;

    render(output, &users, |list, w| {
        if list.is_empty() {
            writeln!(w, "(no users)")?;
            return Ok(());
        }
        for user in list {
            writeln!(
                w,
                "{:>4}  {}{}",
                user.id,
                user.username,
                if user.is_admin { "  [admin]" } else { "" }
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::init::{InitArgs, run_init};
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        cmd: UserCommand,
    }

    fn init_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tmpdir");
        run_init(&InitArgs {}, OutputMode::Json, dir.path()).expect("init");
        dir
    }

    #[test]
    fn user_add_args_parse() {
        let parsed = Wrapper::parse_from(["test", "add", "edcadmin", "--admin"]);
        match parsed.cmd {
            UserCommand::Add(args) => {
                assert_eq!(args.username, "edcadmin");
                assert!(args.admin);
            }
            UserCommand::List => panic!("expected add"),
        }
    }

    #[test]
    fn user_add_creates_account_and_global_event() {
        let dir = init_project();
        let args = UserAddArgs {
            username: "edcadmin".into(),
            admin: true,
        };
        run_user_add(&args, None, OutputMode::Json, dir.path()).expect("add user");

        let project = open_project(dir.path(), OutputMode::Json).expect("open");
        let user = entity::get_user_by_name(&project.conn, "edcadmin")
            .expect("query")
            .expect("exists");
        assert!(user.is_admin);

        let global_rows: i64 = project
            .conn
            .query_row(
                "SELECT COUNT(*) FROM event_activities WHERE scope_type = 'global'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(global_rows, 1);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let dir = init_project();
        let args = UserAddArgs {
            username: "edcadmin".into(),
            admin: false,
        };
        run_user_add(&args, None, OutputMode::Json, dir.path()).expect("first add");
        assert!(run_user_add(&args, None, OutputMode::Json, dir.path()).is_err());
    }

    #[test]
    fn list_runs_on_empty_store() {
        let dir = init_project();
        run_user_list(OutputMode::Json, dir.path()).expect("list");
    }
}
