//! Command handlers and the helpers they share.

pub mod comment;
pub mod dataset;
pub mod feed;
pub mod init;
pub mod instance;
pub mod note;
pub mod search;
pub mod tag;
pub mod user;
pub mod workfile;
pub mod workspace;

use std::path::{Path, PathBuf};

use anyhow::bail;
use rusqlite::Connection;

use chorus_core::config::{self, CHORUS_DIR, ProjectConfig, STORE_FILE};
use chorus_core::error::ErrorCode;
use chorus_core::model::User;
use chorus_core::store::{self, entity};

use crate::output::{CliError, OutputMode, render_error};

/// An opened chorus project: its store connection and effective config.
pub struct Project {
    pub config: ProjectConfig,
    pub conn: Connection,
}

/// Walk up from `start` looking for a `.chorus` directory.
pub fn find_chorus_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CHORUS_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Open the project containing `start`, rendering a machine-readable error
/// when there is none.
pub fn open_project(start: &Path, output: OutputMode) -> anyhow::Result<Project> {
    let Some(chorus_dir) = find_chorus_dir(start) else {
        let code = ErrorCode::NotInitialized;
        render_error(
            output,
            &CliError::with_details(
                code.message(),
                code.hint().unwrap_or("Run `chorus init`"),
                code.code(),
            ),
        )?;
        bail!("{}", code.message());
    };

    let root = chorus_dir
        .parent()
        .map_or_else(|| start.to_path_buf(), Path::to_path_buf);
    let config = config::load_project_config(&root)?;
    let conn = store::open_store(&chorus_dir.join(STORE_FILE))?;

    Ok(Project { config, conn })
}

/// Resolve the acting/viewing identity from `--user` or `CHORUS_USER`.
///
/// Renders a machine-readable error when the flag is absent or the account
/// does not exist.
pub fn resolve_identity(
    conn: &Connection,
    flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<User> {
    let env_user = std::env::var("CHORUS_USER").ok();
    let Some(username) = flag.or(env_user.as_deref()) else {
        let msg = "No identity given";
        render_error(
            output,
            &CliError::with_details(msg, "Pass --user or set CHORUS_USER", "no_identity"),
        )?;
        bail!("{msg}");
    };

    match entity::get_user_by_name(conn, username)? {
        Some(user) => Ok(user),
        None => {
            let msg = format!("user '{username}' not found");
            render_error(
                output,
                &CliError::with_details(&msg, "Create it with `chorus user add`", "user_not_found"),
            )?;
            bail!("{msg}");
        }
    }
}
