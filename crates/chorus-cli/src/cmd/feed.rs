//! `chorus feed` — assemble and render activity feeds.

use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::Path;

use clap::Args;

use chorus_core::feed::{FeedPage, FeedQuery, FeedScope, ResolvedRef, assemble};
use chorus_core::store::entity;

use crate::cmd::{open_project, resolve_identity};
use crate::output::{CliError, OutputMode, micros_to_rfc3339, render, render_error};

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Feed scope: `global`, `workspace:<id>`, `instance:<id>`, or
    /// `user:<username>`.
    pub scope: String,

    /// Entries to skip (post-filter).
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Page size (clamped to the configured maximum).
    #[arg(long)]
    pub limit: Option<u32>,

    /// Restrict to notes matching this full-text query.
    #[arg(long)]
    pub search: Option<String>,
}

/// Parse a scope argument. Usernames are resolved by the caller; this
/// returns the raw parts.
fn parse_scope(raw: &str) -> Option<(&str, Option<&str>)> {
    if raw == "global" {
        return Some(("global", None));
    }
    let (kind, rest) = raw.split_once(':')?;
    if rest.is_empty() {
        return None;
    }
    match kind {
        "workspace" | "instance" | "user" => Some((kind, Some(rest))),
        _ => None,
    }
}

pub fn run_feed(
    args: &FeedArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    let viewer = resolve_identity(&project.conn, user_flag, output)?;

    let Some((scope_kind, scope_arg)) = parse_scope(&args.scope) else {
        let msg = format!("invalid scope '{}'", args.scope);
        render_error(
            output,
            &CliError::with_details(
                &msg,
                "Use global, workspace:<id>, instance:<id>, or user:<username>",
                "invalid_scope",
            ),
        )?;
        anyhow::bail!("{msg}");
    };

    let scope = match (scope_kind, scope_arg) {
        ("global", _) => FeedScope::Global,
        ("workspace", Some(id)) => match id.parse() {
            Ok(id) => FeedScope::Workspace(id),
            Err(_) => return invalid_id(output, id),
        },
        ("instance", Some(id)) => match id.parse() {
            Ok(id) => FeedScope::Instance(id),
            Err(_) => return invalid_id(output, id),
        },
        ("user", Some(name)) => match entity::get_user_by_name(&project.conn, name)? {
            Some(user) => FeedScope::Actor(user.id),
            None => {
                // A user scope that does not resolve behaves like any other
                // missing scope entity: empty feed, not an error.
                FeedScope::Actor(-1)
            }
        },
        _ => unreachable!("parse_scope only returns the four scope kinds"),
    };

    let restrict_ids = match &args.search {
        Some(query) => {
            chorus_search::ensure_schema(&project.conn)?;
            let hits = chorus_search::search_notes(&project.conn, query, u32::MAX)?;
            Some(hits.into_iter().map(|h| h.event_id).collect::<BTreeSet<i64>>())
        }
        None => None,
    };

    let feed_query = FeedQuery {
        offset: args.offset,
        limit: project.config.feed.clamp_limit(args.limit),
        restrict_ids,
    };
    let page = assemble(&project.conn, scope, &viewer, &feed_query)?;

    render(output, &page, render_page_human)
}

fn invalid_id(output: OutputMode, raw: &str) -> anyhow::Result<()> {
    let msg = format!("invalid scope id '{raw}'");
    render_error(output, &CliError::new(&msg, "invalid_scope"))?;
    anyhow::bail!("{msg}");
}

fn render_page_human(page: &FeedPage, w: &mut dyn std::io::Write) -> std::io::Result<()> {
    if !page.scope_found {
        writeln!(w, "(scope not found — empty feed)")?;
        return Ok(());
    }
    if page.entries.is_empty() {
        writeln!(w, "(no visible activity)")?;
        return Ok(());
    }

    for entry in &page.entries {
        let actor = entry.actor_name.as_deref().unwrap_or("(unknown user)");
        writeln!(
            w,
            "#{} [{}] {} by {}",
            entry.event.id,
            micros_to_rfc3339(entry.event.created_at_us),
            entry.event.kind,
            actor
        )?;
        if let Some(body) = entry.event.body() {
            writeln!(w, "    {body}")?;
        }
        for target in &entry.targets {
            match target {
                ResolvedRef::Live {
                    role,
                    name,
                    grouping_id,
                    ..
                } => writeln!(w, "    {role}: {name} ({grouping_id})")?,
                ResolvedRef::Tombstone {
                    role,
                    entity_type,
                    id,
                } => writeln!(w, "    {role}: [deleted {entity_type} {id}]")?,
            }
        }
        for comment in &entry.comments {
            writeln!(
                w,
                "    > [{}] {}: {}",
                micros_to_rfc3339(comment.created_at_us),
                comment.author,
                comment.body
            )?;
        }
    }
    writeln!(
        w,
        "showing {} of {} (offset {})",
        page.entries.len(),
        page.total,
        page.offset
    )
}
