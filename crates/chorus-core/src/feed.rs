//! Feed assembler: per-viewer, access-filtered activity pages.
//!
//! Given a scope (actor, workspace, instance, or global) and an explicit
//! viewer, produces the events delivered to that scope, newest first,
//! filtered to what the viewer may see. Pagination and totals apply to the
//! post-filter sequence: a privacy-filtered event never counts toward
//! "N results found".
//!
//! Target references resolve against the live entity store at render time.
//! A reference whose entity has since been deleted renders as a tombstone;
//! it never fails the page.

use std::collections::BTreeSet;

use rusqlite::Connection;
use tracing::debug;

use crate::access;
use crate::event::{Event, TargetRole};
use crate::model::{Entity, EntityType, User};
use crate::store::entity;
use crate::store::query::{self, Comment};

/// The subject a feed is assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// A user's personal feed (their acted-on events).
    Actor(i64),
    /// A workspace's feed.
    Workspace(i64),
    /// A registered instance's feed.
    Instance(i64),
    /// The global feed visible to all authenticated users.
    Global,
}

impl FeedScope {
    /// The `event_activities` row this scope addresses.
    #[must_use]
    pub const fn scope_row(self) -> (&'static str, i64) {
        match self {
            Self::Actor(id) => ("user", id),
            Self::Workspace(id) => ("workspace", id),
            Self::Instance(id) => ("instance", id),
            Self::Global => ("global", 0),
        }
    }
}

/// Pagination and candidate restriction for one feed query.
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    /// Entries to skip in the post-filter sequence.
    pub offset: u32,
    /// Maximum entries to return. Zero means no limit.
    pub limit: u32,
    /// When set, only these event ids are considered (search-within-feed).
    pub restrict_ids: Option<BTreeSet<i64>>,
}

impl FeedQuery {
    /// A plain page with no candidate restriction.
    #[must_use]
    pub const fn page(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit,
            restrict_ids: None,
        }
    }
}

/// A target role resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolvedRef {
    /// The referenced entity still exists.
    Live {
        role: TargetRole,
        entity_type: EntityType,
        id: i64,
        name: String,
        type_name: &'static str,
        grouping_id: String,
    },
    /// The referenced entity was deleted after emission.
    Tombstone {
        role: TargetRole,
        entity_type: EntityType,
        id: i64,
    },
}

/// One renderable feed entry: the event plus resolved display data.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeedEntry {
    pub event: Event,
    /// Actor username, when the account still resolves.
    pub actor_name: Option<String>,
    /// Role resolutions in role order.
    pub targets: Vec<ResolvedRef>,
    /// Non-deleted comments, insertion order.
    pub comments: Vec<Comment>,
}

/// An assembled feed page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    /// Post-filter result count across all pages.
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
    /// False when the scope entity no longer exists; the page is then empty.
    pub scope_found: bool,
}

impl FeedPage {
    fn missing_scope(query: &FeedQuery) -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
            offset: query.offset,
            limit: query.limit,
            scope_found: false,
        }
    }
}

/// Why feed assembly failed at the store layer.
///
/// A missing scope entity is *not* an error: it yields an empty page with
/// `scope_found == false`.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("store error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Assemble the feed for `scope` as seen by `viewer`.
///
/// # Errors
///
/// Returns a [`FeedError`] only for store failures; missing scope entities
/// and deleted targets degrade gracefully (empty page / tombstones).
pub fn assemble(
    conn: &Connection,
    scope: FeedScope,
    viewer: &User,
    query: &FeedQuery,
) -> Result<FeedPage, FeedError> {
    if !scope_exists(conn, scope)? {
        debug!(?scope, "feed scope entity missing");
        return Ok(FeedPage::missing_scope(query));
    }

    let (scope_type, scope_id) = scope.scope_row();
    let candidate_ids = query::scope_event_ids(conn, scope_type, scope_id)?;

    // Visibility filter over the full candidate set; totals must reflect
    // the post-filter sequence.
    let mut visible: Vec<Event> = Vec::new();
    for id in candidate_ids {
        if let Some(restrict) = &query.restrict_ids {
            if !restrict.contains(&id) {
                continue;
            }
        }
        let Some(event) = query::load_event(conn, id)? else {
            continue;
        };
        if viewer_may_see(conn, viewer, &event)? {
            visible.push(event);
        }
    }

    let total = visible.len() as u64;
    let offset = query.offset as usize;
    let page_events: Vec<Event> = visible
        .into_iter()
        .skip(offset)
        .take(if query.limit == 0 {
            usize::MAX
        } else {
            query.limit as usize
        })
        .collect();

    let mut entries = Vec::with_capacity(page_events.len());
    for event in page_events {
        entries.push(render_entry(conn, event)?);
    }

    debug!(
        ?scope,
        viewer = viewer.id,
        total,
        page = entries.len(),
        "feed assembled"
    );

    Ok(FeedPage {
        entries,
        total,
        offset: query.offset,
        limit: query.limit,
        scope_found: true,
    })
}

fn scope_exists(conn: &Connection, scope: FeedScope) -> rusqlite::Result<bool> {
    Ok(match scope {
        FeedScope::Actor(id) => entity::get_user(conn, id)?.is_some(),
        FeedScope::Workspace(id) => entity::get_workspace(conn, id)?.is_some(),
        FeedScope::Instance(id) => entity::get_instance(conn, id)?.is_some(),
        FeedScope::Global => true,
    })
}

/// The per-event visibility rule.
///
/// - Workspace role populated: standard `can_view` against the live
///   workspace. A workspace that no longer resolves falls through to the
///   conservative branch.
/// - No workspace role but a workspace-scoped target type (dataset or
///   workfile): conservative — admins and the event's actor only.
/// - Otherwise (instance- and user-level events): any authenticated viewer.
fn viewer_may_see(conn: &Connection, viewer: &User, event: &Event) -> rusqlite::Result<bool> {
    if let Some(ws_ref) = event.target(TargetRole::Workspace) {
        return Ok(match entity::get_workspace(conn, ws_ref.id)? {
            Some(workspace) => access::can_view(viewer, &workspace),
            None => viewer.is_admin || viewer.id == event.actor_id,
        });
    }

    let workspace_scoped = event.targets.values().any(|reference| {
        matches!(
            reference.entity_type,
            EntityType::Dataset | EntityType::Workfile
        )
    });
    if workspace_scoped {
        return Ok(viewer.is_admin || viewer.id == event.actor_id);
    }

    Ok(true)
}

fn render_entry(conn: &Connection, event: Event) -> Result<FeedEntry, FeedError> {
    let actor_name = entity::get_user(conn, event.actor_id)?.map(|user| user.username);

    let mut targets = Vec::with_capacity(event.targets.len());
    for (role, reference) in &event.targets {
        let resolved = match entity::find_entity(conn, reference.entity_type, reference.id)? {
            Some(live) => resolved_live(*role, &live),
            None => ResolvedRef::Tombstone {
                role: *role,
                entity_type: reference.entity_type,
                id: reference.id,
            },
        };
        targets.push(resolved);
    }

    let comments = query::get_comments(conn, event.id)?;

    Ok(FeedEntry {
        event,
        actor_name,
        targets,
        comments,
    })
}

fn resolved_live(role: TargetRole, live: &Entity) -> ResolvedRef {
    ResolvedRef::Live {
        role,
        entity_type: live.entity_type(),
        id: live.id(),
        name: live.name().to_string(),
        type_name: live.type_name(),
        grouping_id: live.grouping_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EmitRequest, EventKind, emit};
    use crate::model::EntityRef;
    use crate::store::entity::NewWorkspace;
    use crate::store::migrations;

    fn test_store() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory store");
        migrations::migrate(&mut conn).expect("migrate");
        conn
    }

    fn load_user(conn: &Connection, id: i64) -> User {
        entity::get_user(conn, id).expect("query").expect("user")
    }

    #[test]
    fn missing_scope_yields_empty_page_not_error() {
        let conn = test_store();
        let viewer_id = entity::create_user(&conn, "viewer", false).expect("user");
        let viewer = load_user(&conn, viewer_id);

        let page = assemble(
            &conn,
            FeedScope::Workspace(404),
            &viewer,
            &FeedQuery::page(0, 10),
        )
        .expect("assemble");
        assert!(!page.scope_found);
        assert!(page.entries.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn instance_feed_visible_to_any_viewer() {
        let mut conn = test_store();
        let actor_id = entity::create_user(&conn, "actor", false).expect("user");
        let other_id = entity::create_user(&conn, "other", false).expect("user");
        let inst = entity::create_instance(
            &conn,
            "prod-gp",
            crate::model::InstanceFlavor::Greenplum,
            None,
        )
        .expect("instance");

        emit(
            &mut conn,
            &EmitRequest::new(EventKind::NoteOnGreenplumInstance, actor_id)
                .target(
                    TargetRole::Target1,
                    EntityRef::new(EntityType::Instance, inst),
                )
                .field("body", "upgraded to 6.22"),
        )
        .expect("emit");

        let other = load_user(&conn, other_id);
        let page = assemble(
            &conn,
            FeedScope::Instance(inst),
            &other,
            &FeedQuery::page(0, 10),
        )
        .expect("assemble");
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].actor_name.as_deref(), Some("actor"));
        assert!(matches!(
            page.entries[0].targets[0],
            ResolvedRef::Live {
                type_name: "greenplum_instance",
                ..
            }
        ));
    }

    #[test]
    fn tombstone_for_deleted_target() {
        let mut conn = test_store();
        let actor_id = entity::create_user(&conn, "actor", false).expect("user");
        let ws = entity::create_workspace(&conn, &NewWorkspace::public("open", actor_id))
            .expect("ws");
        let ds = entity::create_dataset(&conn, ws, "orders").expect("dataset");

        emit(
            &mut conn,
            &EmitRequest::new(EventKind::NoteOnDataset, actor_id)
                .target(TargetRole::Target1, EntityRef::new(EntityType::Dataset, ds))
                .target(
                    TargetRole::Workspace,
                    EntityRef::new(EntityType::Workspace, ws),
                )
                .field("body", "row counts look wrong"),
        )
        .expect("emit");
        entity::delete_dataset(&conn, ds).expect("delete");

        let actor = load_user(&conn, actor_id);
        let page = assemble(
            &conn,
            FeedScope::Workspace(ws),
            &actor,
            &FeedQuery::page(0, 10),
        )
        .expect("assemble");
        assert_eq!(page.total, 1, "page must survive the dangling reference");
        let entry = &page.entries[0];
        assert!(entry.targets.iter().any(|t| matches!(
            t,
            ResolvedRef::Tombstone {
                entity_type: EntityType::Dataset,
                ..
            }
        )));
        // The workspace reference still resolves live.
        assert!(entry.targets.iter().any(|t| matches!(
            t,
            ResolvedRef::Live {
                entity_type: EntityType::Workspace,
                ..
            }
        )));
    }

    #[test]
    fn restrict_ids_narrows_candidates_and_totals() {
        let mut conn = test_store();
        let actor_id = entity::create_user(&conn, "actor", false).expect("user");
        let ws = entity::create_workspace(&conn, &NewWorkspace::public("open", actor_id))
            .expect("ws");

        let keep = emit(
            &mut conn,
            &EmitRequest::new(EventKind::NoteOnWorkspace, actor_id)
                .target(
                    TargetRole::Workspace,
                    EntityRef::new(EntityType::Workspace, ws),
                )
                .field("body", "keep me"),
        )
        .expect("emit");
        emit(
            &mut conn,
            &EmitRequest::new(EventKind::NoteOnWorkspace, actor_id)
                .target(
                    TargetRole::Workspace,
                    EntityRef::new(EntityType::Workspace, ws),
                )
                .field("body", "drop me"),
        )
        .expect("emit");

        let actor = load_user(&conn, actor_id);
        let query = FeedQuery {
            offset: 0,
            limit: 10,
            restrict_ids: Some(BTreeSet::from([keep.id])),
        };
        let page = assemble(&conn, FeedScope::Workspace(ws), &actor, &query).expect("assemble");
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].event.id, keep.id);
    }
}
