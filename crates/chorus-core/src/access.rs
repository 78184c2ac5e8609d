//! Permission layer: visibility predicates and the membership/archival
//! mutation entry points.
//!
//! The predicates are pure functions over already-loaded entities,
//! recomputed on every call. Nothing here caches: a stale permission answer
//! is a security defect, so any membership or archival change is reflected
//! by the very next check.
//!
//! The mutation entry points are the only writers of `workspace_members`
//! and the workspace `public`/`archived` flags. Each runs as a single
//! transaction, so predicates never observe a half-applied change.

use rusqlite::{Connection, params};
use tracing::info;

use crate::model::{User, Workspace};
use crate::store::entity;

/// Why a workspace mutation was rejected, or failed at the store layer.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("workspace {0} not found")]
    WorkspaceNotFound(i64),

    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("user {actor} may not administer workspace {workspace}")]
    PermissionDenied { actor: i64, workspace: i64 },

    #[error("workspace owner cannot be removed from membership")]
    OwnerImmutable,

    #[error("store error: {0}")]
    Storage(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Whether `viewer` may read `workspace` and the objects scoped to it.
#[must_use]
pub fn can_view(viewer: &User, workspace: &Workspace) -> bool {
    workspace.public || workspace.has_member(viewer.id) || viewer.is_admin
}

/// Whether `viewer` may create or change workfiles in `workspace`.
///
/// Archival blocks everyone, including the owner.
#[must_use]
pub fn can_modify_workfiles(viewer: &User, workspace: &Workspace) -> bool {
    !workspace.archived && (workspace.has_member(viewer.id) || viewer.id == workspace.owner_id)
}

/// Whether `viewer` may administer `workspace` (ownership is singular;
/// transfer is an external administrative action).
#[must_use]
pub fn can_administer(viewer: &User, workspace: &Workspace) -> bool {
    viewer.id == workspace.owner_id
}

/// All workspaces `viewer` may see: everything for admins, otherwise the
/// union of public workspaces and the viewer's memberships.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn workspaces_visible_to(conn: &Connection, viewer: &User) -> rusqlite::Result<Vec<Workspace>> {
    let all = entity::list_workspaces(conn)?;
    if viewer.is_admin {
        return Ok(all);
    }
    Ok(all.into_iter().filter(|ws| can_view(viewer, ws)).collect())
}

/// The member list of a workspace as `viewer` is allowed to see it.
///
/// Admins and anyone who can view the workspace get the full list;
/// non-members of a private workspace get an empty list, not an error.
///
/// # Errors
///
/// Returns [`AccessError::WorkspaceNotFound`] if the workspace does not
/// exist, or a wrapped store error.
pub fn members_visible_to(
    conn: &Connection,
    viewer: &User,
    workspace_id: i64,
) -> Result<Vec<User>, AccessError> {
    let workspace = entity::get_workspace(conn, workspace_id)?
        .ok_or(AccessError::WorkspaceNotFound(workspace_id))?;

    if !can_view(viewer, &workspace) {
        return Ok(Vec::new());
    }

    let mut members = Vec::with_capacity(workspace.members.len());
    for user_id in &workspace.members {
        if let Some(user) = entity::get_user(conn, *user_id)? {
            members.push(user);
        }
    }
    Ok(members)
}

// ---------------------------------------------------------------------------
// Mutation entry points
// ---------------------------------------------------------------------------

/// Load the workspace and check the actor may administer it.
///
/// Site admins pass the gate for membership and archival mutations.
fn gate(
    conn: &Connection,
    actor: &User,
    workspace_id: i64,
) -> Result<Workspace, AccessError> {
    let workspace = entity::get_workspace(conn, workspace_id)?
        .ok_or(AccessError::WorkspaceNotFound(workspace_id))?;

    if actor.is_admin || can_administer(actor, &workspace) {
        Ok(workspace)
    } else {
        Err(AccessError::PermissionDenied {
            actor: actor.id,
            workspace: workspace_id,
        })
    }
}

/// Add `user_id` to the workspace member list. Idempotent.
///
/// # Errors
///
/// `PermissionDenied` unless `actor` owns the workspace or is an admin;
/// `UserNotFound`/`WorkspaceNotFound` for dangling ids.
pub fn add_member(
    conn: &Connection,
    actor: &User,
    workspace_id: i64,
    user_id: i64,
) -> Result<(), AccessError> {
    gate(conn, actor, workspace_id)?;
    if entity::get_user(conn, user_id)?.is_none() {
        return Err(AccessError::UserNotFound(user_id));
    }

    conn.execute(
        "INSERT OR IGNORE INTO workspace_members (workspace_id, user_id, added_at_us) \
         VALUES (?1, ?2, ?3)",
        params![
            workspace_id,
            user_id,
            chrono::Utc::now().timestamp_micros()
        ],
    )?;
    info!(workspace_id, user_id, actor = actor.id, "member added");
    Ok(())
}

/// Remove `user_id` from the workspace member list.
///
/// # Errors
///
/// `PermissionDenied` unless `actor` owns the workspace or is an admin;
/// `OwnerImmutable` when targeting the owner.
pub fn remove_member(
    conn: &Connection,
    actor: &User,
    workspace_id: i64,
    user_id: i64,
) -> Result<(), AccessError> {
    let workspace = gate(conn, actor, workspace_id)?;
    if user_id == workspace.owner_id {
        return Err(AccessError::OwnerImmutable);
    }

    conn.execute(
        "DELETE FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
        params![workspace_id, user_id],
    )?;
    info!(workspace_id, user_id, actor = actor.id, "member removed");
    Ok(())
}

/// Set the archived flag. Archiving is terminal but reversible.
///
/// # Errors
///
/// `PermissionDenied` unless `actor` owns the workspace or is an admin.
pub fn set_archived(
    conn: &Connection,
    actor: &User,
    workspace_id: i64,
    archived: bool,
) -> Result<(), AccessError> {
    gate(conn, actor, workspace_id)?;
    conn.execute(
        "UPDATE workspaces SET archived = ?1 WHERE workspace_id = ?2",
        params![archived, workspace_id],
    )?;
    info!(workspace_id, archived, actor = actor.id, "archived flag set");
    Ok(())
}

/// Set the public flag.
///
/// # Errors
///
/// `PermissionDenied` unless `actor` owns the workspace or is an admin.
pub fn set_public(
    conn: &Connection,
    actor: &User,
    workspace_id: i64,
    public: bool,
) -> Result<(), AccessError> {
    gate(conn, actor, workspace_id)?;
    conn.execute(
        "UPDATE workspaces SET public = ?1 WHERE workspace_id = ?2",
        params![public, workspace_id],
    )?;
    info!(workspace_id, public, actor = actor.id, "public flag set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entity::NewWorkspace;
    use crate::store::migrations;

    fn test_store() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory store");
        migrations::migrate(&mut conn).expect("migrate");
        conn
    }

    fn user(id: i64, is_admin: bool) -> User {
        User {
            id,
            username: format!("user{id}"),
            is_admin,
        }
    }

    fn workspace(public: bool, archived: bool, owner_id: i64, members: Vec<i64>) -> Workspace {
        Workspace {
            id: 1,
            name: "ws".into(),
            owner_id,
            public,
            archived,
            members,
        }
    }

    #[test]
    fn can_view_truth_table() {
        // Exhaustive over (public, member, admin).
        for public in [false, true] {
            for member in [false, true] {
                for admin in [false, true] {
                    let viewer = user(10, admin);
                    let members = if member { vec![1, 10] } else { vec![1] };
                    let ws = workspace(public, false, 1, members);
                    assert_eq!(
                        can_view(&viewer, &ws),
                        public || member || admin,
                        "public={public} member={member} admin={admin}"
                    );
                }
            }
        }
    }

    #[test]
    fn archive_blocks_workfile_changes_for_everyone() {
        let owner = user(1, false);
        let member = user(2, false);
        let admin = user(3, true);

        let live = workspace(false, false, 1, vec![1, 2]);
        assert!(can_modify_workfiles(&owner, &live));
        assert!(can_modify_workfiles(&member, &live));

        let archived = workspace(false, true, 1, vec![1, 2]);
        for viewer in [&owner, &member, &admin] {
            assert!(
                !can_modify_workfiles(viewer, &archived),
                "archived must block user {}",
                viewer.id
            );
        }

        // Visibility is unaffected by archival.
        assert!(can_view(&owner, &archived));
        assert!(can_view(&member, &archived));
    }

    #[test]
    fn non_member_cannot_modify_workfiles() {
        let outsider = user(9, false);
        let ws = workspace(true, false, 1, vec![1]);
        assert!(!can_modify_workfiles(&outsider, &ws));
    }

    #[test]
    fn administer_is_owner_only() {
        let owner = user(1, false);
        let member = user(2, false);
        let admin = user(3, true);
        let ws = workspace(false, false, 1, vec![1, 2]);

        assert!(can_administer(&owner, &ws));
        assert!(!can_administer(&member, &ws));
        // Site admin reads everything but does not own the workspace.
        assert!(!can_administer(&admin, &ws));
    }

    #[test]
    fn visible_workspaces_by_role() {
        let conn = test_store();
        let owner_id = entity::create_user(&conn, "owner", false).expect("user");
        let outsider_id = entity::create_user(&conn, "outsider", false).expect("user");
        let admin_id = entity::create_user(&conn, "admin", true).expect("user");

        entity::create_workspace(&conn, &NewWorkspace::public("open", owner_id)).expect("ws");
        entity::create_workspace(&conn, &NewWorkspace::private("closed", owner_id)).expect("ws");

        let owner = entity::get_user(&conn, owner_id).expect("q").expect("owner");
        let outsider = entity::get_user(&conn, outsider_id).expect("q").expect("outsider");
        let admin = entity::get_user(&conn, admin_id).expect("q").expect("admin");

        let names = |list: Vec<Workspace>| -> Vec<String> {
            list.into_iter().map(|ws| ws.name).collect()
        };

        assert_eq!(
            names(workspaces_visible_to(&conn, &owner).expect("q")),
            vec!["closed", "open"]
        );
        assert_eq!(
            names(workspaces_visible_to(&conn, &outsider).expect("q")),
            vec!["open"]
        );
        assert_eq!(
            names(workspaces_visible_to(&conn, &admin).expect("q")),
            vec!["closed", "open"]
        );
    }

    #[test]
    fn member_list_hidden_from_outsiders() {
        let conn = test_store();
        let owner_id = entity::create_user(&conn, "owner", false).expect("user");
        let outsider_id = entity::create_user(&conn, "outsider", false).expect("user");
        let ws = entity::create_workspace(&conn, &NewWorkspace::private("closed", owner_id))
            .expect("ws");

        let owner = entity::get_user(&conn, owner_id).expect("q").expect("owner");
        let outsider = entity::get_user(&conn, outsider_id).expect("q").expect("outsider");

        let for_owner = members_visible_to(&conn, &owner, ws).expect("members");
        assert_eq!(for_owner.len(), 1);
        assert_eq!(for_owner[0].id, owner_id);

        // Empty set, not an error.
        let for_outsider = members_visible_to(&conn, &outsider, ws).expect("members");
        assert!(for_outsider.is_empty());

        assert!(matches!(
            members_visible_to(&conn, &owner, 404),
            Err(AccessError::WorkspaceNotFound(404))
        ));
    }

    #[test]
    fn membership_mutations_gated_by_ownership() {
        let conn = test_store();
        let owner_id = entity::create_user(&conn, "owner", false).expect("user");
        let peer_id = entity::create_user(&conn, "peer", false).expect("user");
        let ws = entity::create_workspace(&conn, &NewWorkspace::private("closed", owner_id))
            .expect("ws");

        let owner = entity::get_user(&conn, owner_id).expect("q").expect("owner");
        let peer = entity::get_user(&conn, peer_id).expect("q").expect("peer");

        // Non-owner is rejected before any write.
        assert!(matches!(
            add_member(&conn, &peer, ws, peer_id),
            Err(AccessError::PermissionDenied { .. })
        ));

        add_member(&conn, &owner, ws, peer_id).expect("owner adds member");
        let loaded = entity::get_workspace(&conn, ws).expect("q").expect("ws");
        assert!(loaded.has_member(peer_id));

        // Next permission check reflects the change immediately.
        assert!(can_view(&peer, &loaded));

        remove_member(&conn, &owner, ws, peer_id).expect("owner removes member");
        let loaded = entity::get_workspace(&conn, ws).expect("q").expect("ws");
        assert!(!loaded.has_member(peer_id));

        assert!(matches!(
            remove_member(&conn, &owner, ws, owner_id),
            Err(AccessError::OwnerImmutable)
        ));
    }

    #[test]
    fn site_admin_may_mutate_membership() {
        let conn = test_store();
        let owner_id = entity::create_user(&conn, "owner", false).expect("user");
        let peer_id = entity::create_user(&conn, "peer", false).expect("user");
        let admin_id = entity::create_user(&conn, "admin", true).expect("user");
        let ws = entity::create_workspace(&conn, &NewWorkspace::private("closed", owner_id))
            .expect("ws");

        let admin = entity::get_user(&conn, admin_id).expect("q").expect("admin");
        add_member(&conn, &admin, ws, peer_id).expect("admin adds member");
        let loaded = entity::get_workspace(&conn, ws).expect("q").expect("ws");
        assert!(loaded.has_member(peer_id));
    }

    #[test]
    fn archive_roundtrip() {
        let conn = test_store();
        let owner_id = entity::create_user(&conn, "owner", false).expect("user");
        let ws = entity::create_workspace(&conn, &NewWorkspace::private("alpha", owner_id))
            .expect("ws");
        let owner = entity::get_user(&conn, owner_id).expect("q").expect("owner");

        set_archived(&conn, &owner, ws, true).expect("archive");
        let archived = entity::get_workspace(&conn, ws).expect("q").expect("ws");
        assert!(archived.archived);
        assert!(!can_modify_workfiles(&owner, &archived));
        assert!(can_view(&owner, &archived));

        set_archived(&conn, &owner, ws, false).expect("unarchive");
        let restored = entity::get_workspace(&conn, ws).expect("q").expect("ws");
        assert!(!restored.archived);
        assert!(can_modify_workfiles(&owner, &restored));
    }

    #[test]
    fn add_member_requires_existing_user() {
        let conn = test_store();
        let owner_id = entity::create_user(&conn, "owner", false).expect("user");
        let ws = entity::create_workspace(&conn, &NewWorkspace::private("alpha", owner_id))
            .expect("ws");
        let owner = entity::get_user(&conn, owner_id).expect("q").expect("owner");

        assert!(matches!(
            add_member(&conn, &owner, ws, 404),
            Err(AccessError::UserNotFound(404))
        ));
    }
}
