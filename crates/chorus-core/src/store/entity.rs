//! The entity store: typed CRUD over the live entity tables.
//!
//! This is the single resolution point for event target references
//! ([`find_entity`]). Datasets and workfiles support hard deletion; a
//! dangling event target is rendered as a tombstone by the feed assembler,
//! so deletes here never touch the event log.
//!
//! Membership and the workspace `public`/`archived` flags are *not* written
//! here: the access layer owns those mutations.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{
    Dataset, Entity, EntityType, Instance, InstanceFlavor, User, Workfile, Workspace,
};

fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Create a user and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. duplicate username).
pub fn create_user(conn: &Connection, username: &str, is_admin: bool) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, is_admin, created_at_us) VALUES (?1, ?2, ?3)",
        params![username, is_admin, now_us()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a user by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT user_id, username, is_admin FROM users WHERE user_id = ?1",
        [user_id],
        row_to_user,
    )
    .optional()
}

/// Fetch a user by exact username.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_user_by_name(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT user_id, username, is_admin FROM users WHERE username = ?1",
        [username],
        row_to_user,
    )
    .optional()
}

/// List all users, username order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_users(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt =
        conn.prepare("SELECT user_id, username, is_admin FROM users ORDER BY username")?;
    let rows = stmt.query_map([], row_to_user)?;
    rows.collect()
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        is_admin: row.get(2)?,
    })
}

// ---------------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------------

/// Parameters for creating a workspace.
#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub name: String,
    pub owner_id: i64,
    pub public: bool,
}

impl NewWorkspace {
    /// A private workspace owned by `owner_id`.
    #[must_use]
    pub fn private(name: &str, owner_id: i64) -> Self {
        Self {
            name: name.to_string(),
            owner_id,
            public: false,
        }
    }

    /// A public workspace owned by `owner_id`.
    #[must_use]
    pub fn public(name: &str, owner_id: i64) -> Self {
        Self {
            name: name.to_string(),
            owner_id,
            public: true,
        }
    }
}

/// Create a workspace and enroll the owner as its first member, atomically.
///
/// # Errors
///
/// Returns an error if either insert fails; neither row is written then.
pub fn create_workspace(conn: &Connection, new: &NewWorkspace) -> rusqlite::Result<i64> {
    let ts = now_us();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO workspaces (name, owner_id, public, archived, created_at_us) \
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![new.name, new.owner_id, new.public, ts],
    )?;
    let workspace_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO workspace_members (workspace_id, user_id, added_at_us) \
         VALUES (?1, ?2, ?3)",
        params![workspace_id, new.owner_id, ts],
    )?;
    tx.commit()?;
    Ok(workspace_id)
}

/// Fetch a workspace with its member list.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_workspace(conn: &Connection, workspace_id: i64) -> rusqlite::Result<Option<Workspace>> {
    let base = conn
        .query_row(
            "SELECT workspace_id, name, owner_id, public, archived \
             FROM workspaces WHERE workspace_id = ?1",
            [workspace_id],
            |row| {
                Ok(Workspace {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_id: row.get(2)?,
                    public: row.get(3)?,
                    archived: row.get(4)?,
                    members: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut workspace) = base else {
        return Ok(None);
    };
    workspace.members = member_ids(conn, workspace_id)?;
    Ok(Some(workspace))
}

/// List all workspaces (member lists included), name order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_workspaces(conn: &Connection) -> rusqlite::Result<Vec<Workspace>> {
    let mut stmt = conn.prepare(
        "SELECT workspace_id, name, owner_id, public, archived \
         FROM workspaces ORDER BY name, workspace_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Workspace {
            id: row.get(0)?,
            name: row.get(1)?,
            owner_id: row.get(2)?,
            public: row.get(3)?,
            archived: row.get(4)?,
            members: Vec::new(),
        })
    })?;

    let mut workspaces: Vec<Workspace> = rows.collect::<rusqlite::Result<_>>()?;
    for workspace in &mut workspaces {
        workspace.members = member_ids(conn, workspace.id)?;
    }
    Ok(workspaces)
}

fn member_ids(conn: &Connection, workspace_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM workspace_members \
         WHERE workspace_id = ?1 ORDER BY added_at_us, user_id",
    )?;
    let rows = stmt.query_map([workspace_id], |row| row.get(0))?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

/// Register a data instance and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_instance(
    conn: &Connection,
    name: &str,
    flavor: InstanceFlavor,
    description: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO instances (name, flavor, description, created_at_us) \
         VALUES (?1, ?2, ?3, ?4)",
        params![name, flavor.as_str(), description, now_us()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch an instance by id.
///
/// # Errors
///
/// Returns an error if the query fails or a stored flavor is unknown.
pub fn get_instance(conn: &Connection, instance_id: i64) -> rusqlite::Result<Option<Instance>> {
    conn.query_row(
        "SELECT instance_id, name, flavor, description \
         FROM instances WHERE instance_id = ?1",
        [instance_id],
        |row| {
            let flavor: String = row.get(2)?;
            Ok(Instance {
                id: row.get(0)?,
                name: row.get(1)?,
                flavor: flavor.parse().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                description: row.get(3)?,
            })
        },
    )
    .optional()
}

// ---------------------------------------------------------------------------
// Datasets and workfiles
// ---------------------------------------------------------------------------

/// Create a dataset in a workspace and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_dataset(conn: &Connection, workspace_id: i64, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO datasets (workspace_id, name, created_at_us) VALUES (?1, ?2, ?3)",
        params![workspace_id, name, now_us()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a dataset by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_dataset(conn: &Connection, dataset_id: i64) -> rusqlite::Result<Option<Dataset>> {
    conn.query_row(
        "SELECT dataset_id, workspace_id, name FROM datasets WHERE dataset_id = ?1",
        [dataset_id],
        |row| {
            Ok(Dataset {
                id: row.get(0)?,
                workspace_id: row.get(1)?,
                name: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Hard-delete a dataset. Events referencing it tombstone at render time.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_dataset(conn: &Connection, dataset_id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute("DELETE FROM datasets WHERE dataset_id = ?1", [dataset_id])?;
    Ok(changed > 0)
}

/// Create a workfile in a workspace and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_workfile(conn: &Connection, workspace_id: i64, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO workfiles (workspace_id, name, created_at_us) VALUES (?1, ?2, ?3)",
        params![workspace_id, name, now_us()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a workfile by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_workfile(conn: &Connection, workfile_id: i64) -> rusqlite::Result<Option<Workfile>> {
    conn.query_row(
        "SELECT workfile_id, workspace_id, name FROM workfiles WHERE workfile_id = ?1",
        [workfile_id],
        |row| {
            Ok(Workfile {
                id: row.get(0)?,
                workspace_id: row.get(1)?,
                name: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Hard-delete a workfile. Events referencing it tombstone at render time.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_workfile(conn: &Connection, workfile_id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "DELETE FROM workfiles WHERE workfile_id = ?1",
        [workfile_id],
    )?;
    Ok(changed > 0)
}

// ---------------------------------------------------------------------------
// Polymorphic resolution
// ---------------------------------------------------------------------------

/// Resolve a typed entity reference against the live store.
///
/// This is the read-time resolution point for event targets and derived
/// display fields: `None` means the entity has since been deleted (or never
/// existed) and callers should tombstone, not fail.
///
/// # Errors
///
/// Returns an error if the underlying query fails.
pub fn find_entity(
    conn: &Connection,
    entity_type: EntityType,
    id: i64,
) -> rusqlite::Result<Option<Entity>> {
    Ok(match entity_type {
        EntityType::User => get_user(conn, id)?.map(Entity::User),
        EntityType::Workspace => get_workspace(conn, id)?.map(Entity::Workspace),
        EntityType::Dataset => get_dataset(conn, id)?.map(Entity::Dataset),
        EntityType::Workfile => get_workfile(conn, id)?.map(Entity::Workfile),
        EntityType::Instance => get_instance(conn, id)?.map(Entity::Instance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::migrations;

    fn test_store() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory store");
        migrations::migrate(&mut conn).expect("migrate");
        conn
    }

    #[test]
    fn create_and_find_user() {
        let conn = test_store();
        let id = create_user(&conn, "deirdre", false).expect("create");

        let user = get_user(&conn, id).expect("query").expect("exists");
        assert_eq!(user.username, "deirdre");
        assert!(!user.is_admin);

        let by_name = get_user_by_name(&conn, "deirdre").expect("query").expect("exists");
        assert_eq!(by_name.id, id);
    }

    #[test]
    fn duplicate_username_rejected() {
        let conn = test_store();
        create_user(&conn, "deirdre", false).expect("create");
        assert!(create_user(&conn, "deirdre", true).is_err());
    }

    #[test]
    fn workspace_owner_is_enrolled() {
        let conn = test_store();
        let owner = create_user(&conn, "owner", false).expect("create user");
        let id = create_workspace(&conn, &NewWorkspace::private("alpha", owner))
            .expect("create workspace");

        let ws = get_workspace(&conn, id).expect("query").expect("exists");
        assert_eq!(ws.owner_id, owner);
        assert!(ws.has_member(owner));
        assert!(!ws.public);
        assert!(!ws.archived);
    }

    #[test]
    fn find_entity_resolves_each_type() {
        let conn = test_store();
        let owner = create_user(&conn, "owner", false).expect("user");
        let ws = create_workspace(&conn, &NewWorkspace::public("alpha", owner)).expect("ws");
        let ds = create_dataset(&conn, ws, "orders").expect("dataset");
        let wf = create_workfile(&conn, ws, "report.sql").expect("workfile");
        let inst =
            create_instance(&conn, "prod-gp", InstanceFlavor::Greenplum, Some("prod")).expect("gp");

        assert!(matches!(
            find_entity(&conn, EntityType::User, owner).expect("q"),
            Some(Entity::User(_))
        ));
        assert!(matches!(
            find_entity(&conn, EntityType::Workspace, ws).expect("q"),
            Some(Entity::Workspace(_))
        ));
        assert!(matches!(
            find_entity(&conn, EntityType::Dataset, ds).expect("q"),
            Some(Entity::Dataset(_))
        ));
        assert!(matches!(
            find_entity(&conn, EntityType::Workfile, wf).expect("q"),
            Some(Entity::Workfile(_))
        ));
        assert!(matches!(
            find_entity(&conn, EntityType::Instance, inst).expect("q"),
            Some(Entity::Instance(_))
        ));
    }

    #[test]
    fn deleted_dataset_resolves_to_none() {
        let conn = test_store();
        let owner = create_user(&conn, "owner", false).expect("user");
        let ws = create_workspace(&conn, &NewWorkspace::private("alpha", owner)).expect("ws");
        let ds = create_dataset(&conn, ws, "orders").expect("dataset");

        assert!(delete_dataset(&conn, ds).expect("delete"));
        assert!(find_entity(&conn, EntityType::Dataset, ds).expect("q").is_none());
        assert!(!delete_dataset(&conn, ds).expect("second delete is a no-op"));
    }
}
