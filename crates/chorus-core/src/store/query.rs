//! Event log query helpers: hydration, scope candidates, and comments.
//!
//! All functions take a shared `&Connection` and return typed structs,
//! never raw rows. Candidate listings come back id-descending, which is the
//! canonical feed order.

use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, params};

use crate::event::{Event, EventKind, FieldType, FieldValue, TargetRole};
use crate::model::{EntityRef, EntityType};

/// A comment attached to an event. Soft-deleted comments are never
/// returned; the tombstone row stays in the table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Comment {
    pub id: i64,
    pub event_id: i64,
    pub author_id: i64,
    pub author: String,
    pub body: String,
    pub created_at_us: i64,
}

fn parse_col<T: FromStr>(index: usize, raw: &str) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Load one event with its targets and data.
///
/// # Errors
///
/// Returns an error if the query fails or a stored tag does not parse.
pub fn load_event(conn: &Connection, event_id: i64) -> rusqlite::Result<Option<Event>> {
    let header = conn
        .query_row(
            "SELECT event_id, kind, actor_id, created_at_us FROM events WHERE event_id = ?1",
            [event_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((id, kind_raw, actor_id, created_at_us)) = header else {
        return Ok(None);
    };

    let kind: EventKind = parse_col(1, &kind_raw)?;
    let targets = load_targets(conn, id)?;
    let data = load_data(conn, id)?;

    Ok(Some(Event {
        id,
        kind,
        actor_id,
        targets,
        data,
        created_at_us,
    }))
}

fn load_targets(
    conn: &Connection,
    event_id: i64,
) -> rusqlite::Result<BTreeMap<TargetRole, EntityRef>> {
    let mut stmt = conn.prepare(
        "SELECT role, entity_type, entity_id FROM event_targets WHERE event_id = ?1",
    )?;
    let rows = stmt.query_map([event_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut targets = BTreeMap::new();
    for row in rows {
        let (role_raw, type_raw, entity_id) = row?;
        let role: TargetRole = parse_col(0, &role_raw)?;
        let entity_type: EntityType = parse_col(1, &type_raw)?;
        targets.insert(role, EntityRef::new(entity_type, entity_id));
    }
    Ok(targets)
}

fn load_data(conn: &Connection, event_id: i64) -> rusqlite::Result<BTreeMap<String, FieldValue>> {
    let mut stmt =
        conn.prepare("SELECT field, value_type, value FROM event_data WHERE event_id = ?1")?;
    let rows = stmt.query_map([event_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut data = BTreeMap::new();
    for row in rows {
        let (field, type_raw, value_raw) = row?;
        let field_type: FieldType = match type_raw.as_str() {
            "text" => FieldType::Text,
            "int" => FieldType::Int,
            "bool" => FieldType::Bool,
            other => {
                return Err(rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    format!("unknown value_type '{other}'").into(),
                ));
            }
        };
        let value = FieldValue::decode(field_type, &value_raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        data.insert(field, value);
    }
    Ok(data)
}

/// Event ids delivered to a feed scope, newest first.
///
/// `scope_type`/`scope_id` address the `event_activities` table; the global
/// feed is `("global", 0)`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn scope_event_ids(
    conn: &Connection,
    scope_type: &str,
    scope_id: i64,
) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT event_id FROM event_activities \
         WHERE scope_type = ?1 AND scope_id = ?2 \
         ORDER BY event_id DESC",
    )?;
    let rows = stmt.query_map(params![scope_type, scope_id], |row| row.get(0))?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Append a comment to an event.
///
/// # Errors
///
/// Returns an error if the event or author does not exist (foreign keys) or
/// the insert fails.
pub fn add_comment(
    conn: &Connection,
    event_id: i64,
    author_id: i64,
    body: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO event_comments (event_id, author_id, body, is_deleted, created_at_us) \
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![
            event_id,
            author_id,
            body,
            chrono::Utc::now().timestamp_micros()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Comments on an event in insertion order, tombstoned ones excluded.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_comments(conn: &Connection, event_id: i64) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT c.comment_id, c.event_id, c.author_id, u.username, c.body, c.created_at_us \
         FROM event_comments c \
         INNER JOIN users u ON u.user_id = c.author_id \
         WHERE c.event_id = ?1 AND c.is_deleted = 0 \
         ORDER BY c.comment_id",
    )?;
    let rows = stmt.query_map([event_id], |row| {
        Ok(Comment {
            id: row.get(0)?,
            event_id: row.get(1)?,
            author_id: row.get(2)?,
            author: row.get(3)?,
            body: row.get(4)?,
            created_at_us: row.get(5)?,
        })
    })?;
    rows.collect()
}

/// Fetch a single comment by id, unless it is soft-deleted.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_comment(conn: &Connection, comment_id: i64) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        "SELECT c.comment_id, c.event_id, c.author_id, u.username, c.body, c.created_at_us \
         FROM event_comments c \
         INNER JOIN users u ON u.user_id = c.author_id \
         WHERE c.comment_id = ?1 AND c.is_deleted = 0",
        [comment_id],
        |row| {
            Ok(Comment {
                id: row.get(0)?,
                event_id: row.get(1)?,
                author_id: row.get(2)?,
                author: row.get(3)?,
                body: row.get(4)?,
                created_at_us: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Soft-delete a comment. The row stays; it just stops being returned.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn delete_comment(conn: &Connection, comment_id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE event_comments SET is_deleted = 1 WHERE comment_id = ?1 AND is_deleted = 0",
        [comment_id],
    )?;
    Ok(changed > 0)
}
