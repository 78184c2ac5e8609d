//! Entity tagging: set/replace tag lists and prefix search.
//!
//! A tagging binds a tag name to one entity. Setting tags replaces the
//! entity's whole tag set in one transaction, mirroring how the API layer
//! submits them. Names are capped at 100 characters and matched
//! case-insensitively.

use rusqlite::{Connection, params};
use tracing::debug;

use chorus_core::model::EntityRef;

/// Maximum characters in a tag name.
pub const MAX_TAG_CHARS: usize = 100;

/// A tag name with its usage count, as returned by tag search.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TagHit {
    pub name: String,
    pub count: usize,
}

/// Why a tagging write was rejected, or failed at the store layer.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("tag name must not be empty")]
    EmptyName,

    #[error("tag name '{name}' is {len} characters; the limit is {MAX_TAG_CHARS}")]
    TooLong { name: String, len: usize },

    #[error("store error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Create the `taggings` table if it does not exist.
///
/// # Errors
///
/// Returns an error if DDL execution fails.
pub fn ensure_tables(conn: &Connection) -> anyhow::Result<()> {
    use anyhow::Context as _;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS taggings (
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            name TEXT NOT NULL COLLATE NOCASE CHECK (length(trim(name)) > 0),
            created_at_us INTEGER NOT NULL,
            PRIMARY KEY (entity_type, entity_id, name)
        );
        CREATE INDEX IF NOT EXISTS idx_taggings_name ON taggings(name);",
    )
    .context("create taggings table")
}

/// Replace the tag set of an entity.
///
/// All names are validated before any write; on rejection the existing tag
/// set is untouched. Duplicate names (case-insensitively) collapse to one.
///
/// # Errors
///
/// Returns a [`TagError`] for an empty or over-long name, or a wrapped
/// store error.
pub fn set_tags(conn: &Connection, entity: EntityRef, names: &[String]) -> Result<(), TagError> {
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TagError::EmptyName);
        }
        let len = trimmed.chars().count();
        if len > MAX_TAG_CHARS {
            return Err(TagError::TooLong {
                name: trimmed.to_string(),
                len,
            });
        }
    }

    let now_us = now_us();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM taggings WHERE entity_type = ?1 AND entity_id = ?2",
        params![entity.entity_type.as_str(), entity.id],
    )?;
    for name in names {
        tx.execute(
            "INSERT OR IGNORE INTO taggings (entity_type, entity_id, name, created_at_us) \
             VALUES (?1, ?2, ?3, ?4)",
            params![entity.entity_type.as_str(), entity.id, name.trim(), now_us],
        )?;
    }
    tx.commit()?;

    debug!(entity = %entity, tags = names.len(), "tag set replaced");
    Ok(())
}

/// The tag names on an entity, alphabetical.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn tags_for(conn: &Connection, entity: EntityRef) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM taggings \
         WHERE entity_type = ?1 AND entity_id = ?2 \
         ORDER BY name",
    )?;
    let rows = stmt.query_map(params![entity.entity_type.as_str(), entity.id], |row| {
        row.get(0)
    })?;
    rows.collect()
}

/// Search tag names by case-insensitive prefix, with usage counts and
/// pagination. An empty query lists every tag.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn search_tags(
    conn: &Connection,
    query: &str,
    offset: u32,
    limit: u32,
) -> rusqlite::Result<Vec<TagHit>> {
    let pattern = format!("{}%", escape_like(query.trim()));
    let mut stmt = conn.prepare(
        "SELECT name, COUNT(*) FROM taggings \
         WHERE name LIKE ?1 ESCAPE '\\' \
         GROUP BY name \
         ORDER BY name \
         LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt.query_map(params![pattern, limit, offset], |row| {
        Ok(TagHit {
            name: row.get(0)?,
            count: row.get::<_, i64>(1)? as usize,
        })
    })?;
    rows.collect()
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn now_us() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::model::EntityType;
    use chorus_core::store::migrations;

    fn test_store() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory store");
        migrations::migrate(&mut conn).expect("migrate");
        ensure_tables(&conn).expect("tag schema");
        conn
    }

    fn workfile(id: i64) -> EntityRef {
        EntityRef::new(EntityType::Workfile, id)
    }

    #[test]
    fn set_replaces_existing_tags() {
        let conn = test_store();
        set_tags(&conn, workfile(1), &["alpha".into(), "omega".into()]).expect("set");
        assert_eq!(tags_for(&conn, workfile(1)).expect("list"), ["alpha", "omega"]);

        set_tags(&conn, workfile(1), &["beta".into()]).expect("replace");
        assert_eq!(tags_for(&conn, workfile(1)).expect("list"), ["beta"]);
    }

    #[test]
    fn rejects_empty_and_long_names_without_writing() {
        let conn = test_store();
        set_tags(&conn, workfile(1), &["keep".into()]).expect("seed");

        assert!(matches!(
            set_tags(&conn, workfile(1), &["  ".into()]),
            Err(TagError::EmptyName)
        ));
        let long = "x".repeat(MAX_TAG_CHARS + 1);
        assert!(matches!(
            set_tags(&conn, workfile(1), &["ok".into(), long]),
            Err(TagError::TooLong { .. })
        ));

        // The rejected calls must not have clobbered the existing set.
        assert_eq!(tags_for(&conn, workfile(1)).expect("list"), ["keep"]);
    }

    #[test]
    fn hundred_char_name_is_accepted() {
        let conn = test_store();
        let name = "y".repeat(MAX_TAG_CHARS);
        set_tags(&conn, workfile(1), &[name.clone()]).expect("set");
        assert_eq!(tags_for(&conn, workfile(1)).expect("list"), [name]);
    }

    #[test]
    fn search_matches_prefix_with_counts() {
        let conn = test_store();
        set_tags(&conn, workfile(1), &["finance".into(), "quarterly".into()]).expect("set");
        set_tags(&conn, workfile(2), &["finance".into()]).expect("set");
        set_tags(
            &conn,
            EntityRef::new(EntityType::Dataset, 9),
            &["fin-model".into()],
        )
        .expect("set");

        let hits = search_tags(&conn, "fin", 0, 10).expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "fin-model");
        assert_eq!(hits[0].count, 1);
        assert_eq!(hits[1].name, "finance");
        assert_eq!(hits[1].count, 2);

        // No substring matches: 'nance' is not a prefix.
        assert!(search_tags(&conn, "nance", 0, 10).expect("search").is_empty());
    }

    #[test]
    fn search_is_case_insensitive_and_paginated() {
        let conn = test_store();
        set_tags(
            &conn,
            workfile(1),
            &["Alpha".into(), "alps".into(), "beta".into()],
        )
        .expect("set");

        let page1 = search_tags(&conn, "al", 0, 1).expect("search");
        let page2 = search_tags(&conn, "al", 1, 1).expect("search");
        assert_eq!(page1.len(), 1);
        assert_eq!(page2.len(), 1);
        assert_ne!(page1[0].name, page2[0].name);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        let conn = test_store();
        set_tags(&conn, workfile(1), &["100%done".into(), "100x".into()]).expect("set");

        let hits = search_tags(&conn, "100%", 0, 10).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "100%done");
    }
}
