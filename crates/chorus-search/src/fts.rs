//! FTS5 full-text search over note bodies with BM25 ranking.
//!
//! The index stores, per note event: the free-text body and the derived
//! `type_name`/`grouping_id` of the note's primary target, resolved against
//! the live entity store at indexing time. Notes whose target has since
//! been deleted index with empty derived fields — the body stays
//! searchable.
//!
//! # Column Weights (BM25)
//!
//! | Column      | Weight | Rationale                                  |
//! |-------------|--------|--------------------------------------------|
//! | body        | 3.0    | The text users actually search for          |
//! | type_name   | 1.0    | Coarse facet, low cardinality               |
//! | grouping_id | 1.0    | Exact-ish target handle                     |

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::debug;

use chorus_core::event::{Event, TargetRole};
use chorus_core::store::{entity, query};

/// Default BM25 column weights: body=3, type_name=1, grouping_id=1.
pub const BM25_WEIGHT_BODY: f64 = 3.0;
pub const BM25_WEIGHT_TYPE_NAME: f64 = 1.0;
pub const BM25_WEIGHT_GROUPING_ID: f64 = 1.0;

/// An FTS5 search hit with BM25 relevance score (lower = better match).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NoteHit {
    pub event_id: i64,
    pub rank: f64,
}

/// Create the `notes_fts` virtual table if it does not exist.
///
/// Porter stemming over unicode61 tokenization, matching how bodies are
/// written: prose with the occasional identifier.
///
/// # Errors
///
/// Returns an error if DDL execution fails.
pub fn ensure_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
            body,
            type_name,
            grouping_id,
            event_id UNINDEXED,
            tokenize = 'porter unicode61'
        );",
    )
    .context("create notes_fts virtual table")
}

/// Index (or re-index) one event. Non-note kinds are a no-op.
///
/// Derived fields come from the note's primary target — `target1` when
/// populated, otherwise the `workspace` role — resolved against the live
/// store. A deleted target indexes with empty derived fields.
///
/// # Errors
///
/// Returns an error if resolution or the index write fails.
pub fn index_event(conn: &Connection, event: &Event) -> Result<()> {
    if !event.kind.is_note() {
        return Ok(());
    }
    let Some(body) = event.body() else {
        return Ok(());
    };

    let primary = event
        .target(TargetRole::Target1)
        .or_else(|| event.target(TargetRole::Workspace));

    let (type_name, grouping_id) = match primary {
        Some(reference) => {
            match entity::find_entity(conn, reference.entity_type, reference.id)
                .context("resolve note target for indexing")?
            {
                Some(live) => (live.type_name().to_string(), live.grouping_id()),
                None => (String::new(), String::new()),
            }
        }
        None => (String::new(), String::new()),
    };

    conn.execute(
        "DELETE FROM notes_fts WHERE event_id = ?1",
        [event.id],
    )
    .context("clear stale index rows")?;
    conn.execute(
        "INSERT INTO notes_fts (body, type_name, grouping_id, event_id) \
         VALUES (?1, ?2, ?3, ?4)",
        params![body, type_name, grouping_id, event.id],
    )
    .context("insert index row")?;

    debug!(event_id = event.id, "note indexed");
    Ok(())
}

/// Rebuild the whole index from the event log.
///
/// # Errors
///
/// Returns an error if any read or write fails.
pub fn rebuild(conn: &Connection) -> Result<usize> {
    ensure_index(conn)?;
    conn.execute("DELETE FROM notes_fts", [])
        .context("clear notes_fts")?;

    let mut stmt = conn
        .prepare("SELECT event_id FROM events ORDER BY event_id")
        .context("prepare event walk")?;
    let ids: Vec<i64> = stmt
        .query_map([], |row| row.get(0))
        .context("walk events")?
        .collect::<rusqlite::Result<_>>()
        .context("read event ids")?;

    let mut indexed = 0;
    for id in ids {
        let Some(event) = query::load_event(conn, id).context("load event for indexing")? else {
            continue;
        };
        if event.kind.is_note() {
            index_event(conn, &event)?;
            indexed += 1;
        }
    }

    debug!(indexed, "note index rebuilt");
    Ok(indexed)
}

/// Search the note index with BM25 ranking.
///
/// `query` is an FTS5 query string (stemming, prefix `*`, boolean ops).
/// Returns up to `limit` event ids, best match first.
///
/// # Errors
///
/// Returns an error if the FTS5 query is malformed or the index is missing.
pub fn search_notes(conn: &Connection, query: &str, limit: u32) -> Result<Vec<NoteHit>> {
    let sql = "SELECT event_id, bm25(notes_fts, ?1, ?2, ?3) AS rank \
               FROM notes_fts \
               WHERE notes_fts MATCH ?4 \
               ORDER BY rank \
               LIMIT ?5";

    let mut stmt = conn.prepare(sql).context("prepare FTS5 note search")?;
    let rows = stmt
        .query_map(
            params![
                BM25_WEIGHT_BODY,
                BM25_WEIGHT_TYPE_NAME,
                BM25_WEIGHT_GROUPING_ID,
                query,
                limit,
            ],
            |row| {
                Ok(NoteHit {
                    event_id: row.get(0)?,
                    rank: row.get(1)?,
                })
            },
        )
        .with_context(|| format!("execute FTS5 note search for '{query}'"))?;

    let mut hits = Vec::new();
    for row in rows {
        hits.push(row.context("read note search hit")?);
    }
    Ok(hits)
}
