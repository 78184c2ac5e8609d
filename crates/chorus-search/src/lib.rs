//! chorus-search library.
//!
//! The search/tag indexer riding on the chorus store: an FTS5 index over
//! note bodies and derived display fields, plus entity taggings. The index
//! is pull-based — it consumes the event log through normal queries and
//! makes no ordering or delivery guarantee beyond that.

pub mod fts;
pub mod tags;

pub use fts::{NoteHit, ensure_index, index_event, rebuild, search_notes};
pub use tags::{MAX_TAG_CHARS, TagError, TagHit, search_tags, set_tags, tags_for};

use rusqlite::Connection;

/// Create every search-owned table/index that does not yet exist.
///
/// Idempotent; called by `chorus init` and before any indexing write.
///
/// # Errors
///
/// Returns an error if DDL execution fails.
pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    fts::ensure_index(conn)?;
    tags::ensure_tables(conn)?;
    Ok(())
}
