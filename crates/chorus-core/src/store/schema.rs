//! Canonical SQLite schema for the chorus store.
//!
//! The schema is normalized around the append-only event log:
//! - entity tables (`users`, `workspaces`, `workspace_members`, `instances`,
//!   `datasets`, `workfiles`) hold the live entity store
//! - `events` holds one row per emitted event; its rowid is the event id and
//!   the canonical feed ordering key
//! - `event_targets` and `event_data` hold the kind-specific role and field
//!   rows
//! - `event_activities` materializes feed delivery (actor feed, entity
//!   feeds, and the `('global', 0)` row for globally visible events)
//! - `event_comments` preserves comment timelines with soft-delete
//!   tombstones
//! - `store_meta` tracks the schema version
//!
//! `event_targets` deliberately carries no foreign keys to the entity
//! tables: datasets and workfiles may be hard-deleted later, and the feed
//! renders such references as tombstones instead of losing the event.

/// Migration v1: entity tables, event log tables, and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE CHECK (length(trim(username)) > 0),
    is_admin INTEGER NOT NULL DEFAULT 0 CHECK (is_admin IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS workspaces (
    workspace_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    owner_id INTEGER NOT NULL REFERENCES users(user_id),
    public INTEGER NOT NULL DEFAULT 0 CHECK (public IN (0, 1)),
    archived INTEGER NOT NULL DEFAULT 0 CHECK (archived IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS workspace_members (
    workspace_id INTEGER NOT NULL REFERENCES workspaces(workspace_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    added_at_us INTEGER NOT NULL,
    PRIMARY KEY (workspace_id, user_id)
);

CREATE TABLE IF NOT EXISTS instances (
    instance_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    flavor TEXT NOT NULL CHECK (flavor IN ('greenplum', 'hadoop')),
    description TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS datasets (
    dataset_id INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id INTEGER NOT NULL REFERENCES workspaces(workspace_id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS workfiles (
    workfile_id INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id INTEGER NOT NULL REFERENCES workspaces(workspace_id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    actor_id INTEGER NOT NULL REFERENCES users(user_id),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS event_targets (
    event_id INTEGER NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('target1', 'target2', 'workspace')),
    entity_type TEXT NOT NULL
        CHECK (entity_type IN ('user', 'workspace', 'dataset', 'workfile', 'instance')),
    entity_id INTEGER NOT NULL,
    PRIMARY KEY (event_id, role)
);

CREATE TABLE IF NOT EXISTS event_data (
    event_id INTEGER NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    field TEXT NOT NULL CHECK (length(trim(field)) > 0),
    value_type TEXT NOT NULL CHECK (value_type IN ('text', 'int', 'bool')),
    value TEXT NOT NULL,
    PRIMARY KEY (event_id, field)
);

CREATE TABLE IF NOT EXISTS event_activities (
    event_id INTEGER NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    scope_type TEXT NOT NULL
        CHECK (scope_type IN ('user', 'workspace', 'dataset', 'workfile', 'instance', 'global')),
    scope_id INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (event_id, scope_type, scope_id)
);

CREATE TABLE IF NOT EXISTS event_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    author_id INTEGER NOT NULL REFERENCES users(user_id),
    body TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us) VALUES (1, 1, 0);
";

/// Migration v2: read-path indexes for feed and membership queries.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_event_activities_scope
    ON event_activities(scope_type, scope_id, event_id DESC);

CREATE INDEX IF NOT EXISTS idx_event_targets_entity
    ON event_targets(entity_type, entity_id, event_id DESC);

CREATE INDEX IF NOT EXISTS idx_event_comments_event
    ON event_comments(event_id, comment_id);

CREATE INDEX IF NOT EXISTS idx_workspace_members_user
    ON workspace_members(user_id, workspace_id);

CREATE INDEX IF NOT EXISTS idx_datasets_workspace
    ON datasets(workspace_id);

CREATE INDEX IF NOT EXISTS idx_workfiles_workspace
    ON workfiles(workspace_id);

CREATE INDEX IF NOT EXISTS idx_events_actor
    ON events(actor_id, event_id DESC);
";

/// Index names v2 must create; used by migration tests.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_event_activities_scope",
    "idx_event_targets_entity",
    "idx_event_comments_event",
    "idx_workspace_members_user",
    "idx_datasets_workspace",
    "idx_workfiles_workspace",
    "idx_events_actor",
];
