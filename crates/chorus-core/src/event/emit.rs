//! Central event emission: validate against the kind schema, then append.
//!
//! Validation happens entirely before the write transaction opens, so a
//! rejected emission leaves no partial state. The event id is assigned by
//! the store's rowid sequence inside the insert transaction, never by
//! reading the previous maximum, which keeps ids unique and strictly
//! increasing under concurrent emitters.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::debug;

use super::data::{FieldType, FieldValue};
use super::kinds::EventKind;
use super::schema::{GlobalDelivery, TargetRole, schema_for};
use super::Event;
use crate::model::{Entity, EntityRef, EntityType};
use crate::store::entity;

/// A validated-on-emit request to append one event.
#[derive(Debug, Clone)]
pub struct EmitRequest {
    pub kind: EventKind,
    pub actor_id: i64,
    pub targets: BTreeMap<TargetRole, EntityRef>,
    pub data: BTreeMap<String, FieldValue>,
}

impl EmitRequest {
    /// Start a request for `kind` performed by `actor_id`.
    #[must_use]
    pub fn new(kind: EventKind, actor_id: i64) -> Self {
        Self {
            kind,
            actor_id,
            targets: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    /// Fill a target role.
    #[must_use]
    pub fn target(mut self, role: TargetRole, reference: EntityRef) -> Self {
        self.targets.insert(role, reference);
        self
    }

    /// Set a data field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }
}

/// Why an emission was rejected (nothing is written on any of these) or
/// failed at the store layer.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("event kind {kind} requires target role {role}")]
    MissingRole { kind: EventKind, role: TargetRole },

    #[error("event kind {kind} does not accept target role {role}")]
    UnexpectedRole { kind: EventKind, role: TargetRole },

    #[error("target role {role} must reference a {expected}, got {found}")]
    WrongTargetType {
        role: TargetRole,
        expected: EntityType,
        found: EntityType,
    },

    #[error("event kind {kind} requires data field '{field}'")]
    MissingField { kind: EventKind, field: &'static str },

    #[error("event kind {kind} does not accept data field '{field}'")]
    UnexpectedField { kind: EventKind, field: String },

    #[error("data field '{field}' must be {expected}, got {found}")]
    WrongFieldType {
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    #[error("actor {0} does not exist")]
    UnknownActor(i64),

    #[error("target role {role} references missing entity {reference}")]
    UnknownTarget {
        role: TargetRole,
        reference: EntityRef,
    },

    #[error("store error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Validate `req` against its kind schema and append it to the event log.
///
/// On success the event is committed and immediately visible to any feed
/// query issued after this call returns.
///
/// # Errors
///
/// Returns an [`EmitError`] describing the first validation failure, or a
/// wrapped store error. No row is written in either case.
pub fn emit(conn: &mut Connection, req: &EmitRequest) -> Result<Event, EmitError> {
    let schema = schema_for(req.kind);

    // Roles: every required role present with the right entity type, no
    // extras.
    for (role, expected) in schema.roles {
        match req.targets.get(role) {
            None => {
                return Err(EmitError::MissingRole {
                    kind: req.kind,
                    role: *role,
                });
            }
            Some(reference) if reference.entity_type != *expected => {
                return Err(EmitError::WrongTargetType {
                    role: *role,
                    expected: *expected,
                    found: reference.entity_type,
                });
            }
            Some(_) => {}
        }
    }
    for role in req.targets.keys() {
        if schema.role_type(*role).is_none() {
            return Err(EmitError::UnexpectedRole {
                kind: req.kind,
                role: *role,
            });
        }
    }

    // Fields: required present, all typed as declared, no extras.
    for (field, expected) in schema.required_fields {
        match req.data.get(*field) {
            None => {
                return Err(EmitError::MissingField {
                    kind: req.kind,
                    field,
                });
            }
            Some(value) if value.field_type() != *expected => {
                return Err(EmitError::WrongFieldType {
                    field: (*field).to_string(),
                    expected: *expected,
                    found: value.field_type(),
                });
            }
            Some(_) => {}
        }
    }
    for (field, value) in &req.data {
        let Some(expected) = schema.field_type(field) else {
            return Err(EmitError::UnexpectedField {
                kind: req.kind,
                field: field.clone(),
            });
        };
        if value.field_type() != expected {
            return Err(EmitError::WrongFieldType {
                field: field.clone(),
                expected,
                found: value.field_type(),
            });
        }
    }

    // Referential checks against the live entity store.
    if entity::get_user(conn, req.actor_id)?.is_none() {
        return Err(EmitError::UnknownActor(req.actor_id));
    }
    let mut workspace_public = false;
    for (role, reference) in &req.targets {
        match entity::find_entity(conn, reference.entity_type, reference.id)? {
            None => {
                return Err(EmitError::UnknownTarget {
                    role: *role,
                    reference: *reference,
                });
            }
            Some(Entity::Workspace(ws)) if *role == TargetRole::Workspace => {
                workspace_public = ws.public;
            }
            Some(_) => {}
        }
    }

    // Append: event row, role rows, data rows, delivery rows, one commit.
    let created_at_us = Utc::now().timestamp_micros();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO events (kind, actor_id, created_at_us) VALUES (?1, ?2, ?3)",
        params![req.kind.as_str(), req.actor_id, created_at_us],
    )?;
    let id = tx.last_insert_rowid();

    for (role, reference) in &req.targets {
        tx.execute(
            "INSERT INTO event_targets (event_id, role, entity_type, entity_id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id,
                role.as_str(),
                reference.entity_type.as_str(),
                reference.id
            ],
        )?;
    }

    for (field, value) in &req.data {
        tx.execute(
            "INSERT INTO event_data (event_id, field, value_type, value) \
             VALUES (?1, ?2, ?3, ?4)",
            params![id, field, value.field_type().as_str(), value.encode()],
        )?;
    }

    for (scope_type, scope_id) in delivery_scopes(req, workspace_public) {
        tx.execute(
            "INSERT OR IGNORE INTO event_activities (event_id, scope_type, scope_id) \
             VALUES (?1, ?2, ?3)",
            params![id, scope_type, scope_id],
        )?;
    }

    tx.commit()?;
    debug!(event_id = id, kind = %req.kind, actor = req.actor_id, "event appended");

    Ok(Event {
        id,
        kind: req.kind,
        actor_id: req.actor_id,
        targets: req.targets.clone(),
        data: req.data.clone(),
        created_at_us,
    })
}

/// Resolve the delivery scope rows for a request.
///
/// Deduplicated: an actor noting their own feed target produces one row.
fn delivery_scopes(req: &EmitRequest, workspace_public: bool) -> BTreeSet<(&'static str, i64)> {
    let delivery = schema_for(req.kind).delivery;
    let mut scopes = BTreeSet::new();

    if delivery.actor {
        scopes.insert(("user", req.actor_id));
    }
    for role in delivery.targets {
        if let Some(reference) = req.targets.get(role) {
            scopes.insert((reference.entity_type.as_str(), reference.id));
        }
    }
    match delivery.global {
        GlobalDelivery::Always => {
            scopes.insert(("global", 0));
        }
        GlobalDelivery::IfWorkspacePublic if workspace_public => {
            scopes.insert(("global", 0));
        }
        GlobalDelivery::IfWorkspacePublic | GlobalDelivery::Never => {}
    }

    scopes
}
