//! Event data model for the chorus event log.
//!
//! An [`Event`] is an immutable record of a domain action: a kind tag, the
//! acting user, a kind-specific set of target roles, and a flat scalar
//! payload. Events are appended by [`emit::emit`] after central validation
//! against the per-kind [`schema`] table; nothing malformed ever reaches
//! the log.
//!
//! Event ids come from the store's rowid sequence, assigned inside the
//! insert transaction. They are strictly increasing and never reused, so
//! `id` descending is the canonical feed order and needs no tie-break.

pub mod data;
pub mod emit;
pub mod kinds;
pub mod schema;

pub use data::{FieldType, FieldValue};
pub use emit::{EmitError, EmitRequest, emit};
pub use kinds::{EventKind, UnknownEventKind};
pub use schema::{Delivery, GlobalDelivery, KindSchema, TargetRole, schema_for};

use crate::model::EntityRef;
use serde::Serialize;
use std::collections::BTreeMap;

/// A single event in the chorus event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Monotonically increasing id; the canonical feed ordering key.
    pub id: i64,

    /// The kind tag. Fixes the valid role set and data fields.
    pub kind: EventKind,

    /// The user who performed the action.
    pub actor_id: i64,

    /// Kind-specific role assignments.
    pub targets: BTreeMap<TargetRole, EntityRef>,

    /// Kind-specific flat scalar payload.
    pub data: BTreeMap<String, FieldValue>,

    /// Wall-clock microseconds since Unix epoch, immutable.
    pub created_at_us: i64,
}

impl Event {
    /// The entity reference filling `role`, if populated.
    #[must_use]
    pub fn target(&self, role: TargetRole) -> Option<EntityRef> {
        self.targets.get(&role).copied()
    }

    /// The free-text body, for note kinds.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.data.get("body").and_then(FieldValue::as_text)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} actor={}", self.id, self.kind, self.actor_id)?;
        for (role, target) in &self.targets {
            write!(f, " {role}={target}")?;
        }
        Ok(())
    }
}
