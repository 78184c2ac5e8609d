//! Per-kind schema table: target roles, data fields, and feed delivery.
//!
//! The original system expressed this as one subclass per event kind; here
//! it is a single static table keyed by [`EventKind`], so emission-time
//! validation lives in one place instead of being scattered across kind
//! definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::data::FieldType;
use super::kinds::EventKind;
use crate::model::EntityType;

/// A named slot in an event pointing at an entity involved in the action.
///
/// The actor is not a role: it is a separate, always-required field on the
/// event itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetRole {
    /// The primary subject of the action (the note's subject, the imported
    /// dataset, the created workfile).
    Target1,
    /// A secondary subject, unused by the current catalog but reserved in
    /// the role vocabulary and the store schema.
    Target2,
    /// The workspace the action is scoped to. Its presence drives the feed
    /// visibility filter.
    Workspace,
}

impl TargetRole {
    pub const ALL: [Self; 3] = [Self::Target1, Self::Target2, Self::Workspace];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target1 => "target1",
            Self::Target2 => "target2",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for TargetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown target role string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target role '{0}': expected one of target1, target2, workspace")]
pub struct UnknownTargetRole(pub String);

impl FromStr for TargetRole {
    type Err = UnknownTargetRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "target1" => Ok(Self::Target1),
            "target2" => Ok(Self::Target2),
            "workspace" => Ok(Self::Workspace),
            _ => Err(UnknownTargetRole(s.to_string())),
        }
    }
}

/// Whether a kind's events join the global feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalDelivery {
    /// Never delivered globally.
    Never,
    /// Always delivered globally.
    Always,
    /// Delivered globally only when the `workspace` target is public at
    /// emission time.
    IfWorkspacePublic,
}

/// Where a kind's events are delivered at emission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Deliver to the actor's personal feed.
    pub actor: bool,
    /// Roles whose referenced entity receives the event in its feed.
    pub targets: &'static [TargetRole],
    /// Global feed policy.
    pub global: GlobalDelivery,
}

/// The full schema for one event kind.
#[derive(Debug, Clone, Copy)]
pub struct KindSchema {
    pub kind: EventKind,
    /// Required roles, with the entity type each must reference.
    pub roles: &'static [(TargetRole, EntityType)],
    /// Required data fields with their scalar types.
    pub required_fields: &'static [(&'static str, FieldType)],
    /// Optional data fields with their scalar types.
    pub optional_fields: &'static [(&'static str, FieldType)],
    pub delivery: Delivery,
}

impl KindSchema {
    /// The expected entity type for `role`, if the kind declares it.
    #[must_use]
    pub fn role_type(&self, role: TargetRole) -> Option<EntityType> {
        self.roles
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, et)| *et)
    }

    /// The declared scalar type for `field`, if the kind accepts it.
    #[must_use]
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.required_fields
            .iter()
            .chain(self.optional_fields)
            .find(|(name, _)| *name == field)
            .map(|(_, ft)| *ft)
    }
}

const TARGET1_ONLY: &[TargetRole] = &[TargetRole::Target1];
const WORKSPACE_ONLY: &[TargetRole] = &[TargetRole::Workspace];
const TARGET_AND_WORKSPACE: &[TargetRole] = &[TargetRole::Target1, TargetRole::Workspace];

const BODY: &[(&str, FieldType)] = &[("body", FieldType::Text)];
const NO_FIELDS: &[(&str, FieldType)] = &[];
const IMPORT_FIELDS: &[(&str, FieldType)] = &[("destination_table", FieldType::Text)];
const IMPORT_FAILED_FIELDS: &[(&str, FieldType)] = &[
    ("destination_table", FieldType::Text),
    ("error_message", FieldType::Text),
];

/// Look up the schema for an event kind. Total over the catalog.
#[must_use]
pub const fn schema_for(kind: EventKind) -> KindSchema {
    match kind {
        EventKind::GreenplumInstanceCreated | EventKind::HadoopInstanceCreated => KindSchema {
            kind,
            roles: &[(TargetRole::Target1, EntityType::Instance)],
            required_fields: NO_FIELDS,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: TARGET1_ONLY,
                global: GlobalDelivery::Always,
            },
        },
        EventKind::UserAdded => KindSchema {
            kind,
            roles: &[(TargetRole::Target1, EntityType::User)],
            required_fields: NO_FIELDS,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: false,
                targets: &[],
                global: GlobalDelivery::Always,
            },
        },
        EventKind::WorkspaceCreated => KindSchema {
            kind,
            roles: &[(TargetRole::Workspace, EntityType::Workspace)],
            required_fields: NO_FIELDS,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: WORKSPACE_ONLY,
                global: GlobalDelivery::IfWorkspacePublic,
            },
        },
        EventKind::WorkspaceArchived
        | EventKind::WorkspaceUnarchived
        | EventKind::WorkspaceMakePublic
        | EventKind::WorkspaceMakePrivate => KindSchema {
            kind,
            roles: &[(TargetRole::Workspace, EntityType::Workspace)],
            required_fields: NO_FIELDS,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: WORKSPACE_ONLY,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::MembersAdded => KindSchema {
            kind,
            roles: &[(TargetRole::Workspace, EntityType::Workspace)],
            required_fields: &[("num_added", FieldType::Int)],
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: WORKSPACE_ONLY,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::WorkfileCreated => KindSchema {
            kind,
            roles: &[
                (TargetRole::Target1, EntityType::Workfile),
                (TargetRole::Workspace, EntityType::Workspace),
            ],
            required_fields: NO_FIELDS,
            optional_fields: &[("commit_message", FieldType::Text)],
            delivery: Delivery {
                actor: true,
                targets: TARGET_AND_WORKSPACE,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::SourceTableCreated => KindSchema {
            kind,
            roles: &[
                (TargetRole::Target1, EntityType::Dataset),
                (TargetRole::Workspace, EntityType::Workspace),
            ],
            required_fields: NO_FIELDS,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: TARGET_AND_WORKSPACE,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::DatasetImportCreated | EventKind::DatasetImportSuccess => KindSchema {
            kind,
            roles: &[
                (TargetRole::Target1, EntityType::Dataset),
                (TargetRole::Workspace, EntityType::Workspace),
            ],
            required_fields: IMPORT_FIELDS,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: TARGET_AND_WORKSPACE,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::DatasetImportFailed => KindSchema {
            kind,
            roles: &[
                (TargetRole::Target1, EntityType::Dataset),
                (TargetRole::Workspace, EntityType::Workspace),
            ],
            required_fields: IMPORT_FAILED_FIELDS,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: TARGET_AND_WORKSPACE,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::NoteOnGreenplumInstance | EventKind::NoteOnHadoopInstance => KindSchema {
            kind,
            roles: &[(TargetRole::Target1, EntityType::Instance)],
            required_fields: BODY,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: TARGET1_ONLY,
                global: GlobalDelivery::Always,
            },
        },
        EventKind::NoteOnWorkspace => KindSchema {
            kind,
            roles: &[(TargetRole::Workspace, EntityType::Workspace)],
            required_fields: BODY,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: WORKSPACE_ONLY,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::NoteOnDataset => KindSchema {
            kind,
            roles: &[
                (TargetRole::Target1, EntityType::Dataset),
                (TargetRole::Workspace, EntityType::Workspace),
            ],
            required_fields: BODY,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: TARGET_AND_WORKSPACE,
                global: GlobalDelivery::Never,
            },
        },
        EventKind::NoteOnWorkfile => KindSchema {
            kind,
            roles: &[
                (TargetRole::Target1, EntityType::Workfile),
                (TargetRole::Workspace, EntityType::Workspace),
            ],
            required_fields: BODY,
            optional_fields: NO_FIELDS,
            delivery: Delivery {
                actor: true,
                targets: TARGET_AND_WORKSPACE,
                global: GlobalDelivery::Never,
            },
        },
    }
}
