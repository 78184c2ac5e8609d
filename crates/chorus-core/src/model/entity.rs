//! Entity types, references, and the workspace-scoped objects feeds point at.
//!
//! An [`EntityRef`] is the unit an event target role stores: a type tag plus
//! a numeric id. Resolution back to a full [`Entity`] happens at read time
//! against the live store, never at emission time, so renames are reflected
//! in old feed entries and deletions degrade to tombstones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of entity types an event target may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Workspace,
    Dataset,
    Workfile,
    Instance,
}

/// Error returned when parsing an unknown entity type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntityType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown entity type '{}': expected one of user, workspace, dataset, \
             workfile, instance",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEntityType {}

impl EntityType {
    /// All known entity types in catalog order.
    pub const ALL: [Self; 5] = [
        Self::User,
        Self::Workspace,
        Self::Dataset,
        Self::Workfile,
        Self::Instance,
    ];

    /// Return the canonical lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Workspace => "workspace",
            Self::Dataset => "dataset",
            Self::Workfile => "workfile",
            Self::Instance => "instance",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "workspace" => Ok(Self::Workspace),
            "dataset" => Ok(Self::Dataset),
            "workfile" => Ok(Self::Workfile),
            "instance" => Ok(Self::Instance),
            _ => Err(UnknownEntityType { raw: s.to_string() }),
        }
    }
}

/// A typed reference to an entity, as stored in an event target role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub id: i64,
}

impl EntityRef {
    #[must_use]
    pub const fn new(entity_type: EntityType, id: i64) -> Self {
        Self { entity_type, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// Which backend a registered data instance fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceFlavor {
    Greenplum,
    Hadoop,
}

impl InstanceFlavor {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greenplum => "greenplum",
            Self::Hadoop => "hadoop",
        }
    }

    /// The `type_name` exposed to search indexing and feed rendering.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Greenplum => "greenplum_instance",
            Self::Hadoop => "hadoop_instance",
        }
    }
}

impl fmt::Display for InstanceFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceFlavor {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greenplum" => Ok(Self::Greenplum),
            "hadoop" => Ok(Self::Hadoop),
            _ => Err(UnknownEntityType { raw: s.to_string() }),
        }
    }
}

/// A registered Greenplum or Hadoop instance. Not workspace-scoped:
/// instance-level events are visible to any authenticated viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: i64,
    pub name: String,
    pub flavor: InstanceFlavor,
    pub description: Option<String>,
}

/// A dataset registered inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
}

/// A workfile stored inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workfile {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
}

/// A fully resolved entity, as returned by the store's `find_entity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    User(super::User),
    Workspace(super::Workspace),
    Dataset(Dataset),
    Workfile(Workfile),
    Instance(Instance),
}

impl Entity {
    /// The display name used when rendering a live target reference.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(u) => &u.username,
            Self::Workspace(w) => &w.name,
            Self::Dataset(d) => &d.name,
            Self::Workfile(f) => &f.name,
            Self::Instance(i) => &i.name,
        }
    }

    /// The `type_name` derived display field (resolved at read time).
    ///
    /// Instances split by flavor; everything else matches its entity type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Workspace(_) => "workspace",
            Self::Dataset(_) => "dataset",
            Self::Workfile(_) => "workfile",
            Self::Instance(i) => i.flavor.type_name(),
        }
    }

    /// The `grouping_id` derived display field: `<type_name>:<id>`.
    #[must_use]
    pub fn grouping_id(&self) -> String {
        format!("{}:{}", self.type_name(), self.id())
    }

    /// The numeric id of the underlying record.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::User(u) => u.id,
            Self::Workspace(w) => w.id,
            Self::Dataset(d) => d.id,
            Self::Workfile(f) => f.id,
            Self::Instance(i) => i.id,
        }
    }

    /// The workspace this entity is scoped to, if any.
    ///
    /// Users and instances are unscoped. Workspaces scope themselves.
    #[must_use]
    pub const fn workspace_id(&self) -> Option<i64> {
        match self {
            Self::User(_) | Self::Instance(_) => None,
            Self::Workspace(w) => Some(w.id),
            Self::Dataset(d) => Some(d.workspace_id),
            Self::Workfile(f) => Some(f.workspace_id),
        }
    }

    /// The type tag of this entity.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::User(_) => EntityType::User,
            Self::Workspace(_) => EntityType::Workspace,
            Self::Dataset(_) => EntityType::Dataset,
            Self::Workfile(_) => EntityType::Workfile,
            Self::Instance(_) => EntityType::Instance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_roundtrip() {
        for et in EntityType::ALL {
            let parsed: EntityType = et.as_str().parse().expect("should roundtrip");
            assert_eq!(parsed, et);
        }
    }

    #[test]
    fn entity_type_rejects_unknown() {
        let err = "gpdb_table".parse::<EntityType>().unwrap_err();
        assert_eq!(err.raw, "gpdb_table");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn entity_ref_display() {
        let r = EntityRef::new(EntityType::Dataset, 42);
        assert_eq!(r.to_string(), "dataset:42");
    }

    #[test]
    fn grouping_id_uses_flavored_type_name() {
        let gp = Entity::Instance(Instance {
            id: 3,
            name: "prod-gp".into(),
            flavor: InstanceFlavor::Greenplum,
            description: None,
        });
        assert_eq!(gp.type_name(), "greenplum_instance");
        assert_eq!(gp.grouping_id(), "greenplum_instance:3");

        let hd = Entity::Instance(Instance {
            id: 4,
            name: "lake".into(),
            flavor: InstanceFlavor::Hadoop,
            description: None,
        });
        assert_eq!(hd.grouping_id(), "hadoop_instance:4");
    }

    #[test]
    fn workspace_scoping() {
        let ds = Entity::Dataset(Dataset {
            id: 9,
            workspace_id: 2,
            name: "orders".into(),
        });
        assert_eq!(ds.workspace_id(), Some(2));

        let inst = Entity::Instance(Instance {
            id: 1,
            name: "gp".into(),
            flavor: InstanceFlavor::Greenplum,
            description: None,
        });
        assert_eq!(inst.workspace_id(), None);
    }
}
