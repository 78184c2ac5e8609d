//! Event kind enum covering the 19 kinds in the chorus event catalog.
//!
//! Each kind corresponds to a domain action. The string representation uses
//! the `SCREAMING_SNAKE` tags stored in the event log and exposed to API
//! consumers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of event kinds.
///
/// The kind fixes which target roles and data fields an event carries; the
/// mapping lives in the per-kind schema table in [`super::schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A Greenplum instance was registered.
    GreenplumInstanceCreated,
    /// A Hadoop instance was registered.
    HadoopInstanceCreated,
    /// A user account was created.
    UserAdded,
    /// A workspace was created.
    WorkspaceCreated,
    /// A workspace was archived.
    WorkspaceArchived,
    /// An archived workspace was restored.
    WorkspaceUnarchived,
    /// A workspace became public.
    WorkspaceMakePublic,
    /// A workspace became private.
    WorkspaceMakePrivate,
    /// Users were added to a workspace's member list.
    MembersAdded,
    /// A workfile was created in a workspace.
    WorkfileCreated,
    /// A source table was associated with a workspace.
    SourceTableCreated,
    /// A dataset import was scheduled.
    DatasetImportCreated,
    /// A dataset import completed.
    DatasetImportSuccess,
    /// A dataset import failed.
    DatasetImportFailed,
    /// A free-text note on a Greenplum instance.
    NoteOnGreenplumInstance,
    /// A free-text note on a Hadoop instance.
    NoteOnHadoopInstance,
    /// A free-text note on a workspace.
    NoteOnWorkspace,
    /// A free-text note on a workspace dataset.
    NoteOnDataset,
    /// A free-text note on a workfile.
    NoteOnWorkfile,
}

/// Error returned when parsing an unknown event kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind '{}'", self.raw)
    }
}

impl std::error::Error for UnknownEventKind {}

impl EventKind {
    /// All known event kinds in catalog order.
    pub const ALL: [Self; 19] = [
        Self::GreenplumInstanceCreated,
        Self::HadoopInstanceCreated,
        Self::UserAdded,
        Self::WorkspaceCreated,
        Self::WorkspaceArchived,
        Self::WorkspaceUnarchived,
        Self::WorkspaceMakePublic,
        Self::WorkspaceMakePrivate,
        Self::MembersAdded,
        Self::WorkfileCreated,
        Self::SourceTableCreated,
        Self::DatasetImportCreated,
        Self::DatasetImportSuccess,
        Self::DatasetImportFailed,
        Self::NoteOnGreenplumInstance,
        Self::NoteOnHadoopInstance,
        Self::NoteOnWorkspace,
        Self::NoteOnDataset,
        Self::NoteOnWorkfile,
    ];

    /// Return the canonical `SCREAMING_SNAKE` string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GreenplumInstanceCreated => "GREENPLUM_INSTANCE_CREATED",
            Self::HadoopInstanceCreated => "HADOOP_INSTANCE_CREATED",
            Self::UserAdded => "USER_ADDED",
            Self::WorkspaceCreated => "WORKSPACE_CREATED",
            Self::WorkspaceArchived => "WORKSPACE_ARCHIVED",
            Self::WorkspaceUnarchived => "WORKSPACE_UNARCHIVED",
            Self::WorkspaceMakePublic => "WORKSPACE_MAKE_PUBLIC",
            Self::WorkspaceMakePrivate => "WORKSPACE_MAKE_PRIVATE",
            Self::MembersAdded => "MEMBERS_ADDED",
            Self::WorkfileCreated => "WORKFILE_CREATED",
            Self::SourceTableCreated => "SOURCE_TABLE_CREATED",
            Self::DatasetImportCreated => "DATASET_IMPORT_CREATED",
            Self::DatasetImportSuccess => "DATASET_IMPORT_SUCCESS",
            Self::DatasetImportFailed => "DATASET_IMPORT_FAILED",
            Self::NoteOnGreenplumInstance => "NOTE_ON_GREENPLUM_INSTANCE",
            Self::NoteOnHadoopInstance => "NOTE_ON_HADOOP_INSTANCE",
            Self::NoteOnWorkspace => "NOTE_ON_WORKSPACE",
            Self::NoteOnDataset => "NOTE_ON_DATASET",
            Self::NoteOnWorkfile => "NOTE_ON_WORKFILE",
        }
    }

    /// Whether this kind carries a free-text `body` (the note family).
    ///
    /// Note kinds are the ones the search indexer consumes.
    #[must_use]
    pub const fn is_note(self) -> bool {
        matches!(
            self,
            Self::NoteOnGreenplumInstance
                | Self::NoteOnHadoopInstance
                | Self::NoteOnWorkspace
                | Self::NoteOnDataset
                | Self::NoteOnWorkfile
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind { raw: s.to_string() })
    }
}

// Custom serde: serialize as the canonical tag string.
impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_fromstr_roundtrip() {
        for kind in EventKind::ALL {
            let reparsed: EventKind = kind.to_string().parse().expect("should roundtrip");
            assert_eq!(kind, reparsed);
        }
    }

    #[test]
    fn fromstr_rejects_unknown() {
        let err = "NOTE_ON_GPDB_TABLE".parse::<EventKind>().unwrap_err();
        assert_eq!(err.raw, "NOTE_ON_GPDB_TABLE");
    }

    #[test]
    fn fromstr_rejects_lowercase() {
        assert!("workspace_created".parse::<EventKind>().is_err());
    }

    #[test]
    fn serde_json_roundtrip() {
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let deser: EventKind = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(deser, kind);
        }
    }

    #[test]
    fn note_family_is_exactly_five() {
        let notes = EventKind::ALL.iter().filter(|k| k.is_note()).count();
        assert_eq!(notes, 5);
    }

    #[test]
    fn all_contains_exactly_19_kinds() {
        assert_eq!(EventKind::ALL.len(), 19);
    }
}
