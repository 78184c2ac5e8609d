use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    EntityNotFound,
    WorkspaceNotFound,
    MissingTargetRole,
    UnexpectedTargetRole,
    WrongTargetType,
    MissingDataField,
    UnexpectedDataField,
    WrongFieldType,
    PermissionDenied,
    WorkspaceArchived,
    OwnerImmutable,
    TagTooLong,
    StoreWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::EntityNotFound => "E2001",
            Self::WorkspaceNotFound => "E2002",
            Self::MissingTargetRole => "E3001",
            Self::UnexpectedTargetRole => "E3002",
            Self::WrongTargetType => "E3003",
            Self::MissingDataField => "E3004",
            Self::UnexpectedDataField => "E3005",
            Self::WrongFieldType => "E3006",
            Self::PermissionDenied => "E4001",
            Self::WorkspaceArchived => "E4002",
            Self::OwnerImmutable => "E4003",
            Self::TagTooLong => "E6001",
            Self::StoreWriteFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::EntityNotFound => "Entity not found",
            Self::WorkspaceNotFound => "Workspace not found",
            Self::MissingTargetRole => "Required target role missing for event kind",
            Self::UnexpectedTargetRole => "Target role not valid for event kind",
            Self::WrongTargetType => "Target references wrong entity type",
            Self::MissingDataField => "Required data field missing for event kind",
            Self::UnexpectedDataField => "Data field not valid for event kind",
            Self::WrongFieldType => "Data field has wrong scalar type",
            Self::PermissionDenied => "Actor may not modify this workspace",
            Self::WorkspaceArchived => "Workspace is archived",
            Self::OwnerImmutable => "Workspace owner cannot be removed",
            Self::TagTooLong => "Tag name exceeds length limit",
            Self::StoreWriteFailed => "Store write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `chorus init` to create the store."),
            Self::ConfigParseError => Some("Fix syntax in .chorus/config.toml and retry."),
            Self::EntityNotFound => None,
            Self::WorkspaceNotFound => None,
            Self::MissingTargetRole | Self::UnexpectedTargetRole | Self::WrongTargetType => {
                Some("Check the target roles the event kind requires.")
            }
            Self::MissingDataField | Self::UnexpectedDataField | Self::WrongFieldType => {
                Some("Check the data fields the event kind requires.")
            }
            Self::PermissionDenied => Some("Only the workspace owner may administer it."),
            Self::WorkspaceArchived => Some("Unarchive the workspace before modifying workfiles."),
            Self::OwnerImmutable => Some("Transfer ownership before removing this member."),
            Self::TagTooLong => Some("Use tag names of 100 characters or fewer."),
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
