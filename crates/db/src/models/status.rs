//! Generation status ids.
//!
//! Stored as SMALLINT-style integers; the variant discriminants are
//! part of the schema contract (see the comment in `0001_schema.sql`).

/// Status ID type matching the INTEGER status column.
pub type StatusId = i16;

/// Lifecycle of a generation request.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Queued = 1,
    Running = 2,
    Succeeded = 3,
    Failed = 4,
    Cancelled = 5,
}

impl GenerationStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Reverse lookup from a database status ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(GenerationStatus::Queued),
            2 => Some(GenerationStatus::Running),
            3 => Some(GenerationStatus::Succeeded),
            4 => Some(GenerationStatus::Failed),
            5 => Some(GenerationStatus::Cancelled),
            _ => None,
        }
    }

    /// Lowercase name used in logs and events.
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Queued => "queued",
            GenerationStatus::Running => "running",
            GenerationStatus::Succeeded => "succeeded",
            GenerationStatus::Failed => "failed",
            GenerationStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GenerationStatus::Succeeded | GenerationStatus::Failed | GenerationStatus::Cancelled
        )
    }
}

impl From<GenerationStatus> for StatusId {
    fn from(value: GenerationStatus) -> Self {
        value as StatusId
    }
}
