use chrono::NaiveDate;
use thiserror::Error;

/// Rejected bulk or single-student input. Never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no tokens")]
    NoTokens,

    #[error("no status selected")]
    NoStatus,

    #[error("invalid token {0:?}: expected two digits")]
    MalformedToken(String),

    #[error("no matching students")]
    NoMatchingStudents,

    #[error("unknown student {0}")]
    UnknownStudent(String),
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("attendance for {date} is locked")]
    LockedSession { date: NaiveDate },

    #[error("attendance for {date} can only be changed on that day (today is {today})")]
    NotToday { date: NaiveDate, today: NaiveDate },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("stored attendance for {date} is unreadable: {reason}")]
    CorruptRecord { date: NaiveDate, reason: String },

    #[error("attendance store failed: {0}")]
    Persistence(String),
}

impl AttendanceError {
    /// Stable code used in the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::LockedSession { .. } => "session_locked",
            AttendanceError::NotToday { .. } => "not_today",
            AttendanceError::Validation(_) => "validation_failed",
            AttendanceError::CorruptRecord { .. } => "corrupt_record",
            AttendanceError::Persistence(_) => "persistence_failed",
        }
    }
}

impl From<rusqlite::Error> for AttendanceError {
    fn from(e: rusqlite::Error) -> Self {
        AttendanceError::Persistence(e.to_string())
    }
}
