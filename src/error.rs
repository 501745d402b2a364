use thiserror::Error;

use crate::participant::LocalId;

/// A caller-supplied edit or a remote payload that is structurally invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown judge seat '{0}'")]
    UnknownJudge(String),

    #[error("score {value} for {judge} is outside {min}..={max}")]
    ScoreOutOfRange {
        judge: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("score for {0} must be a finite number")]
    NonFiniteScore(String),

    #[error("birth date '{0}' is not in YYYY-MM-DD format")]
    InvalidBirthDate(String),

    #[error("apparatus '{0}' is not configured for this tournament")]
    UnknownApparatus(String),

    #[error("unknown participant field '{0}'")]
    UnknownField(String),

    #[error("remote record #{0} has no usable _id")]
    MissingRemoteId(usize),

    #[error("grade '{raw}' for {judge} is not a number")]
    MalformedGrade { judge: String, raw: String },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("no tournament loaded")]
    NoTournament,
}

/// Failure of a call to the remote participant store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Worth retrying for idempotent calls: transport failures and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Status { status, .. } => *status >= 500,
            RemoteError::Malformed(_) => false,
        }
    }
}

/// Every failure the sync manager can surface.
///
/// Record-scoped variants carry the affected [`LocalId`] so a caller can
/// report precisely which rows still need attention.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("participant {0} is not in the working set")]
    NotFound(LocalId),

    #[error("remote call failed{}: {source}", fmt_local(.local_id))]
    Remote {
        local_id: Option<LocalId>,
        #[source]
        source: RemoteError,
    },

    #[error("participant {0} already has a save or delete in flight")]
    Conflict(LocalId),
}

fn fmt_local(local_id: &Option<LocalId>) -> String {
    match local_id {
        Some(id) => format!(" for participant {}", id),
        None => String::new(),
    }
}

impl SyncError {
    pub fn local_id(&self) -> Option<LocalId> {
        match self {
            SyncError::Validation(_) => None,
            SyncError::NotFound(id) | SyncError::Conflict(id) => Some(*id),
            SyncError::Remote { local_id, .. } => *local_id,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Remote { .. })
    }
}
