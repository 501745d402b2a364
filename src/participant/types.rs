use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Working-set identifier. Allocated by the sync manager, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier assigned by the remote store once a record is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TournamentId(pub String);

impl fmt::Display for TournamentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label of a single judging seat, e.g. "Е-3".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgeId(pub String);

impl JudgeId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JudgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One judge's score, or `None` while nothing has been entered.
/// Absence is never the same as zero.
pub type ScoreEntry = Option<f64>;

/// Score entries keyed by seat. Always holds exactly the configured seats.
pub type ScoreSheet = BTreeMap<JudgeId, ScoreEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Exists only locally, no remote id yet.
    New,
    /// Matches the remote store.
    Clean,
    /// Edited locally since the last successful sync.
    Dirty,
}

impl SyncState {
    pub fn needs_save(&self) -> bool {
        !matches!(self, SyncState::Clean)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::New => "new",
            SyncState::Clean => "clean",
            SyncState::Dirty => "dirty",
        };
        f.write_str(s)
    }
}

/// Descriptive attributes of a participant. Empty strings mean "not filled in".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDetails {
    pub full_name: String,
    /// `YYYY-MM-DD` or empty
    pub birth_date: String,
    pub city: String,
    pub school: String,
    pub mentor: String,
    pub apparatus: String,
    pub thread: String,
}

impl ParticipantDetails {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FullName => &self.full_name,
            Field::BirthDate => &self.birth_date,
            Field::City => &self.city,
            Field::School => &self.school,
            Field::Mentor => &self.mentor,
            Field::Apparatus => &self.apparatus,
            Field::Thread => &self.thread,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::FullName => &mut self.full_name,
            Field::BirthDate => &mut self.birth_date,
            Field::City => &mut self.city,
            Field::School => &mut self.school,
            Field::Mentor => &mut self.mentor,
            Field::Apparatus => &mut self.apparatus,
            Field::Thread => &mut self.thread,
        };
        *slot = value;
    }
}

/// Editable descriptive field of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FullName,
    BirthDate,
    City,
    School,
    Mentor,
    Apparatus,
    Thread,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::FullName,
        Field::BirthDate,
        Field::City,
        Field::School,
        Field::Mentor,
        Field::Apparatus,
        Field::Thread,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::FullName => "name",
            Field::BirthDate => "birth_date",
            Field::City => "city",
            Field::School => "school",
            Field::Mentor => "mentor",
            Field::Apparatus => "apparatus",
            Field::Thread => "thread",
        }
    }
}

impl FromStr for Field {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "full_name" => Ok(Field::FullName),
            "birth_date" | "date_of_birth" => Ok(Field::BirthDate),
            "city" => Ok(Field::City),
            "school" | "club" => Ok(Field::School),
            "mentor" | "trainer" => Ok(Field::Mentor),
            "apparatus" => Ok(Field::Apparatus),
            "thread" | "stream" => Ok(Field::Thread),
            other => Err(ValidationError::UnknownField(other.to_string())),
        }
    }
}

/// A participant record in the working set.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub local_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub details: ParticipantDetails,
    pub scores: ScoreSheet,
    pub state: SyncState,
}

impl Participant {
    pub fn score(&self, judge: &JudgeId) -> ScoreEntry {
        self.scores.get(judge).copied().flatten()
    }

    /// Short label for log lines and reports.
    pub fn display_name(&self) -> String {
        if self.details.full_name.trim().is_empty() {
            format!("(unnamed {})", self.local_id)
        } else {
            self.details.full_name.clone()
        }
    }
}
