use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RemoteError;
use crate::participant::{RemoteId, TournamentId};

/// Participant record as the remote store returns it.
///
/// Loosely typed on purpose: every field may be missing, identifiers come as
/// a plain string or `{"$oid": ..}` and grades may be numbers, numeric
/// strings, empty strings or null. Turned into a [`Participant`] only through
/// [`decode_participant`].
///
/// [`Participant`]: crate::participant::Participant
/// [`decode_participant`]: crate::participant::decode_participant
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RemoteParticipant {
    #[serde(rename = "_id", default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub thread: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub mentor: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub apparatus: Option<String>,
    #[serde(default)]
    pub grades: Option<BTreeMap<String, serde_json::Value>>,
}

/// Body sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantPayload {
    pub name: String,
    pub date_of_birth: String,
    pub thread: String,
    pub school: String,
    pub mentor: String,
    pub city: String,
    pub apparatus: String,
    pub grades: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub date: String,
}

/// The remote participant store. Every call is fallible and asynchronous;
/// the wire format is the implementor's business.
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, RemoteError>;

    async fn list_participants(
        &self,
        tournament: &TournamentId,
    ) -> Result<Vec<RemoteParticipant>, RemoteError>;

    async fn create_participant(
        &self,
        tournament: &TournamentId,
        record: &ParticipantPayload,
    ) -> Result<RemoteId, RemoteError>;

    async fn update_participant(
        &self,
        id: &RemoteId,
        record: &ParticipantPayload,
    ) -> Result<(), RemoteError>;

    async fn delete_participant(&self, id: &RemoteId) -> Result<(), RemoteError>;
}
