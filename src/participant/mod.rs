pub mod decode;
pub mod types;

pub use decode::{decode_participant, encode_payload, validate_birth_date};
pub use types::{
    Field, JudgeId, LocalId, Participant, ParticipantDetails, RemoteId, ScoreEntry, ScoreSheet,
    SyncState, TournamentId,
};
