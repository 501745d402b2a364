pub mod client;
pub mod repository;

pub use client::{create_client, HttpRepository};
pub use repository::{ParticipantPayload, ParticipantRepository, RemoteParticipant, Tournament};
