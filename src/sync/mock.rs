use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::error::RemoteError;
use crate::participant::{RemoteId, TournamentId};
use crate::remote::{ParticipantPayload, ParticipantRepository, RemoteParticipant, Tournament};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListTournaments,
    List(TournamentId),
    Create(TournamentId, String),
    Update(RemoteId, String),
    Delete(RemoteId),
}

#[derive(Default)]
struct MockState {
    participants: Vec<RemoteParticipant>,
    calls: Vec<Call>,
    fail_names: HashSet<String>,
    fail_ids: HashSet<String>,
    fail_list: bool,
    next_id: u64,
}

/// In-memory store recording every call. Clones share state.
#[derive(Clone, Default)]
pub struct MockRepository {
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockRepository {
    pub fn with_participants(participants: Vec<RemoteParticipant>) -> Self {
        let repo = Self::default();
        repo.state.lock().unwrap().participants = participants;
        repo
    }

    pub fn set_participants(&self, participants: Vec<RemoteParticipant>) {
        self.state.lock().unwrap().participants = participants;
    }

    /// Writes wait for a permit on the returned semaphore before completing.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Creates and updates whose payload carries this name fail.
    pub fn fail_name(&self, name: &str) {
        self.state.lock().unwrap().fail_names.insert(name.to_string());
    }

    /// Updates and deletes addressed to this remote id fail.
    pub fn fail_id(&self, id: &str) {
        self.state.lock().unwrap().fail_ids.insert(id.to_string());
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn rejected() -> RemoteError {
        RemoteError::Status {
            status: 500,
            body: "rejected".to_string(),
        }
    }
}

#[async_trait]
impl ParticipantRepository for MockRepository {
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, RemoteError> {
        self.state.lock().unwrap().calls.push(Call::ListTournaments);
        Ok(vec![Tournament {
            id: TournamentId("t1".to_string()),
            name: "City Cup".to_string(),
            date: "2025-05-16".to_string(),
        }])
    }

    async fn list_participants(
        &self,
        tournament: &TournamentId,
    ) -> Result<Vec<RemoteParticipant>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List(tournament.clone()));
        if state.fail_list {
            return Err(Self::rejected());
        }
        Ok(state.participants.clone())
    }

    async fn create_participant(
        &self,
        tournament: &TournamentId,
        record: &ParticipantPayload,
    ) -> Result<RemoteId, RemoteError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Create(tournament.clone(), record.name.clone()));
        self.wait_gate().await;
        let mut state = self.state.lock().unwrap();
        if state.fail_names.contains(&record.name) {
            return Err(Self::rejected());
        }
        state.next_id += 1;
        Ok(RemoteId(format!("r{}", state.next_id)))
    }

    async fn update_participant(
        &self,
        id: &RemoteId,
        record: &ParticipantPayload,
    ) -> Result<(), RemoteError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Update(id.clone(), record.name.clone()));
        self.wait_gate().await;
        let state = self.state.lock().unwrap();
        if state.fail_names.contains(&record.name) || state.fail_ids.contains(&id.0) {
            return Err(Self::rejected());
        }
        Ok(())
    }

    async fn delete_participant(&self, id: &RemoteId) -> Result<(), RemoteError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Delete(id.clone()));
        self.wait_gate().await;
        if self.state.lock().unwrap().fail_ids.contains(&id.0) {
            return Err(Self::rejected());
        }
        Ok(())
    }
}
