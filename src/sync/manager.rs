use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::report::{DeleteOutcome, SaveOutcome, SaveReport};
use crate::error::{RemoteError, SyncError, ValidationError};
use crate::participant::{
    decode_participant, encode_payload, validate_birth_date, Field, JudgeId, LocalId,
    Participant, RemoteId, SyncState, TournamentId,
};
use crate::remote::{ParticipantRepository, Tournament};
use crate::scoring::{aggregate, AggregatedScore, ScoringConfig};

struct Entry {
    participant: Participant,
    /// Bumped on every local edit. A save only marks the record clean if no
    /// edit landed while it was in flight.
    revision: u64,
}

#[derive(Default)]
struct WorkingSet {
    tournament: Option<TournamentId>,
    entries: Vec<Entry>,
    next_local: u64,
    in_flight: HashSet<LocalId>,
}

impl WorkingSet {
    fn allocate(&mut self) -> LocalId {
        self.next_local += 1;
        LocalId(self.next_local)
    }

    fn find(&self, id: LocalId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.participant.local_id == id)
    }

    fn find_mut(&mut self, id: LocalId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.participant.local_id == id)
    }
}

/// Releases a record's in-flight slot when the save or delete finishes or
/// its future is dropped.
struct InFlight<'a> {
    working_set: &'a Mutex<WorkingSet>,
    id: LocalId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.working_set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .remove(&self.id);
    }
}

enum Route {
    Create(TournamentId),
    Update(RemoteId),
}

/// Owns the working set of participants for one tournament and mediates all
/// create/update/delete traffic to the remote store.
///
/// Methods take `&self`; the working set sits behind a mutex that is never
/// held across a remote call, so several saves may be in flight at once.
/// At most one save or delete per record is in flight at a time.
pub struct ParticipantSyncManager<R> {
    repository: R,
    scoring: Arc<ScoringConfig>,
    apparatuses: Vec<String>,
    working_set: Mutex<WorkingSet>,
}

impl<R: ParticipantRepository> ParticipantSyncManager<R> {
    pub fn new(repository: R, scoring: Arc<ScoringConfig>) -> Self {
        Self {
            repository,
            scoring,
            apparatuses: Vec::new(),
            working_set: Mutex::new(WorkingSet::default()),
        }
    }

    /// Restrict the apparatus field to these values. The first one is the
    /// default for blank records.
    pub fn with_apparatuses(mut self, apparatuses: Vec<String>) -> Self {
        self.apparatuses = apparatuses;
        self
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    fn lock(&self) -> MutexGuard<'_, WorkingSet> {
        self.working_set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tournament(&self) -> Option<TournamentId> {
        self.lock().tournament.clone()
    }

    /// Current working set, in insertion order.
    pub fn snapshot(&self) -> Vec<Participant> {
        self.lock()
            .entries
            .iter()
            .map(|e| e.participant.clone())
            .collect()
    }

    pub fn get(&self, id: LocalId) -> Option<Participant> {
        self.lock().find(id).map(|e| e.participant.clone())
    }

    pub fn find_remote(&self, remote_id: &RemoteId) -> Option<LocalId> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.participant.remote_id.as_ref() == Some(remote_id))
            .map(|e| e.participant.local_id)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records that are `New` or `Dirty`.
    pub fn pending(&self) -> Vec<LocalId> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.participant.state.needs_save())
            .map(|e| e.participant.local_id)
            .collect()
    }

    pub fn is_in_flight(&self, id: LocalId) -> bool {
        self.lock().in_flight.contains(&id)
    }

    pub fn aggregate(&self, id: LocalId) -> Result<AggregatedScore, SyncError> {
        let ws = self.lock();
        let entry = ws.find(id).ok_or(SyncError::NotFound(id))?;
        Ok(aggregate(&entry.participant.scores, &self.scoring))
    }

    pub async fn list_tournaments(&self) -> Result<Vec<Tournament>, SyncError> {
        self.repository
            .list_tournaments()
            .await
            .map_err(|source| SyncError::Remote {
                local_id: None,
                source,
            })
    }

    /// Replace the working set with the tournament's participants from the
    /// remote store. Every loaded record starts `Clean`.
    ///
    /// Nothing changes unless the whole list decodes.
    pub async fn load(&self, tournament: &TournamentId) -> Result<usize, SyncError> {
        self.ensure_idle()?;

        let raw = self
            .repository
            .list_participants(tournament)
            .await
            .map_err(|source| SyncError::Remote {
                local_id: None,
                source,
            })?;

        let mut ws = self.lock();
        if let Some(id) = ws.in_flight.iter().next() {
            return Err(SyncError::Conflict(*id));
        }

        let mut next_local = ws.next_local;
        let mut entries = Vec::with_capacity(raw.len());
        for (index, record) in raw.iter().enumerate() {
            next_local += 1;
            let mut participant =
                decode_participant(index, record, &self.scoring, LocalId(next_local))?;
            if participant.details.apparatus.is_empty() {
                if let Some(first) = self.apparatuses.first() {
                    participant.details.apparatus = first.clone();
                }
            }
            entries.push(Entry {
                participant,
                revision: 0,
            });
        }

        ws.next_local = next_local;
        ws.entries = entries;
        ws.tournament = Some(tournament.clone());
        info!(tournament = %tournament, count = ws.entries.len(), "Loaded participants");
        Ok(ws.entries.len())
    }

    fn ensure_idle(&self) -> Result<(), SyncError> {
        match self.lock().in_flight.iter().next() {
            Some(id) => Err(SyncError::Conflict(*id)),
            None => Ok(()),
        }
    }

    /// Append an empty `New` record with every seat absent.
    pub fn add_blank(&self) -> LocalId {
        let mut ws = self.lock();
        let local_id = ws.allocate();
        let mut participant = Participant {
            local_id,
            remote_id: None,
            details: Default::default(),
            scores: self.scoring.blank_sheet(),
            state: SyncState::New,
        };
        if let Some(first) = self.apparatuses.first() {
            participant.details.apparatus = first.clone();
        }
        ws.entries.push(Entry {
            participant,
            revision: 0,
        });
        debug!(participant = %local_id, "Added blank participant");
        local_id
    }

    pub fn edit_field(
        &self,
        id: LocalId,
        field: Field,
        value: impl Into<String>,
    ) -> Result<(), SyncError> {
        let value = value.into().trim().to_string();
        self.check_field(field, &value)?;

        let mut ws = self.lock();
        let entry = ws.find_mut(id).ok_or(SyncError::NotFound(id))?;
        entry.participant.details.set(field, value);
        mark_edited(entry);
        Ok(())
    }

    /// Set or clear (`None`) one judge's score.
    pub fn edit_score(
        &self,
        id: LocalId,
        judge: &JudgeId,
        value: Option<f64>,
    ) -> Result<(), SyncError> {
        self.check_score(judge, value)?;

        let mut ws = self.lock();
        let entry = ws.find_mut(id).ok_or(SyncError::NotFound(id))?;
        entry.participant.scores.insert(judge.clone(), value);
        mark_edited(entry);
        Ok(())
    }

    /// Apply several field and score edits to one record, all or nothing.
    pub fn apply_edits(
        &self,
        id: LocalId,
        fields: &[(Field, String)],
        scores: &[(JudgeId, Option<f64>)],
    ) -> Result<(), SyncError> {
        let fields: Vec<(Field, String)> = fields
            .iter()
            .map(|(field, value)| (*field, value.trim().to_string()))
            .collect();
        for (field, value) in &fields {
            self.check_field(*field, value)?;
        }
        for (judge, value) in scores {
            self.check_score(judge, *value)?;
        }

        let mut ws = self.lock();
        let entry = ws.find_mut(id).ok_or(SyncError::NotFound(id))?;
        if fields.is_empty() && scores.is_empty() {
            return Ok(());
        }
        for (field, value) in fields {
            entry.participant.details.set(field, value);
        }
        for (judge, value) in scores {
            entry.participant.scores.insert(judge.clone(), *value);
        }
        mark_edited(entry);
        Ok(())
    }

    fn check_field(&self, field: Field, value: &str) -> Result<(), ValidationError> {
        match field {
            Field::BirthDate => validate_birth_date(value),
            Field::Apparatus
                if !self.apparatuses.is_empty() && !self.apparatuses.iter().any(|a| a == value) =>
            {
                Err(ValidationError::UnknownApparatus(value.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn check_score(&self, judge: &JudgeId, value: Option<f64>) -> Result<(), ValidationError> {
        if !self.scoring.has_seat(judge) {
            return Err(ValidationError::UnknownJudge(judge.to_string()));
        }
        let Some(v) = value else {
            return Ok(());
        };
        if !v.is_finite() {
            return Err(ValidationError::NonFiniteScore(judge.to_string()));
        }
        let range = self.scoring.score_range;
        if !range.contains(v) {
            return Err(ValidationError::ScoreOutOfRange {
                judge: judge.to_string(),
                value: v,
                min: range.min,
                max: range.max,
            });
        }
        Ok(())
    }

    /// Push one record to the remote store: create when it has no remote id
    /// yet, update otherwise. A `Clean` record is written back anyway.
    ///
    /// On failure the record keeps its state and can be retried.
    pub async fn save_one(&self, id: LocalId) -> Result<SaveOutcome, SyncError> {
        let (route, payload, revision, _in_flight) = {
            let mut ws = self.lock();
            let entry = ws.find(id).ok_or(SyncError::NotFound(id))?;
            let payload = encode_payload(&entry.participant);
            let revision = entry.revision;
            let route = match &entry.participant.remote_id {
                Some(remote_id) => Route::Update(remote_id.clone()),
                None => Route::Create(ws.tournament.clone().ok_or(ValidationError::NoTournament)?),
            };
            if !ws.in_flight.insert(id) {
                return Err(SyncError::Conflict(id));
            }
            let guard = InFlight {
                working_set: &self.working_set,
                id,
            };
            (route, payload, revision, guard)
        };

        let remote_failure = |source: RemoteError| {
            warn!(participant = %id, error = %source, "Save failed");
            SyncError::Remote {
                local_id: Some(id),
                source,
            }
        };

        match route {
            Route::Create(tournament) => {
                debug!(participant = %id, tournament = %tournament, "Creating participant");
                let remote_id = self
                    .repository
                    .create_participant(&tournament, &payload)
                    .await
                    .map_err(remote_failure)?;
                let mut ws = self.lock();
                if let Some(entry) = ws.find_mut(id) {
                    entry.participant.remote_id = Some(remote_id.clone());
                    entry.participant.state = settled_state(entry, revision);
                }
                Ok(SaveOutcome::Created(remote_id))
            }
            Route::Update(remote_id) => {
                debug!(participant = %id, remote = %remote_id, "Updating participant");
                self.repository
                    .update_participant(&remote_id, &payload)
                    .await
                    .map_err(remote_failure)?;
                let mut ws = self.lock();
                if let Some(entry) = ws.find_mut(id) {
                    entry.participant.state = settled_state(entry, revision);
                }
                Ok(SaveOutcome::Updated)
            }
        }
    }

    /// Save every `New` or `Dirty` record independently and concurrently.
    /// One record's failure neither blocks nor rolls back the others.
    pub async fn save_all(&self) -> SaveReport {
        let pending = self.pending();
        let mut futures: FuturesUnordered<_> = pending
            .into_iter()
            .map(|id| async move { (id, self.save_one(id).await) })
            .collect();

        let mut results = Vec::new();
        while let Some(result) = futures.next().await {
            results.push(result);
        }
        results.sort_by_key(|(id, _)| *id);

        let report = SaveReport { results };
        let failed = report.failures().count();
        info!(saved = report.len() - failed, failed, "Batch save finished");
        report
    }

    /// Remove a record. `New` records are dropped locally without a remote
    /// call; persisted ones only after the store confirms the delete.
    pub async fn delete_one(&self, id: LocalId) -> Result<DeleteOutcome, SyncError> {
        let (remote_id, _in_flight) = {
            let mut ws = self.lock();
            let entry = ws.find(id).ok_or(SyncError::NotFound(id))?;
            if ws.in_flight.contains(&id) {
                return Err(SyncError::Conflict(id));
            }
            let Some(remote_id) = entry.participant.remote_id.clone() else {
                ws.entries.retain(|e| e.participant.local_id != id);
                debug!(participant = %id, "Discarded unsaved participant");
                return Ok(DeleteOutcome::Discarded);
            };
            ws.in_flight.insert(id);
            let guard = InFlight {
                working_set: &self.working_set,
                id,
            };
            (remote_id, guard)
        };

        debug!(participant = %id, remote = %remote_id, "Deleting participant");
        self.repository
            .delete_participant(&remote_id)
            .await
            .map_err(|source| {
                warn!(participant = %id, error = %source, "Delete failed");
                SyncError::Remote {
                    local_id: Some(id),
                    source,
                }
            })?;

        self.lock().entries.retain(|e| e.participant.local_id != id);
        Ok(DeleteOutcome::Deleted(remote_id))
    }
}

fn mark_edited(entry: &mut Entry) {
    entry.revision += 1;
    if entry.participant.state == SyncState::Clean {
        entry.participant.state = SyncState::Dirty;
    }
}

fn settled_state(entry: &Entry, saved_revision: u64) -> SyncState {
    if entry.revision == saved_revision {
        SyncState::Clean
    } else {
        SyncState::Dirty
    }
}
