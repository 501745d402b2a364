//! Bulk entry of a roster from a YAML file.
//!
//! ```yaml
//! participants:
//!   - name: Anna Petrova
//!     birth_date: 2013-05-16
//!     apparatus: Hoop
//!     grades: { ДВ-1: 8.2, ДВ-2: 8.4 }
//!   - id: 65f0c2...      # existing record, updated in place
//!     grades: { Е-3: ~ } # clears a score
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{SyncError, ValidationError};
use crate::participant::{Field, JudgeId, LocalId, RemoteId};
use crate::remote::ParticipantRepository;
use crate::sync::{ParticipantSyncManager, SaveReport};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Roster {
    pub participants: Vec<RosterEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterEntry {
    /// Remote id of a record already in the tournament
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub mentor: Option<String>,
    #[serde(default)]
    pub apparatus: Option<String>,
    #[serde(default)]
    pub thread: Option<String>,
    #[serde(default)]
    pub grades: BTreeMap<String, Option<f64>>,
}

impl RosterEntry {
    fn fields(&self) -> Vec<(Field, String)> {
        [
            (Field::FullName, &self.name),
            (Field::BirthDate, &self.birth_date),
            (Field::City, &self.city),
            (Field::School, &self.school),
            (Field::Mentor, &self.mentor),
            (Field::Apparatus, &self.apparatus),
            (Field::Thread, &self.thread),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| (field, v.clone())))
        .collect()
    }

    fn scores(&self) -> Vec<(JudgeId, Option<f64>)> {
        self.grades
            .iter()
            .map(|(seat, value)| (JudgeId::new(seat.trim()), *value))
            .collect()
    }
}

/// Outcome of an import: entries rejected before saving, then the batch save.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub applied: Vec<LocalId>,
    /// Zero-based roster index and the reason the entry was skipped
    pub rejected: Vec<(usize, SyncError)>,
    pub report: SaveReport,
}

impl ImportSummary {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty() && self.report.is_complete()
    }
}

pub fn load_roster(path: &Path) -> Result<Roster> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster at {}", path.display()))?;
    parse_roster(&content).with_context(|| format!("Failed to parse roster {}", path.display()))
}

fn parse_roster(content: &str) -> Result<Roster> {
    Ok(serde_saphyr::from_str(content)?)
}

/// Apply every roster entry to the loaded working set, then save all
/// pending records. An entry that fails validation is skipped entirely.
pub async fn import_roster<R: ParticipantRepository>(
    manager: &ParticipantSyncManager<R>,
    roster: &Roster,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for (index, entry) in roster.participants.iter().enumerate() {
        match apply_entry(manager, entry).await {
            Ok(id) => summary.applied.push(id),
            Err(e) => {
                warn!(entry = index, error = %e, "Skipping roster entry");
                summary.rejected.push((index, e));
            }
        }
    }

    info!(
        applied = summary.applied.len(),
        rejected = summary.rejected.len(),
        "Roster applied"
    );
    summary.report = manager.save_all().await;
    summary
}

async fn apply_entry<R: ParticipantRepository>(
    manager: &ParticipantSyncManager<R>,
    entry: &RosterEntry,
) -> Result<LocalId, SyncError> {
    let fields = entry.fields();
    let scores = entry.scores();

    match entry.id.as_deref().map(str::trim) {
        Some(remote) => {
            let id = manager
                .find_remote(&RemoteId(remote.to_string()))
                .ok_or_else(|| {
                    ValidationError::MalformedRecord(format!("no participant with id '{}'", remote))
                })?;
            manager.apply_edits(id, &fields, &scores)?;
            Ok(id)
        }
        None => {
            let id = manager.add_blank();
            if let Err(e) = manager.apply_edits(id, &fields, &scores) {
                manager.delete_one(id).await?;
                return Err(e);
            }
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{SyncState, TournamentId};
    use crate::remote::RemoteParticipant;
    use crate::scoring::ScoringConfig;
    use crate::sync::mock::{Call, MockRepository};
    use serde_json::json;
    use std::sync::Arc;

    const ROSTER: &str = r#"
participants:
  - name: Anna Petrova
    birth_date: 2013-05-16
    apparatus: Hoop
    grades:
      ДВ-1: 8.2
      ДВ-2: 8.4
  - id: a
    city: Kazan
    grades:
      ДВ-1: ~
  - name: Bad Date
    birth_date: 16.05.2013
"#;

    async fn loaded(repo: &MockRepository) -> ParticipantSyncManager<MockRepository> {
        let mgr = ParticipantSyncManager::new(repo.clone(), Arc::new(ScoringConfig::default()));
        mgr.load(&TournamentId("t1".to_string())).await.unwrap();
        mgr
    }

    fn existing() -> RemoteParticipant {
        serde_json::from_value(json!({
            "_id": "a",
            "name": "Bea",
            "grades": {"ДВ-1": 7.5}
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_roster() {
        let roster = parse_roster(ROSTER).unwrap();
        assert_eq!(roster.participants.len(), 3);
        let first = &roster.participants[0];
        assert_eq!(first.fields().len(), 3);
        assert_eq!(first.grades.get("ДВ-2"), Some(&Some(8.4)));
        assert_eq!(roster.participants[1].grades.get("ДВ-1"), Some(&None));
    }

    #[test]
    fn test_parse_roster_rejects_unknown_keys() {
        assert!(parse_roster("participants:\n  - name: A\n    nickname: B\n").is_err());
    }

    #[tokio::test]
    async fn test_import_creates_updates_and_skips() {
        let repo = MockRepository::with_participants(vec![existing()]);
        let mgr = loaded(&repo).await;
        let roster = parse_roster(ROSTER).unwrap();

        let summary = import_roster(&mgr, &roster).await;

        assert_eq!(summary.applied.len(), 2);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].0, 2);
        assert!(matches!(
            summary.rejected[0].1,
            SyncError::Validation(ValidationError::InvalidBirthDate(_))
        ));
        assert!(summary.report.is_complete());
        assert_eq!(summary.report.len(), 2);
        assert!(!summary.is_complete());

        // Rejected new entry was discarded locally
        assert_eq!(mgr.len(), 2);
        assert!(mgr.snapshot().iter().all(|p| p.state == SyncState::Clean));

        let bea = mgr.get(summary.applied[1]).unwrap();
        assert_eq!(bea.details.full_name, "Bea");
        assert_eq!(bea.details.city, "Kazan");
        assert_eq!(bea.score(&JudgeId::new("ДВ-1")), None);

        let calls = repo.calls();
        assert!(calls.contains(&Call::Create(
            TournamentId("t1".to_string()),
            "Anna Petrova".to_string()
        )));
        assert!(calls.contains(&Call::Update(RemoteId("a".to_string()), "Bea".to_string())));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn test_import_unknown_id_rejected() {
        let repo = MockRepository::default();
        let mgr = loaded(&repo).await;
        let roster = Roster {
            participants: vec![RosterEntry {
                id: Some("missing".to_string()),
                ..Default::default()
            }],
        };

        let summary = import_roster(&mgr, &roster).await;
        assert!(summary.applied.is_empty());
        assert!(matches!(
            summary.rejected[0].1,
            SyncError::Validation(ValidationError::MalformedRecord(_))
        ));
        assert!(summary.report.is_empty());
    }
}
