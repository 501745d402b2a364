use crate::error::SyncError;
use crate::participant::{LocalId, RemoteId};

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// First save of a local record; the store assigned this id.
    Created(RemoteId),
    /// An existing record was written back.
    Updated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Never persisted, dropped locally without a remote call.
    Discarded,
    Deleted(RemoteId),
}

/// Per-record results of a batch save, ordered by local id.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub results: Vec<(LocalId, Result<SaveOutcome, SyncError>)>,
}

impl SaveReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when every attempted save succeeded.
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (LocalId, &SaveOutcome)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().ok().map(|o| (*id, o)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (LocalId, &SyncError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (*id, e)))
    }

    pub fn outcome(&self, id: LocalId) -> Option<&Result<SaveOutcome, SyncError>> {
        self.results.iter().find(|(l, _)| *l == id).map(|(_, r)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;

    #[test]
    fn test_report_splits_outcomes() {
        let report = SaveReport {
            results: vec![
                (LocalId(1), Ok(SaveOutcome::Updated)),
                (
                    LocalId(2),
                    Err(SyncError::Remote {
                        local_id: Some(LocalId(2)),
                        source: RemoteError::Malformed("x".to_string()),
                    }),
                ),
                (LocalId(3), Ok(SaveOutcome::Created(RemoteId("r3".to_string())))),
            ],
        };

        assert_eq!(report.len(), 3);
        assert!(!report.is_complete());
        assert_eq!(report.succeeded().count(), 2);
        let failed: Vec<LocalId> = report.failures().map(|(id, _)| id).collect();
        assert_eq!(failed, vec![LocalId(2)]);
        assert!(matches!(report.outcome(LocalId(1)), Some(Ok(SaveOutcome::Updated))));
        assert!(report.outcome(LocalId(9)).is_none());
    }

    #[test]
    fn test_empty_report_is_complete() {
        let report = SaveReport::default();
        assert!(report.is_empty());
        assert!(report.is_complete());
    }
}
