pub mod manager;
pub mod report;

#[cfg(test)]
pub(crate) mod mock;

pub use manager::ParticipantSyncManager;
pub use report::{DeleteOutcome, SaveOutcome, SaveReport};
