use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use shared::models::*;
use tokio::sync::watch;
use tracing::error;
use uuid::Uuid;
use crate::store::{StoreError, StoreResult, VotingStore};

#[derive(Debug, Default)]
struct MemoryState {
    votings: HashMap<Uuid, Voting>,
    ballots: Vec<Ballot>,
    orphaned_contestants: HashMap<Uuid, Vec<Contestant>>,
}

/// Process-local store. Used by the test suite and by `STORE_BACKEND=memory` deployments.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    revision: watch::Sender<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(MemoryState::default()),
            revision,
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|e| {
            error!("Failed to acquire memory store lock: {}", e);
            StoreError::LockFailed
        })
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn ballots(&self, voting_id: Uuid) -> StoreResult<Vec<Ballot>> {
        Ok(self.lock()?.ballots.iter()
            .filter(|b| b.voting_id == voting_id)
            .cloned()
            .collect())
    }

    /// Contestants left behind by a non-cascading delete.
    pub fn orphaned_contestants(&self, voting_id: Uuid) -> StoreResult<Vec<Contestant>> {
        Ok(self.lock()?.orphaned_contestants.get(&voting_id).cloned().unwrap_or_default())
    }
}

#[rocket::async_trait]
impl VotingStore for MemoryStore {
    async fn insert_voting(&self, voting: &Voting) -> StoreResult<()> {
        self.lock()?.votings.insert(voting.id, voting.clone());
        self.bump();
        Ok(())
    }

    async fn fetch_voting(&self, id: Uuid) -> StoreResult<Option<Voting>> {
        Ok(self.lock()?.votings.get(&id).cloned())
    }

    async fn list_votings(&self) -> StoreResult<Vec<VotingSummary>> {
        Ok(self.lock()?.votings.values().map(Voting::summary).collect())
    }

    async fn apply_patch(&self, id: Uuid, patch: &VotingPatch) -> StoreResult<bool> {
        let applied = match self.lock()?.votings.get_mut(&id) {
            Some(voting) => {
                voting.apply_patch(patch.clone());
                true
            }
            None => false,
        };
        if applied {
            self.bump();
        }
        Ok(applied)
    }

    async fn set_status(&self, id: Uuid, status: VotingStatus) -> StoreResult<bool> {
        let found = match self.lock()?.votings.get_mut(&id) {
            Some(voting) => {
                voting.status = status;
                true
            }
            None => false,
        };
        if found {
            self.bump();
        }
        Ok(found)
    }

    async fn increment_votes(
        &self,
        voting_id: Uuid,
        contestant_id: Uuid,
        ballot: Option<&Ballot>,
    ) -> StoreResult<Option<u64>> {
        let votes = {
            let mut state = self.lock()?;
            let votes = state.votings.get_mut(&voting_id)
                .and_then(|voting| voting.record_vote(contestant_id).ok());
            if let (Some(_), Some(ballot)) = (votes, ballot) {
                state.ballots.push(ballot.clone());
            }
            votes
        };
        if votes.is_some() {
            self.bump();
        }
        Ok(votes)
    }

    async fn delete_voting(&self, id: Uuid, cascade: bool) -> StoreResult<bool> {
        let removed = {
            let mut state = self.lock()?;
            match state.votings.remove(&id) {
                Some(voting) => {
                    if cascade {
                        state.ballots.retain(|b| b.voting_id != id);
                    } else {
                        state.orphaned_contestants.insert(id, voting.contestants);
                    }
                    true
                }
                None => false,
            }
        };
        if removed {
            self.bump();
        }
        Ok(removed)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
