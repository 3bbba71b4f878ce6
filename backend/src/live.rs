use std::sync::Arc;
use shared::models::{Results, Snapshot};
use shared::voting_logic::compute_results;
use tokio::sync::watch;
use uuid::Uuid;
use crate::store::{StoreResult, VotingStore};

/// Live tally of one voting, refreshed whenever the store reports a write.
///
/// The first call to [`ResultsFeed::next`] answers immediately with the current
/// results; later calls wait for the next store change. A voting that no longer
/// exists is reported as a ready snapshot without data.
pub struct ResultsFeed {
    store: Arc<dyn VotingStore>,
    voting_id: Uuid,
    changes: watch::Receiver<u64>,
    primed: bool,
}

impl ResultsFeed {
    pub fn new(store: Arc<dyn VotingStore>, voting_id: Uuid) -> Self {
        let changes = store.changes();
        Self { store, voting_id, changes, primed: false }
    }

    pub fn voting_id(&self) -> Uuid {
        self.voting_id
    }

    /// Returns `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<StoreResult<Snapshot<Results>>> {
        if self.primed {
            self.changes.changed().await.ok()?;
        }
        self.primed = true;

        let results = self.store.fetch_voting(self.voting_id).await
            .map(|voting| Snapshot::ready(voting.as_ref().map(compute_results)));
        Some(results)
    }
}
