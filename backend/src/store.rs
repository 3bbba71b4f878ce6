use shared::models::*;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to acquire store lock")]
    LockFailed,
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence capability the ledger is built on.
///
/// Every method is a single atomic step: either all of its rows change or none do.
/// Implementations bump the revision published by [`VotingStore::changes`] after
/// each successful write so live observers can refresh.
#[rocket::async_trait]
pub trait VotingStore: Send + Sync {
    async fn insert_voting(&self, voting: &Voting) -> StoreResult<()>;

    async fn fetch_voting(&self, id: Uuid) -> StoreResult<Option<Voting>>;

    async fn list_votings(&self) -> StoreResult<Vec<VotingSummary>>;

    /// Returns false when the voting does not exist.
    async fn apply_patch(&self, id: Uuid, patch: &VotingPatch) -> StoreResult<bool>;

    /// Returns false when the voting does not exist.
    async fn set_status(&self, id: Uuid, status: VotingStatus) -> StoreResult<bool>;

    /// Adds one vote to the contestant and appends the ballot, if any, in the same step.
    /// Yields the new count, or `None` when the voting is missing, closed, or has no such contestant.
    async fn increment_votes(
        &self,
        voting_id: Uuid,
        contestant_id: Uuid,
        ballot: Option<&Ballot>,
    ) -> StoreResult<Option<u64>>;

    /// Returns false when the voting does not exist.
    async fn delete_voting(&self, id: Uuid, cascade: bool) -> StoreResult<bool>;

    fn changes(&self) -> watch::Receiver<u64>;
}
