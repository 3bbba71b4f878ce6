use std::cmp::Ordering;
use std::sync::Arc;
use shared::identity::Identity;
use shared::models::*;
use shared::validation::ValidationError;
use shared::voting_logic::{compute_results, VotingError};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;
use crate::config::LedgerConfig;
use crate::live::ResultsFeed;
use crate::store::{StoreError, VotingStore};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Voting {0} not found")]
    VotingNotFound(Uuid),
    #[error("Contestant {0} not found")]
    ContestantNotFound(Uuid),
    #[error("Voting {0} is closed")]
    VotingClosed(Uuid),
    #[error("An anonymous session is required for this operation")]
    AuthenticationRequired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    fn from_voting(voting_id: Uuid, e: VotingError) -> Self {
        match e {
            VotingError::Invalid(e) => LedgerError::Validation(e),
            VotingError::UnknownContestant(id) => LedgerError::ContestantNotFound(id),
            VotingError::Closed => LedgerError::VotingClosed(voting_id),
        }
    }
}

fn require(identity: Option<&Identity>) -> LedgerResult<&Identity> {
    identity.ok_or(LedgerError::AuthenticationRequired)
}

/// Applies voting operations against the injected store.
///
/// The ledger keeps no state of its own; every read goes to the store and every
/// write is a single store call, so a failed operation leaves nothing behind.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn VotingStore>,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(store: Arc<dyn VotingStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn load(&self, voting_id: Uuid) -> LedgerResult<Voting> {
        self.store.fetch_voting(voting_id).await?
            .ok_or(LedgerError::VotingNotFound(voting_id))
    }

    pub async fn create_voting(
        &self,
        identity: Option<&Identity>,
        form: &VotingForm,
    ) -> LedgerResult<Voting> {
        let identity = require(identity)?;
        let voting = Voting::create(form, identity.anonymous_id.clone(), self.config.rules)
            .map_err(|e| LedgerError::from_voting(Uuid::nil(), e))?;

        self.store.insert_voting(&voting).await?;
        info!("Created voting {} with {} contestants", voting.id, voting.contestants.len());
        Ok(voting)
    }

    pub async fn cast_vote(
        &self,
        identity: Option<&Identity>,
        voting_id: Uuid,
        contestant_id: Uuid,
    ) -> LedgerResult<VoteReceipt> {
        let identity = require(identity)?;
        let voting = self.load(voting_id).await?;
        if voting.contestant(contestant_id).is_none() {
            return Err(LedgerError::ContestantNotFound(contestant_id));
        }
        voting.ensure_open().map_err(|e| LedgerError::from_voting(voting_id, e))?;

        let ballot = self.config.record_ballots.then(|| Ballot {
            id: Uuid::new_v4(),
            voting_id,
            contestant_id,
            voter_id: identity.anonymous_id.clone(),
            cast_at: OffsetDateTime::now_utc(),
        });

        match self.store.increment_votes(voting_id, contestant_id, ballot.as_ref()).await? {
            Some(votes) => {
                debug!("Vote cast in {} for {}", voting_id, contestant_id);
                Ok(VoteReceipt {
                    voting_id,
                    contestant_id,
                    votes,
                    ballot_id: ballot.map(|b| b.id),
                })
            }
            // Lost a race with close, delete or an edit that pruned the contestant.
            None => {
                let voting = self.load(voting_id).await?;
                if voting.contestant(contestant_id).is_none() {
                    Err(LedgerError::ContestantNotFound(contestant_id))
                } else {
                    Err(LedgerError::VotingClosed(voting_id))
                }
            }
        }
    }

    /// Closing an already closed voting succeeds without touching the store.
    pub async fn close_voting(
        &self,
        identity: Option<&Identity>,
        voting_id: Uuid,
    ) -> LedgerResult<Voting> {
        require(identity)?;
        let mut voting = self.load(voting_id).await?;
        if !voting.close() {
            debug!("Voting {} already closed", voting_id);
            return Ok(voting);
        }

        if !self.store.set_status(voting_id, VotingStatus::Closed).await? {
            return Err(LedgerError::VotingNotFound(voting_id));
        }
        info!("Closed voting {}", voting_id);
        Ok(voting)
    }

    pub async fn update_voting(
        &self,
        identity: Option<&Identity>,
        voting_id: Uuid,
        form: &VotingForm,
    ) -> LedgerResult<Voting> {
        require(identity)?;
        let voting = self.load(voting_id).await?;
        let patch = voting
            .plan_update(form, self.config.rules, self.config.prune_dropped_contestants)
            .map_err(|e| LedgerError::from_voting(voting_id, e))?;

        if !self.store.apply_patch(voting_id, &patch).await? {
            return Err(LedgerError::VotingNotFound(voting_id));
        }
        info!(
            "Updated voting {} ({} changes, {} removed)",
            voting_id, patch.changes.len(), patch.removed.len()
        );
        self.load(voting_id).await
    }

    pub async fn delete_voting(
        &self,
        identity: Option<&Identity>,
        voting_id: Uuid,
    ) -> LedgerResult<()> {
        require(identity)?;
        if !self.store.delete_voting(voting_id, self.config.cascade_deletes).await? {
            return Err(LedgerError::VotingNotFound(voting_id));
        }
        info!("Deleted voting {} (cascade: {})", voting_id, self.config.cascade_deletes);
        Ok(())
    }

    pub async fn compute_results(&self, voting_id: Uuid) -> LedgerResult<Results> {
        Ok(compute_results(&self.load(voting_id).await?))
    }

    pub async fn get_voting(&self, voting_id: Uuid) -> LedgerResult<Voting> {
        self.load(voting_id).await
    }

    /// Open votings first, newest first within each group.
    pub async fn list_votings(&self) -> LedgerResult<Vec<VotingSummary>> {
        let mut votings = self.store.list_votings().await?;
        votings.sort_by(|a, b| match (a.status, b.status) {
            (VotingStatus::Open, VotingStatus::Closed) => Ordering::Less,
            (VotingStatus::Closed, VotingStatus::Open) => Ordering::Greater,
            _ => b.created_at.cmp(&a.created_at),
        });
        Ok(votings)
    }

    pub fn subscribe_results(&self, voting_id: Uuid) -> ResultsFeed {
        ResultsFeed::new(self.store.clone(), voting_id)
    }
}
