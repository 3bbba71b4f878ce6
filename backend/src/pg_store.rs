use shared::models::*;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;
use crate::store::{StoreError, StoreResult, VotingStore};

#[derive(FromRow)]
struct VotingRow {
    id: Uuid,
    title: String,
    status: VotingStatus,
    owner_id: String,
    created_at: OffsetDateTime,
}

#[derive(FromRow)]
struct ContestantRow {
    id: Uuid,
    name: String,
    face_image: String,
    team_logo: Option<String>,
    votes: i64,
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    title: String,
    status: VotingStatus,
    created_at: OffsetDateTime,
    contestant_count: i64,
    total_votes: i64,
}

fn to_count(value: i64, what: &str) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {what}: {value}")))
}

impl ContestantRow {
    fn into_contestant(self) -> StoreResult<Contestant> {
        Ok(Contestant {
            id: self.id,
            name: self.name,
            face_image: self.face_image,
            team_logo: self.team_logo,
            votes: to_count(self.votes, "vote count")?,
        })
    }
}

/// Postgres-backed store; schema lives in `backend/migrations`.
pub struct PgStore {
    pool: PgPool,
    revision: watch::Sender<u64>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        let (revision, _) = watch::channel(0);
        Self { pool, revision }
    }

    /// Publishes a revision for writes made through this store. Writes from other
    /// processes sharing the database are not observed.
    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    async fn insert_contestant(
        tx: &mut Transaction<'_, Postgres>,
        voting_id: Uuid,
        contestant: &Contestant,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO contestants (voting_id, id, position, name, face_image, team_logo, votes)
             VALUES ($1, $2,
                     (SELECT COALESCE(MAX(position), -1) + 1 FROM contestants WHERE voting_id = $1),
                     $3, $4, $5, 0)"
        )
        .bind(voting_id)
        .bind(contestant.id)
        .bind(&contestant.name)
        .bind(&contestant.face_image)
        .bind(&contestant.team_logo)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[rocket::async_trait]
impl VotingStore for PgStore {
    async fn insert_voting(&self, voting: &Voting) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO votings (id, title, status, owner_id, created_at)
             VALUES ($1, $2, $3, $4, $5)"
        )
        .bind(voting.id)
        .bind(&voting.title)
        .bind(voting.status)
        .bind(&voting.owner_id)
        .bind(voting.created_at)
        .execute(&mut *tx)
        .await?;

        for contestant in &voting.contestants {
            Self::insert_contestant(&mut tx, voting.id, contestant).await?;
        }

        tx.commit().await?;
        self.bump();
        Ok(())
    }

    async fn fetch_voting(&self, id: Uuid) -> StoreResult<Option<Voting>> {
        let mut tx = self.pool.begin().await?;
        // Both reads must see the same snapshot of a voting that may be edited concurrently.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, VotingRow>(
            "SELECT id, title, status, owner_id, created_at FROM votings WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(voting) = record else {
            tx.commit().await?;
            return Ok(None);
        };

        let contestants = sqlx::query_as::<_, ContestantRow>(
            "SELECT id, name, face_image, team_logo, votes
             FROM contestants WHERE voting_id = $1 ORDER BY position"
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(ContestantRow::into_contestant)
        .collect::<StoreResult<Vec<_>>>()?;
        tx.commit().await?;

        Ok(Some(Voting {
            id: voting.id,
            title: voting.title,
            status: voting.status,
            owner_id: voting.owner_id,
            created_at: voting.created_at,
            contestants,
        }))
    }

    async fn list_votings(&self) -> StoreResult<Vec<VotingSummary>> {
        let records = sqlx::query_as::<_, SummaryRow>(
            "SELECT v.id, v.title, v.status, v.created_at,
                    COUNT(c.id) AS contestant_count,
                    COALESCE(SUM(c.votes), 0)::BIGINT AS total_votes
             FROM votings v
             LEFT JOIN contestants c ON c.voting_id = v.id
             GROUP BY v.id"
        )
        .fetch_all(&self.pool)
        .await?;

        records.into_iter()
            .map(|r| Ok(VotingSummary {
                id: r.id,
                title: r.title,
                status: r.status,
                contestant_count: to_count(r.contestant_count, "contestant count")? as usize,
                total_votes: to_count(r.total_votes, "vote total")?,
                created_at: r.created_at,
            }))
            .collect()
    }

    async fn apply_patch(&self, id: Uuid, patch: &VotingPatch) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE votings SET title = $2 WHERE id = $1")
            .bind(id)
            .bind(&patch.title)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for change in &patch.changes {
            match change {
                ContestantChange::Edit { id: contestant_id, name, face_image, team_logo } => {
                    sqlx::query(
                        "UPDATE contestants SET name = $3, face_image = $4, team_logo = $5
                         WHERE voting_id = $1 AND id = $2"
                    )
                    .bind(id)
                    .bind(contestant_id)
                    .bind(name)
                    .bind(face_image)
                    .bind(team_logo)
                    .execute(&mut *tx)
                    .await?;
                }
                ContestantChange::Insert(contestant) => {
                    Self::insert_contestant(&mut tx, id, contestant).await?;
                }
            }
        }

        if !patch.removed.is_empty() {
            sqlx::query("DELETE FROM contestants WHERE voting_id = $1 AND id = ANY($2)")
                .bind(id)
                .bind(&patch.removed)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.bump();
        Ok(true)
    }

    async fn set_status(&self, id: Uuid, status: VotingStatus) -> StoreResult<bool> {
        let updated = sqlx::query("UPDATE votings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated > 0 {
            self.bump();
        }
        Ok(updated > 0)
    }

    async fn increment_votes(
        &self,
        voting_id: Uuid,
        contestant_id: Uuid,
        ballot: Option<&Ballot>,
    ) -> StoreResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        // The open check and the increment are one statement so a concurrent close
        // cannot slip between them.
        let votes = sqlx::query_scalar::<_, i64>(
            "UPDATE contestants c SET votes = c.votes + 1
             FROM votings v
             WHERE v.id = c.voting_id AND v.status = 'open'
               AND c.voting_id = $1 AND c.id = $2
             RETURNING c.votes"
        )
        .bind(voting_id)
        .bind(contestant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(votes) = votes else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(ballot) = ballot {
            sqlx::query(
                "INSERT INTO ballots (id, voting_id, contestant_id, voter_id, cast_at)
                 VALUES ($1, $2, $3, $4, $5)"
            )
            .bind(ballot.id)
            .bind(ballot.voting_id)
            .bind(ballot.contestant_id)
            .bind(&ballot.voter_id)
            .bind(ballot.cast_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.bump();
        debug!("Contestant {} now has {} votes", contestant_id, votes);
        to_count(votes, "vote count").map(Some)
    }

    async fn delete_voting(&self, id: Uuid, cascade: bool) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM votings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if cascade {
            sqlx::query("DELETE FROM ballots WHERE voting_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM contestants WHERE voting_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.bump();
        Ok(true)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
