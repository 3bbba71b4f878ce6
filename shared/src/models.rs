use serde::{Serialize, Deserialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "voting_status", rename_all = "lowercase"))]
pub enum VotingStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contestant {
    pub id: Uuid,
    pub name: String,
    pub face_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_logo: Option<String>,
    pub votes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Voting {
    pub id: Uuid,
    pub title: String,
    pub status: VotingStatus,
    pub owner_id: String,
    pub created_at: OffsetDateTime,
    pub contestants: Vec<Contestant>,
}

/// One contestant entry of a create or edit form. Entries without an id are new.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContestantForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub face_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_logo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VotingForm {
    pub title: String,
    pub contestants: Vec<ContestantForm>,
}

pub type CreateVotingRequest = VotingForm;
pub type UpdateVotingRequest = VotingForm;

/// Audit record of a single cast vote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub id: Uuid,
    pub voting_id: Uuid,
    pub contestant_id: Uuid,
    pub voter_id: String,
    pub cast_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub voting_id: Uuid,
    pub contestant_id: Uuid,
    pub votes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VotingSummary {
    pub id: Uuid,
    pub title: String,
    pub status: VotingStatus,
    pub contestant_count: usize,
    pub total_votes: u64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub rank: usize,
    pub contestant_id: Uuid,
    pub name: String,
    pub face_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_logo: Option<String>,
    pub votes: u64,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub voting_id: Uuid,
    pub title: String,
    pub status: VotingStatus,
    pub is_final: bool,
    pub total_votes: u64,
    pub standings: Vec<Standing>,
    pub winner: Option<Standing>,
}

/// What a live subscriber sees: the latest value and whether it is still loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    pub loading: bool,
    pub data: Option<T>,
}

impl<T> Snapshot<T> {
    pub fn loading() -> Self {
        Self { loading: true, data: None }
    }

    pub fn ready(data: Option<T>) -> Self {
        Self { loading: false, data }
    }
}

/// Edit of an existing contestant or a brand new one, as produced by `Voting::plan_update`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContestantChange {
    Edit {
        id: Uuid,
        name: String,
        face_image: String,
        team_logo: Option<String>,
    },
    Insert(Contestant),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VotingPatch {
    pub title: String,
    pub changes: Vec<ContestantChange>,
    pub removed: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub anonymous_id: String,
}

impl Voting {
    pub fn is_open(&self) -> bool {
        self.status == VotingStatus::Open
    }

    pub fn total_votes(&self) -> u64 {
        self.contestants.iter().map(|c| c.votes).sum()
    }

    pub fn contestant(&self, id: Uuid) -> Option<&Contestant> {
        self.contestants.iter().find(|c| c.id == id)
    }

    pub fn summary(&self) -> VotingSummary {
        VotingSummary {
            id: self.id,
            title: self.title.clone(),
            status: self.status,
            contestant_count: self.contestants.len(),
            total_votes: self.total_votes(),
            created_at: self.created_at,
        }
    }

    /// The edit form as a client would submit it back unchanged.
    pub fn to_form(&self) -> VotingForm {
        VotingForm {
            title: self.title.clone(),
            contestants: self.contestants.iter()
                .map(|c| ContestantForm {
                    id: Some(c.id),
                    name: c.name.clone(),
                    face_image: c.face_image.clone(),
                    team_logo: c.team_logo.clone(),
                })
                .collect(),
        }
    }
}
