use std::collections::HashSet;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;
use crate::models::*;
use crate::validation::{validate_voting_form, ValidationError, ValidationRules, MAX_CONTESTANTS};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Unknown contestant: {0}")]
    UnknownContestant(Uuid),
    #[error("Voting is closed")]
    Closed,
}

impl Voting {
    /// Builds a fresh open voting from a validated form. Ids in the form are ignored.
    pub fn create(
        form: &VotingForm,
        owner_id: impl Into<String>,
        rules: ValidationRules,
    ) -> Result<Self, VotingError> {
        validate_voting_form(form, rules)?;

        Ok(Self {
            id: Uuid::new_v4(),
            title: form.title.trim().to_string(),
            status: VotingStatus::Open,
            owner_id: owner_id.into(),
            created_at: OffsetDateTime::now_utc(),
            contestants: form.contestants.iter().map(new_contestant).collect(),
        })
    }

    pub fn ensure_open(&self) -> Result<(), VotingError> {
        if self.is_open() { Ok(()) } else { Err(VotingError::Closed) }
    }

    /// Moves the voting to `Closed`. Returns false when it already was.
    pub fn close(&mut self) -> bool {
        let was_open = self.is_open();
        self.status = VotingStatus::Closed;
        was_open
    }

    pub fn record_vote(&mut self, contestant_id: Uuid) -> Result<u64, VotingError> {
        self.ensure_open()?;
        let contestant = self.contestants.iter_mut()
            .find(|c| c.id == contestant_id)
            .ok_or(VotingError::UnknownContestant(contestant_id))?;
        contestant.votes += 1;
        Ok(contestant.votes)
    }

    /// Works out what an edit form changes without touching `self`.
    pub fn plan_update(
        &self,
        form: &VotingForm,
        rules: ValidationRules,
        prune_dropped: bool,
    ) -> Result<VotingPatch, VotingError> {
        validate_voting_form(form, rules)?;

        let mut kept = HashSet::new();
        let mut changes = Vec::with_capacity(form.contestants.len());
        for entry in &form.contestants {
            match entry.id {
                Some(id) => {
                    if self.contestant(id).is_none() {
                        return Err(VotingError::UnknownContestant(id));
                    }
                    kept.insert(id);
                    changes.push(ContestantChange::Edit {
                        id,
                        name: entry.name.trim().to_string(),
                        face_image: entry.face_image.clone(),
                        team_logo: normalize_logo(&entry.team_logo),
                    });
                }
                None => changes.push(ContestantChange::Insert(new_contestant(entry))),
            }
        }

        let removed = if prune_dropped {
            self.contestants.iter()
                .filter(|c| !kept.contains(&c.id))
                .map(|c| c.id)
                .collect()
        } else {
            Vec::new()
        };

        // Contestants the form leaves out survive the edit unless pruned, so the
        // limits apply to the merged list as well as to the form.
        let merged_names = self.contestants.iter()
            .filter(|c| !kept.contains(&c.id) && !removed.contains(&c.id))
            .map(|c| c.name.as_str())
            .chain(form.contestants.iter().map(|c| c.name.trim()));
        check_merged_names(merged_names)?;

        Ok(VotingPatch {
            title: form.title.trim().to_string(),
            changes,
            removed,
        })
    }

    pub fn apply_patch(&mut self, patch: VotingPatch) {
        self.title = patch.title;
        for change in patch.changes {
            match change {
                ContestantChange::Edit { id, name, face_image, team_logo } => {
                    if let Some(c) = self.contestants.iter_mut().find(|c| c.id == id) {
                        c.name = name;
                        c.face_image = face_image;
                        c.team_logo = team_logo;
                    }
                }
                ContestantChange::Insert(contestant) => self.contestants.push(contestant),
            }
        }
        if !patch.removed.is_empty() {
            self.contestants.retain(|c| !patch.removed.contains(&c.id));
        }
    }
}

fn check_merged_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_lowercase()) {
            return Err(ValidationError::DuplicateContestant(name.to_string()));
        }
    }
    if seen.len() > MAX_CONTESTANTS {
        return Err(ValidationError::TooManyContestants);
    }
    Ok(())
}

fn normalize_logo(logo: &Option<String>) -> Option<String> {
    logo.as_ref().filter(|l| !l.is_empty()).cloned()
}

fn new_contestant(entry: &ContestantForm) -> Contestant {
    Contestant {
        id: Uuid::new_v4(),
        name: entry.name.trim().to_string(),
        face_image: entry.face_image.clone(),
        team_logo: normalize_logo(&entry.team_logo),
        votes: 0,
    }
}

/// Ranks contestants by votes. `sort_by` is stable, so ties keep insertion order.
pub fn compute_results(voting: &Voting) -> Results {
    let total_votes = voting.total_votes();

    let mut ranked: Vec<&Contestant> = voting.contestants.iter().collect();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes));

    let standings: Vec<Standing> = ranked.into_iter()
        .enumerate()
        .map(|(i, c)| Standing {
            rank: i + 1,
            contestant_id: c.id,
            name: c.name.clone(),
            face_image: c.face_image.clone(),
            team_logo: c.team_logo.clone(),
            votes: c.votes,
            share: if total_votes > 0 {
                c.votes as f64 * 100.0 / total_votes as f64
            } else {
                0.0
            },
        })
        .collect();

    let winner = if total_votes > 0 { standings.first().cloned() } else { None };

    Results {
        voting_id: voting.id,
        title: voting.title.clone(),
        status: voting.status,
        is_final: !voting.is_open(),
        total_votes,
        standings,
        winner,
    }
}
