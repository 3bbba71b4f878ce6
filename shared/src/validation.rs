use std::collections::HashSet;
use crate::images::ImageSource;
use crate::models::{ContestantForm, VotingForm};

pub const MIN_TITLE_LENGTH: usize = 3;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 40;
pub const MIN_CONTESTANTS: usize = 2;
pub const MAX_CONTESTANTS: usize = 20;
pub const MAX_IMAGE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title must be at least {MIN_TITLE_LENGTH} characters")]
    TitleTooShort,
    #[error("Title exceeds maximum length of {MAX_TITLE_LENGTH}")]
    TitleTooLong,
    #[error("Too few contestants (minimum {MIN_CONTESTANTS})")]
    TooFewContestants,
    #[error("Too many contestants (maximum {MAX_CONTESTANTS})")]
    TooManyContestants,
    #[error("Contestant name is required")]
    EmptyName,
    #[error("Contestant name exceeds maximum length of {MAX_NAME_LENGTH}")]
    NameTooLong,
    #[error("Duplicate contestant: {0}")]
    DuplicateContestant(String),
    #[error("Duplicate contestant id: {0}")]
    DuplicateContestantId(uuid::Uuid),
    #[error("Image is required for contestant: {0}")]
    MissingFaceImage(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Image exceeds maximum size of {MAX_IMAGE_BYTES} bytes")]
    ImageTooLarge,
}

/// Knobs that differ between deployments of the same form rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub require_face_image: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self { require_face_image: true }
    }
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if len < MIN_TITLE_LENGTH { return Err(ValidationError::TitleTooShort); }
    if len > MAX_TITLE_LENGTH { return Err(ValidationError::TitleTooLong); }
    Ok(())
}

pub fn validate_image(reference: &str) -> Result<(), ValidationError> {
    ImageSource::classify(reference).map(|_| ())
}

fn validate_contestant(contestant: &ContestantForm, rules: ValidationRules) -> Result<(), ValidationError> {
    let name = contestant.name.trim();
    if name.is_empty() { return Err(ValidationError::EmptyName); }
    if name.chars().count() > MAX_NAME_LENGTH { return Err(ValidationError::NameTooLong); }

    if contestant.face_image.is_empty() {
        if rules.require_face_image {
            return Err(ValidationError::MissingFaceImage(name.to_string()));
        }
    } else {
        validate_image(&contestant.face_image)?;
    }

    match contestant.team_logo.as_deref() {
        Some(logo) if !logo.is_empty() => validate_image(logo),
        _ => Ok(()),
    }
}

pub fn validate_voting_form(form: &VotingForm, rules: ValidationRules) -> Result<(), ValidationError> {
    validate_title(&form.title)?;

    if form.contestants.len() < MIN_CONTESTANTS { return Err(ValidationError::TooFewContestants); }
    if form.contestants.len() > MAX_CONTESTANTS { return Err(ValidationError::TooManyContestants); }

    for contestant in &form.contestants {
        validate_contestant(contestant, rules)?;
    }

    let mut seen_names = HashSet::new();
    if let Some(dup) = form.contestants.iter()
        .find(|c| !seen_names.insert(c.name.trim().to_lowercase()))
    {
        return Err(ValidationError::DuplicateContestant(dup.name.trim().to_string()));
    }

    let mut seen_ids = HashSet::new();
    if let Some(id) = form.contestants.iter()
        .filter_map(|c| c.id)
        .find(|id| !seen_ids.insert(*id))
    {
        return Err(ValidationError::DuplicateContestantId(id));
    }

    Ok(())
}
