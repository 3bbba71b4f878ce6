use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// The anonymous caller behind a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub anonymous_id: String,
}

impl Identity {
    pub fn from_token(token: &str) -> Self {
        Self { anonymous_id: anonymous_id(token) }
    }
}

/// Stable id recorded on votings and ballots; the raw token never leaves the session registry.
pub fn anonymous_id(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
