use std::collections::HashSet;
use std::sync::Mutex;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use shared::identity::Identity;
use shared::models::SessionResponse;
use tracing::{debug, error};
use crate::routes::AppState;

const MAX_TOKENS: usize = 10000;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to generate session token")]
    Randomness,
    #[error("Failed to acquire session lock")]
    LockFailed,
}

/// Anonymous sign-in: hands out opaque bearer tokens and resolves them back to identities.
pub struct SessionRegistry {
    tokens: Mutex<HashSet<String>>,
    rng: SystemRandom,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashSet::new()),
            rng: SystemRandom::new(),
        }
    }

    pub fn issue(&self) -> Result<SessionResponse, SessionError> {
        let mut bytes = [0u8; 32];
        self.rng.fill(&mut bytes).map_err(|_| SessionError::Randomness)?;
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let mut tokens = self.tokens.lock().map_err(|_| {
            error!("Failed to acquire lock for session storage");
            SessionError::LockFailed
        })?;
        // Past the cap every session is dropped; callers sign in again.
        if tokens.len() >= MAX_TOKENS {
            tokens.clear();
        }
        tokens.insert(token.clone());
        debug!("Issued new anonymous session");

        Ok(SessionResponse {
            anonymous_id: shared::identity::anonymous_id(&token),
            token,
        })
    }

    pub fn resolve(&self, token: &str) -> Option<Identity> {
        let tokens = self.tokens.lock().ok()?;
        if tokens.contains(token) {
            Some(Identity::from_token(token))
        } else {
            debug!("Unknown session token presented");
            None
        }
    }
}

/// The identity behind the request's bearer token, if any. Never rejects the
/// request: operations that need an identity report that themselves.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Caller {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = req.headers()
            .get_one("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        let identity = match (token, req.rocket().state::<AppState>()) {
            (Some(token), Some(state)) => state.sessions.resolve(token),
            _ => None,
        };

        Outcome::Success(Caller(identity))
    }
}
