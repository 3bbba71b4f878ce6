use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::error::{Error, ErrorCode};
use tracing::error;
use crate::ledger::LedgerError;
use crate::rate_limiter::RateLimitError;
use crate::session::SessionError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Invalid {0} id")]
    InvalidId(&'static str),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    fn status_and_code(&self) -> (Status, ErrorCode) {
        match self {
            ApiError::Ledger(e) => match e {
                LedgerError::Validation(_) => (Status::BadRequest, ErrorCode::ValidationFailed),
                LedgerError::VotingNotFound(_) | LedgerError::ContestantNotFound(_) => {
                    (Status::NotFound, ErrorCode::NotFound)
                }
                LedgerError::VotingClosed(_) => (Status::Conflict, ErrorCode::VotingClosed),
                LedgerError::AuthenticationRequired => {
                    (Status::Unauthorized, ErrorCode::AuthenticationRequired)
                }
                LedgerError::Store(_) => (Status::InternalServerError, ErrorCode::SystemError),
            },
            ApiError::InvalidId(_) => (Status::BadRequest, ErrorCode::InvalidInput),
            ApiError::RateLimited(RateLimitError::Exceeded(_)) => {
                (Status::TooManyRequests, ErrorCode::RateLimited)
            }
            ApiError::RateLimited(RateLimitError::Internal) | ApiError::Session(_) => {
                (Status::InternalServerError, ErrorCode::SystemError)
            }
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let (status, code) = self.status_and_code();

        // Store failures keep their details in the log, not in the response.
        let body = if status == Status::InternalServerError {
            error!("{} {} failed: {}", req.method(), req.uri(), self);
            Error::new(code, code.to_string())
        } else {
            Error::new(code, self.to_string())
        };

        (status, Json(body)).respond_to(req)
    }
}
