use uuid::Uuid;
use crate::error::ApiError;

pub fn parse_id(id: &str, what: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId(what))
}
