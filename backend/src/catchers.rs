use rocket::{Request, catch, serde::json::Json};
use shared::error::{Error, ErrorCode};

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::InvalidInput, "Invalid request parameters."))
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::AuthenticationRequired, "Sign in anonymously via POST /api/session first."))
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::NotFound, "The requested resource was not found."))
}

#[catch(422)]
pub fn unprocessable(req: &Request) -> Json<Error> {
    Json(Error::with_details(
        ErrorCode::InvalidInput,
        "Malformed request body.",
        req.uri().path().to_string(),
    ))
}

#[catch(429)]
pub fn too_many_requests(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::RateLimited, "Rate limit exceeded. Please wait before trying again."))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::SystemError, "An internal server error occurred."))
}
