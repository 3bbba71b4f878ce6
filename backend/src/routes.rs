use std::sync::Arc;
use rocket::{State, Shutdown, get, post, put, delete, http::Status, response::status, serde::json::Json};
use rocket::response::stream::{Event, EventStream};
use tracing::{debug, error, instrument};
use shared::images::{ImagePlaceholder, PLACEHOLDER_IMAGES};
use shared::models::*;
use shared::validation::validate_voting_form;
use crate::{
    config::ServerConfig,
    error::ApiError,
    ledger::{Ledger, LedgerError},
    rate_limiter::RateLimiter,
    session::{Caller, SessionRegistry},
    store::VotingStore,
    utils::parse_id,
};

pub struct AppState {
    pub ledger: Ledger,
    pub sessions: SessionRegistry,
    pub create_limiter: RateLimiter,
}

impl AppState {
    pub fn new(store: Arc<dyn VotingStore>, config: &ServerConfig) -> Self {
        Self {
            ledger: Ledger::new(store, config.ledger),
            sessions: SessionRegistry::new(),
            create_limiter: RateLimiter::new(config.create_limit, config.create_window_minutes),
        }
    }
}

#[post("/session")]
pub async fn create_session(state: &State<AppState>) -> Result<status::Created<Json<SessionResponse>>, ApiError> {
    let session = state.sessions.issue()?;
    Ok(status::Created::new("/api/session").body(Json(session)))
}

#[get("/placeholder-images")]
pub async fn placeholder_images() -> Json<&'static [ImagePlaceholder]> {
    Json(PLACEHOLDER_IMAGES)
}

#[get("/votings")]
pub async fn list_votings(state: &State<AppState>) -> Result<Json<Vec<VotingSummary>>, ApiError> {
    Ok(Json(state.ledger.list_votings().await?))
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[instrument(skip(state, caller, form))]
#[post("/votings", format = "json", data = "<form>")]
pub async fn create_voting(
    state: &State<AppState>,
    caller: Caller,
    form: Json<CreateVotingRequest>,
) -> Result<status::Created<Json<Voting>>, ApiError> {
    if let Some(identity) = caller.identity() {
        // Only well-formed requests count towards the creation limit.
        validate_voting_form(&form, state.ledger.config().rules).map_err(LedgerError::from)?;
        let rate_limit_key = format!("create_voting:{}", identity.anonymous_id);
        state.create_limiter.check_rate_limit(&rate_limit_key)?;
    }

    let voting = state.ledger.create_voting(caller.identity(), &form).await?;
    let location = format!("/api/votings/{}", voting.id);
    Ok(status::Created::new(location).body(Json(voting)))
}

#[get("/votings/<id>")]
pub async fn get_voting(state: &State<AppState>, id: &str) -> Result<Json<Voting>, ApiError> {
    let voting_id = parse_id(id, "voting")?;
    Ok(Json(state.ledger.get_voting(voting_id).await?))
}

#[instrument(skip(state, caller, form), fields(voting_id = %id))]
#[put("/votings/<id>", format = "json", data = "<form>")]
pub async fn update_voting(
    state: &State<AppState>,
    caller: Caller,
    id: &str,
    form: Json<UpdateVotingRequest>,
) -> Result<Json<Voting>, ApiError> {
    let voting_id = parse_id(id, "voting")?;
    Ok(Json(state.ledger.update_voting(caller.identity(), voting_id, &form).await?))
}

#[instrument(skip(state, caller), fields(voting_id = %id))]
#[delete("/votings/<id>")]
pub async fn delete_voting(state: &State<AppState>, caller: Caller, id: &str) -> Result<Status, ApiError> {
    let voting_id = parse_id(id, "voting")?;
    state.ledger.delete_voting(caller.identity(), voting_id).await?;
    Ok(Status::NoContent)
}

#[instrument(skip(state, caller), fields(voting_id = %id))]
#[post("/votings/<id>/close")]
pub async fn close_voting(state: &State<AppState>, caller: Caller, id: &str) -> Result<Json<Voting>, ApiError> {
    let voting_id = parse_id(id, "voting")?;
    Ok(Json(state.ledger.close_voting(caller.identity(), voting_id).await?))
}

#[instrument(skip(state, caller), fields(voting_id = %id, contestant_id = %contestant))]
#[post("/votings/<id>/contestants/<contestant>/vote")]
pub async fn cast_vote(
    state: &State<AppState>,
    caller: Caller,
    id: &str,
    contestant: &str,
) -> Result<Json<VoteReceipt>, ApiError> {
    let voting_id = parse_id(id, "voting")?;
    let contestant_id = parse_id(contestant, "contestant")?;
    debug!("Casting vote");
    Ok(Json(state.ledger.cast_vote(caller.identity(), voting_id, contestant_id).await?))
}

#[get("/votings/<id>/results")]
pub async fn get_results(state: &State<AppState>, id: &str) -> Result<Json<Results>, ApiError> {
    let voting_id = parse_id(id, "voting")?;
    Ok(Json(state.ledger.compute_results(voting_id).await?))
}

/// Server-sent events: a loading snapshot, the current results, then one
/// snapshot per change. Ends when the voting disappears or the server shuts down.
#[get("/votings/<id>/results/stream")]
pub async fn results_stream(
    state: &State<AppState>,
    id: &str,
    mut shutdown: Shutdown,
) -> Result<EventStream![], ApiError> {
    let voting_id = parse_id(id, "voting")?;
    // Unknown ids are a 404 up front rather than an empty stream.
    state.ledger.get_voting(voting_id).await?;
    let mut feed = state.ledger.subscribe_results(voting_id);

    Ok(EventStream! {
        yield Event::json(&Snapshot::<Results>::loading());
        loop {
            let next = rocket::tokio::select! {
                next = feed.next() => next,
                _ = &mut shutdown => break,
            };
            match next {
                Some(Ok(snapshot)) => {
                    let gone = snapshot.data.is_none();
                    yield Event::json(&snapshot);
                    if gone {
                        break;
                    }
                }
                Some(Err(e)) => {
                    error!("Live results for {} failed: {}", feed.voting_id(), e);
                    break;
                }
                None => break,
            }
        }
    })
}
