pub mod config;
pub mod store;
pub mod memory_store;
pub mod pg_store;
pub mod ledger;
pub mod live;
pub mod session;
pub mod routes;
pub mod cors;
pub mod error;
pub mod utils;
pub mod rate_limiter;
pub mod catchers;
pub use shared::{models::*, error::*, identity::*};
pub use shared::voting_logic::{compute_results, VotingError};

use rocket::{routes, catchers, Build, Rocket};
use crate::{
    catchers::{bad_request, internal_error, not_found, too_many_requests, unauthorized, unprocessable},
    cors::CORS,
    routes::*,
};

/// Assembles the HTTP API around an already configured state.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build()
        .attach(CORS)
        .manage(state)
        .mount(
            "/api",
            routes![
                create_session,
                placeholder_images,
                list_votings,
                create_voting,
                get_voting,
                update_voting,
                delete_voting,
                close_voting,
                cast_vote,
                get_results,
                results_stream,
                all_options
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                not_found,
                unprocessable,
                too_many_requests,
                internal_error
            ],
        )
}
