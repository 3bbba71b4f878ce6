use std::sync::Arc;
use backend::{
    build_rocket,
    config::{ServerConfig, StoreBackend},
    memory_store::MemoryStore,
    pg_store::PgStore,
    routes::AppState,
    store::VotingStore,
};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::{info, warn};

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting poll ledger server");

    let config = ServerConfig::from_lookup(|key| secret_store.get(key));
    info!("⚙️ {:?}", config);

    let store: Arc<dyn VotingStore> = match config.store_backend {
        StoreBackend::Postgres => {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(CustomError::new)?;
            info!("📋 Migrations complete");
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("STORE_BACKEND=memory - votings will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let rocket = build_rocket(AppState::new(store, &config));
    Ok(rocket.into())
}
