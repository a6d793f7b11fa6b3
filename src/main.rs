//! NextKala menu service - menu tree editing backend for the admin panel

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nextkala::api::{router, AppState};
use nextkala::config::Config;
use nextkala::PgMenuRepository;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let db = PgPoolOptions::new().max_connections(config.db_max_connections).connect(&config.database_url).await?;
    let repo = PgMenuRepository::new(db);
    repo.migrate().await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(error) => {
                tracing::warn!(%error, url = %url, "NATS unavailable, menu events will not be published");
                None
            }
        },
        None => None,
    };

    let app = router(AppState::new(repo, config.depth_limit).with_nats(nats));
    let addr = config.listen_addr();
    tracing::info!(levels = config.depth_limit.levels(), "🚀 NextKala menus listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
