//! Entry point: load config, wire dependencies, and run the server.

use accounts::auth::TokenIssuer;
use accounts::config::{Config, StoreKind};
use accounts::db::{self, PgAccountStore};
use accounts::repositories::{AccountStore, MemoryAccountStore};
use accounts::services::{LogMailer, MailQueue};
use accounts::{create_app, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn AccountStore> = match config.store {
        StoreKind::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgAccountStore::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory account store; data is lost on exit");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let mailer = Arc::new(LogMailer::new(config.base_url.clone()));
    let (mail_queue, _mail_worker) = MailQueue::start(config.mail_queue_capacity, mailer);
    let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_expiration_secs);

    let state = AppState::new(
        store,
        Arc::new(mail_queue),
        tokens,
        chrono::Duration::hours(config.reset_token_ttl_hours),
    );
    let app = create_app(state);

    tracing::info!(addr = %config.server_addr, store = ?config.store, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
