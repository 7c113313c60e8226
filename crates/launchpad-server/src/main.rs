mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use launchpad_api::email::{LogMailer, Mailer, SmtpMailer};
use launchpad_api::{ApiConfig, AppStateInner};
use launchpad_auth::token::TokenService;
use launchpad_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "launchpad=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            info!("Sending mail through {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            info!("No SMTP host configured, emails will be logged");
            Arc::new(LogMailer)
        }
    };

    let state = AppStateInner::new(
        db,
        TokenService::new(&config.jwt_secret)?,
        mailer,
        ApiConfig {
            app_url: config.app_url.clone(),
            secure_cookies: config.secure_cookies,
        },
    );

    let app = launchpad_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Launchpad server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
