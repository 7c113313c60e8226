use std::sync::Arc;

use tracing::error;

use launchpad_auth::token::TokenService;
use launchpad_db::{Database, PostRepository, ProgramRepository, StartupRepository, StatsRepository, UserRepository};

use crate::email::Mailer;
use crate::error::ApiError;
use crate::role_switch::RoleSwitch;
use crate::workflow::ApplicationWorkflow;

pub type AppState = Arc<AppStateInner>;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Public base URL, used to build links in emails.
    pub app_url: String,
    /// Adds `Secure` to the session cookie.
    pub secure_cookies: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3000".to_string(),
            secure_cookies: false,
        }
    }
}

pub struct AppStateInner {
    pub users: Arc<dyn UserRepository>,
    pub startups: Arc<dyn StartupRepository>,
    pub programs: Arc<dyn ProgramRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub stats: Arc<dyn StatsRepository>,
    pub workflow: ApplicationWorkflow,
    pub role_switch: RoleSwitch,
    pub tokens: Arc<TokenService>,
    pub mailer: Arc<dyn Mailer>,
    pub config: ApiConfig,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, tokens: TokenService, mailer: Arc<dyn Mailer>, config: ApiConfig) -> AppState {
        let tokens = Arc::new(tokens);
        Arc::new(Self {
            users: db.clone(),
            startups: db.clone(),
            programs: db.clone(),
            posts: db.clone(),
            stats: db.clone(),
            workflow: ApplicationWorkflow::new(db.clone(), db.clone(), db.clone()),
            role_switch: RoleSwitch::new(db, tokens.clone()),
            tokens,
            mailer,
            config,
        })
    }
}

/// Run store work (and password hashing) on the blocking pool.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
    })?
}
