use gatekeep::auth::{
    open_db, AuthService, MokaSessionRepository, SessionRepository, SledSessionRepository,
    SledUserRepository, UserRepository,
};
use shared::config::{Config, SessionBackend};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        Self { auth_service }
    }

    /// Open the stores under `config.data_dir` and wire up the auth service.
    pub fn from_config(config: &Config) -> shared::Result<Self> {
        let db_path = Path::new(&config.data_dir).join("gatekeep.sled");
        let db = open_db(&db_path)?;
        info!("Opened database at {}", db_path.display());

        let user_repo: Arc<dyn UserRepository> = Arc::new(SledUserRepository::new(db.clone())?);
        let session_repo: Arc<dyn SessionRepository> = match config.session_backend {
            SessionBackend::Sled => Arc::new(SledSessionRepository::new(db)?),
            SessionBackend::Memory => Arc::new(MokaSessionRepository::with_defaults()),
        };
        info!("Session backend: {}", config.session_backend.as_str());

        let auth_service = AuthService::from_config(config, user_repo, session_repo);
        Ok(Self::new(Arc::new(auth_service)))
    }
}
