// Public API
pub mod auth_service;
pub mod error;
pub mod moka_session_repository;
pub mod models;
pub mod password;
pub mod repository;
pub mod sled_repository;
pub mod token;

// Re-export commonly used types
pub use auth_service::AuthService;
pub use error::{AuthError, ErrorKind};
pub use moka_session_repository::MokaSessionRepository;
pub use models::{LogoutOutcome, PublicUser, Role, Session, TokenPair, User};
pub use repository::{SessionRepository, UserRepository};
pub use sled_repository::{open_db, SledSessionRepository, SledUserRepository};
pub use token::{Claims, TokenCodec, TokenError, TokenType};
