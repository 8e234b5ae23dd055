use super::models::{Session, TokenPair, User};
use async_trait::async_trait;
use shared::Result;

/// Credential store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user. Fails with `Error::Conflict` if the username is taken;
    /// the check and the insert happen atomically.
    async fn create(&self, user: User) -> Result<User>;

    /// Find a user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Check if a username exists
    async fn username_exists(&self, username: &str) -> Result<bool>;
}

/// Session store. Holds at most one session per user.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Install `session` as the only session of its user, in one unit of work.
    /// Returns how many previous sessions were superseded.
    async fn replace_user_session(&self, session: Session) -> Result<usize>;

    /// Find the session currently holding this refresh token
    async fn find_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Session>>;

    /// Find the user's session if its access token is exactly `access_token`
    async fn find_by_user_and_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<Session>>;

    /// Get the user's session, if any
    async fn get_user_session(&self, user_id: &str) -> Result<Option<Session>>;

    /// Atomically swap the tokens of the session holding `refresh_token`.
    /// Returns `None` when no session holds it (already rotated or never issued).
    async fn rotate_tokens(&self, refresh_token: &str, tokens: &TokenPair)
        -> Result<Option<Session>>;

    /// Delete every session of the user, returning how many were removed
    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize>;
}
