use super::error::AuthError;
use super::models::{LogoutOutcome, PublicUser, Role, Session, TokenPair, User};
use super::password::{hash_password, verify_password};
use super::repository::{SessionRepository, UserRepository};
use super::token::{TokenCodec, TokenType};
use shared::config::Config;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

/// Signup, login, relogin, logout and current-user resolution.
///
/// Every mutating operation is a single unit of work against the stores, so a
/// failed call leaves no partial state behind.
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    tokens: TokenCodec,
    admin_secret: String,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        tokens: TokenCodec,
        admin_secret: String,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            tokens,
            admin_secret,
        }
    }

    pub fn from_config(
        config: &Config,
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::new(
            user_repo,
            session_repo,
            TokenCodec::new(&config.signing_secret),
            config.admin_secret.clone(),
        )
    }

    /// Create an account. Gated by the shared admin secret.
    pub async fn signup(
        &self,
        admin_secret: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<PublicUser, AuthError> {
        let secret_matches: bool = admin_secret
            .as_bytes()
            .ct_eq(self.admin_secret.as_bytes())
            .into();
        if !secret_matches {
            warn!("Signup rejected for '{}': bad admin secret", username);
            return Err(AuthError::InvalidAdminSecret);
        }

        if self.user_repo.username_exists(username).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let user = User::new(username.to_string(), password_hash, role);

        // The store re-checks uniqueness atomically for racing signups
        let user = match self.user_repo.create(user).await {
            Ok(user) => user,
            Err(shared::Error::Conflict(_)) => return Err(AuthError::UserAlreadyExists),
            Err(e) => return Err(e.into()),
        };

        info!("User created: {} ({})", user.username, user.role);
        Ok(PublicUser::from(&user))
    }

    /// Authenticate by password and start a fresh session, superseding any
    /// previous one for the same user.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        // Same error whether the user is unknown or the password is wrong
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            debug!("Login failed for '{}'", username);
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.create_token_pair(&user.username)?;
        let replaced = self
            .session_repo
            .replace_user_session(Session::new(user.id.clone(), &tokens))
            .await?;

        info!(
            "User logged in: {} (superseded {} session(s))",
            user.username, replaced
        );
        Ok(tokens)
    }

    /// Exchange the current refresh token for a new pair. The presented pair
    /// stops working as soon as this returns.
    pub async fn relogin(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .tokens
            .decode_expecting(refresh_token, TokenType::Refresh)?;

        let tokens = self.tokens.create_token_pair(&claims.sub)?;
        let session = self
            .session_repo
            .rotate_tokens(refresh_token, &tokens)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        info!("Session {} refreshed for {}", session.id, claims.sub);
        Ok(tokens)
    }

    /// Remove every session of the user named by the refresh token.
    ///
    /// The token only has to decode; it need not be the one currently stored,
    /// so a rotated-out refresh token still logs the account out.
    pub async fn logout(&self, refresh_token: &str) -> Result<LogoutOutcome, AuthError> {
        let claims = self
            .tokens
            .decode_expecting(refresh_token, TokenType::Refresh)?;

        let user = self
            .user_repo
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let deleted = self.session_repo.delete_user_sessions(&user.id).await?;

        info!("User logged out: {} ({} session(s) removed)", user.username, deleted);
        Ok(LogoutOutcome {
            deleted,
            username: user.username,
        })
    }

    /// Gate for protected endpoints: the access token must decode, be of the
    /// access type, name a known user and be the one stored in their session.
    pub async fn resolve_current_user(&self, access_token: &str) -> Result<PublicUser, AuthError> {
        let claims = self
            .tokens
            .decode_expecting(access_token, TokenType::Access)?;

        let user = self
            .user_repo
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        self.session_repo
            .find_by_user_and_access_token(&user.id, access_token)
            .await?
            .ok_or(AuthError::SessionRevoked)?;

        Ok(PublicUser::from(&user))
    }
}
