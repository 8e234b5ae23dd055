use super::models::{Session, TokenPair};
use super::repository::SessionRepository;
use super::token::REFRESH_TOKEN_TTL_SECS;
use async_trait::async_trait;
use moka::future::Cache;
use shared::Result;
use std::time::Duration;
use tokio::sync::Mutex;

/// User ID type alias
pub type UserId = String;

/// Moka-based in-memory session repository with dual-index support
pub struct MokaSessionRepository {
    // Primary index: user id -> session
    sessions: Cache<UserId, Session>,
    // Secondary index: current refresh token -> user id
    by_refresh: Cache<String, UserId>,
    // Held across every write so both indexes move together
    write_lock: Mutex<()>,
}

impl MokaSessionRepository {
    /// Create a new Moka session repository with specified capacity and TTL
    pub fn new(max_sessions: Option<u64>, ttl: Option<Duration>) -> Self {
        let mut sessions_builder = Cache::builder();
        let mut refresh_builder = Cache::builder();

        if let Some(capacity) = max_sessions {
            sessions_builder = sessions_builder.max_capacity(capacity);
            refresh_builder = refresh_builder.max_capacity(capacity);
        }

        if let Some(ttl) = ttl {
            sessions_builder = sessions_builder.time_to_live(ttl);
            refresh_builder = refresh_builder.time_to_live(ttl);
        }

        Self {
            sessions: sessions_builder.build(),
            by_refresh: refresh_builder.build(),
            write_lock: Mutex::new(()),
        }
    }

    /// Unbounded, with entries living as long as a refresh token
    pub fn with_defaults() -> Self {
        Self::new(None, Some(Duration::from_secs(REFRESH_TOKEN_TTL_SECS as u64)))
    }
}

#[async_trait]
impl SessionRepository for MokaSessionRepository {
    async fn replace_user_session(&self, session: Session) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let previous = self.sessions.remove(&session.user_id).await;
        if let Some(old) = &previous {
            self.by_refresh.invalidate(&old.refresh_token).await;
        }

        self.by_refresh
            .insert(session.refresh_token.clone(), session.user_id.clone())
            .await;
        self.sessions.insert(session.user_id.clone(), session).await;

        Ok(usize::from(previous.is_some()))
    }

    async fn find_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Session>> {
        let Some(user_id) = self.by_refresh.get(refresh_token).await else {
            return Ok(None);
        };

        Ok(self
            .sessions
            .get(&user_id)
            .await
            .filter(|s| s.refresh_token == refresh_token))
    }

    async fn find_by_user_and_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .get(user_id)
            .await
            .filter(|s| s.access_token == access_token))
    }

    async fn get_user_session(&self, user_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(user_id).await)
    }

    async fn rotate_tokens(
        &self,
        refresh_token: &str,
        tokens: &TokenPair,
    ) -> Result<Option<Session>> {
        let _guard = self.write_lock.lock().await;

        let Some(mut session) = self.find_by_refresh_token(refresh_token).await? else {
            return Ok(None);
        };

        session.rotate(tokens);

        self.by_refresh.invalidate(refresh_token).await;
        self.by_refresh
            .insert(session.refresh_token.clone(), session.user_id.clone())
            .await;
        self.sessions
            .insert(session.user_id.clone(), session.clone())
            .await;

        Ok(Some(session))
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        match self.sessions.remove(user_id).await {
            Some(old) => {
                self.by_refresh.invalidate(&old.refresh_token).await;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[tokio::test]
    async fn test_replace_and_lookup() {
        let repo = MokaSessionRepository::with_defaults();

        let session = Session::new("u1".into(), &pair("a1", "r1"));
        assert_eq!(repo.replace_user_session(session.clone()).await.unwrap(), 0);

        let by_refresh = repo.find_by_refresh_token("r1").await.unwrap().unwrap();
        assert_eq!(by_refresh.id, session.id);
        assert!(repo
            .find_by_user_and_access_token("u1", "a1")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find_by_user_and_access_token("u1", "r1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_new_session_supersedes_old() {
        let repo = MokaSessionRepository::with_defaults();

        repo.replace_user_session(Session::new("u1".into(), &pair("a1", "r1")))
            .await
            .unwrap();
        let replaced = repo
            .replace_user_session(Session::new("u1".into(), &pair("a2", "r2")))
            .await
            .unwrap();

        assert_eq!(replaced, 1);
        assert!(repo.find_by_refresh_token("r1").await.unwrap().is_none());
        assert!(repo.find_by_refresh_token("r2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotate_tokens() {
        let repo = MokaSessionRepository::with_defaults();
        repo.replace_user_session(Session::new("u1".into(), &pair("a1", "r1")))
            .await
            .unwrap();

        let rotated = repo.rotate_tokens("r1", &pair("a2", "r2")).await.unwrap();
        assert_eq!(rotated.unwrap().tokens(), pair("a2", "r2"));

        assert!(repo.rotate_tokens("r1", &pair("a3", "r3")).await.unwrap().is_none());
        assert!(repo
            .find_by_user_and_access_token("u1", "a1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_user_sessions() {
        let repo = MokaSessionRepository::with_defaults();
        repo.replace_user_session(Session::new("u1".into(), &pair("a1", "r1")))
            .await
            .unwrap();

        assert_eq!(repo.delete_user_sessions("u1").await.unwrap(), 1);
        assert_eq!(repo.delete_user_sessions("u1").await.unwrap(), 0);
        assert!(repo.get_user_session("u1").await.unwrap().is_none());
        assert!(repo.find_by_refresh_token("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_with_ttl() {
        let repo = MokaSessionRepository::new(None, Some(Duration::from_millis(50)));
        repo.replace_user_session(Session::new("u1".into(), &pair("a1", "r1")))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(repo.get_user_session("u1").await.unwrap().is_none());
        assert!(repo.find_by_refresh_token("r1").await.unwrap().is_none());
    }
}
