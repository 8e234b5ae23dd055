use super::models::{Session, TokenPair, User};
use super::repository::{SessionRepository, UserRepository};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{Error, Result};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

const USERS_TREE: &str = "users";
const USERS_BY_USERNAME_TREE: &str = "users_by_username";
const SESSIONS_TREE: &str = "sessions";
const SESSIONS_BY_REFRESH_TREE: &str = "sessions_by_refresh";

/// Open (or create) the sled database holding users and sessions.
/// Creates the parent directory if it doesn't exist.
pub fn open_db(path: impl AsRef<Path>) -> Result<Db> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
    }

    sled::open(path).map_err(storage_err)
}

fn storage_err(err: sled::Error) -> Error {
    Error::Storage(err.to_string())
}

fn tx_err(err: TransactionError<Error>) -> Error {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => storage_err(e),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
}

fn abort<T>(err: Error) -> ConflictableTransactionResult<T, Error> {
    Err(ConflictableTransactionError::Abort(err))
}

fn decode_in_tx<T: DeserializeOwned>(bytes: &[u8]) -> ConflictableTransactionResult<T, Error> {
    decode(bytes).or_else(abort)
}

#[derive(Clone)]
pub struct SledUserRepository {
    db: Db,
    users: Tree,
    users_by_username: Tree,
}

impl SledUserRepository {
    pub fn new(db: Db) -> Result<Self> {
        let users = db.open_tree(USERS_TREE).map_err(storage_err)?;
        let users_by_username = db.open_tree(USERS_BY_USERNAME_TREE).map_err(storage_err)?;
        Ok(Self {
            db,
            users,
            users_by_username,
        })
    }
}

#[async_trait]
impl UserRepository for SledUserRepository {
    async fn create(&self, user: User) -> Result<User> {
        let user_json = encode(&user)?;

        (&self.users, &self.users_by_username)
            .transaction(|(users, by_username)| {
                if by_username.get(user.username.as_bytes())?.is_some() {
                    return abort(Error::Conflict(format!(
                        "username '{}' already exists",
                        user.username
                    )));
                }

                // Store user by ID
                users.insert(user.id.as_bytes(), user_json.as_slice())?;

                // Store ID by username for lookups
                by_username.insert(user.username.as_bytes(), user.id.as_bytes())?;

                Ok(())
            })
            .map_err(tx_err)?;

        self.db.flush().map_err(storage_err)?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        // First, get the user ID from username index
        let Some(user_id) = self
            .users_by_username
            .get(username.as_bytes())
            .map_err(storage_err)?
        else {
            return Ok(None);
        };

        match self.users.get(&user_id).map_err(storage_err)? {
            Some(user_data) => Ok(Some(decode(&user_data)?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        match self.users.get(id.as_bytes()).map_err(storage_err)? {
            Some(user_data) => Ok(Some(decode(&user_data)?)),
            None => Ok(None),
        }
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        self.users_by_username
            .contains_key(username.as_bytes())
            .map_err(storage_err)
    }
}

/// Sessions keyed by user id, so a user can never hold more than one.
/// A secondary index maps the current refresh token back to its user.
#[derive(Clone)]
pub struct SledSessionRepository {
    db: Db,
    sessions: Tree,
    sessions_by_refresh: Tree,
}

impl SledSessionRepository {
    pub fn new(db: Db) -> Result<Self> {
        let sessions = db.open_tree(SESSIONS_TREE).map_err(storage_err)?;
        let sessions_by_refresh = db.open_tree(SESSIONS_BY_REFRESH_TREE).map_err(storage_err)?;
        Ok(Self {
            db,
            sessions,
            sessions_by_refresh,
        })
    }
}

#[async_trait]
impl SessionRepository for SledSessionRepository {
    async fn replace_user_session(&self, session: Session) -> Result<usize> {
        let session_json = encode(&session)?;

        let replaced = (&self.sessions, &self.sessions_by_refresh)
            .transaction(|(sessions, by_refresh)| {
                let previous = sessions.insert(session.user_id.as_bytes(), session_json.as_slice())?;

                let replaced = match previous {
                    Some(bytes) => {
                        let old: Session = decode_in_tx(&bytes)?;
                        by_refresh.remove(old.refresh_token.as_bytes())?;
                        1
                    }
                    None => 0,
                };

                by_refresh.insert(session.refresh_token.as_bytes(), session.user_id.as_bytes())?;
                Ok(replaced)
            })
            .map_err(tx_err)?;

        self.db.flush().map_err(storage_err)?;
        Ok(replaced)
    }

    async fn find_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Session>> {
        let Some(user_id) = self
            .sessions_by_refresh
            .get(refresh_token.as_bytes())
            .map_err(storage_err)?
        else {
            return Ok(None);
        };

        let session = match self.sessions.get(&user_id).map_err(storage_err)? {
            Some(bytes) => decode::<Session>(&bytes)?,
            None => return Ok(None),
        };

        Ok(Some(session).filter(|s| s.refresh_token == refresh_token))
    }

    async fn find_by_user_and_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<Session>> {
        Ok(self
            .get_user_session(user_id)
            .await?
            .filter(|s| s.access_token == access_token))
    }

    async fn get_user_session(&self, user_id: &str) -> Result<Option<Session>> {
        match self.sessions.get(user_id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn rotate_tokens(
        &self,
        refresh_token: &str,
        tokens: &TokenPair,
    ) -> Result<Option<Session>> {
        let rotated = (&self.sessions, &self.sessions_by_refresh)
            .transaction(|(sessions, by_refresh)| {
                let Some(user_id) = by_refresh.get(refresh_token.as_bytes())? else {
                    return Ok(None);
                };
                let Some(bytes) = sessions.get(&user_id)? else {
                    return Ok(None);
                };

                let mut session: Session = decode_in_tx(&bytes)?;
                if session.refresh_token != refresh_token {
                    return Ok(None);
                }

                session.rotate(tokens);
                let session_json = encode(&session).or_else(abort)?;

                sessions.insert(session.user_id.as_bytes(), session_json)?;
                by_refresh.remove(refresh_token.as_bytes())?;
                by_refresh.insert(session.refresh_token.as_bytes(), session.user_id.as_bytes())?;

                Ok(Some(session))
            })
            .map_err(tx_err)?;

        if rotated.is_some() {
            self.db.flush().map_err(storage_err)?;
        }
        Ok(rotated)
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize> {
        let deleted = (&self.sessions, &self.sessions_by_refresh)
            .transaction(|(sessions, by_refresh)| match sessions.remove(user_id.as_bytes())? {
                Some(bytes) => {
                    let old: Session = decode_in_tx(&bytes)?;
                    by_refresh.remove(old.refresh_token.as_bytes())?;
                    Ok(1)
                }
                None => Ok(0),
            })
            .map_err(tx_err)?;

        if deleted > 0 {
            self.db.flush().map_err(storage_err)?;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use tempfile::TempDir;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    fn open_repos(dir: &TempDir) -> (SledUserRepository, SledSessionRepository) {
        let db = open_db(dir.path().join("gatekeep.sled")).unwrap();
        (
            SledUserRepository::new(db.clone()).unwrap(),
            SledSessionRepository::new(db).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_user_repository() {
        let temp_dir = TempDir::new().unwrap();
        let (repo, _) = open_repos(&temp_dir);

        let user = User::new("testuser".to_string(), "hash123".to_string(), Role::User);

        let created = repo.create(user).await.unwrap();
        assert_eq!(created.username, "testuser");

        let found = repo.find_by_username("testuser").await.unwrap();
        assert_eq!(found.unwrap().id, created.id);

        let found_by_id = repo.find_by_id(&created.id).await.unwrap();
        assert_eq!(found_by_id.unwrap().role, Role::User);

        assert!(repo.username_exists("testuser").await.unwrap());
        assert!(!repo.username_exists("nobody").await.unwrap());
        assert!(repo.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        let (repo, _) = open_repos(&temp_dir);

        repo.create(User::new("alice".into(), "h1".into(), Role::User))
            .await
            .unwrap();
        let second = repo
            .create(User::new("alice".into(), "h2".into(), Role::Admin))
            .await;

        assert!(matches!(second, Err(Error::Conflict(_))));
        let stored = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "h1");
    }

    #[tokio::test]
    async fn test_users_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let id = {
            let (repo, _) = open_repos(&temp_dir);
            repo.create(User::new("alice".into(), "h1".into(), Role::Admin))
                .await
                .unwrap()
                .id
        };

        let (repo, _) = open_repos(&temp_dir);
        let user = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_replace_keeps_single_session() {
        let temp_dir = TempDir::new().unwrap();
        let (_, sessions) = open_repos(&temp_dir);

        let first = Session::new("u1".into(), &pair("a1", "r1"));
        assert_eq!(sessions.replace_user_session(first).await.unwrap(), 0);

        let second = Session::new("u1".into(), &pair("a2", "r2"));
        assert_eq!(sessions.replace_user_session(second).await.unwrap(), 1);

        assert!(sessions.find_by_refresh_token("r1").await.unwrap().is_none());
        assert!(sessions
            .find_by_user_and_access_token("u1", "a1")
            .await
            .unwrap()
            .is_none());
        let current = sessions.get_user_session("u1").await.unwrap().unwrap();
        assert_eq!(current.tokens(), pair("a2", "r2"));
    }

    #[tokio::test]
    async fn test_rotate_tokens_is_single_use() {
        let temp_dir = TempDir::new().unwrap();
        let (_, sessions) = open_repos(&temp_dir);
        let original = Session::new("u1".into(), &pair("a1", "r1"));
        sessions.replace_user_session(original.clone()).await.unwrap();

        let rotated = sessions
            .rotate_tokens("r1", &pair("a2", "r2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rotated.id, original.id);
        assert_eq!(rotated.tokens(), pair("a2", "r2"));

        // The old refresh token no longer names a session
        assert!(sessions
            .rotate_tokens("r1", &pair("a3", "r3"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            sessions.find_by_refresh_token("r2").await.unwrap().unwrap().id,
            original.id
        );
    }

    #[tokio::test]
    async fn test_delete_user_sessions() {
        let temp_dir = TempDir::new().unwrap();
        let (_, sessions) = open_repos(&temp_dir);
        sessions
            .replace_user_session(Session::new("u1".into(), &pair("a1", "r1")))
            .await
            .unwrap();
        sessions
            .replace_user_session(Session::new("u2".into(), &pair("b1", "s1")))
            .await
            .unwrap();

        assert_eq!(sessions.delete_user_sessions("u1").await.unwrap(), 1);
        assert_eq!(sessions.delete_user_sessions("u1").await.unwrap(), 0);

        assert!(sessions.find_by_refresh_token("r1").await.unwrap().is_none());
        assert!(sessions.get_user_session("u2").await.unwrap().is_some());
    }
}
