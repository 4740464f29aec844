//! In-memory store implementation
//!
//! Keeps users and sessions in `RwLock`-guarded maps. Every trait method takes
//! the lock once, so each operation is atomic with respect to the others.

use async_trait::async_trait;
use sked_core::{
    CredentialStore, SessionStore, StoreError, StoreResult, StoredRefreshToken, User, UserId,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local credential and session store
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    sessions: RwLock<HashMap<UserId, StoredRefreshToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already exists",
                user.email
            )));
        }
        if users
            .values()
            .any(|u| u.activation_link == user.activation_link)
        {
            return Err(StoreError::Conflict("activation link already exists".to_string()));
        }
        if users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_activation_link(&self, link: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.activation_link == link).cloned())
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::DatabaseError(format!(
                "user {} does not exist",
                user.id
            ))),
        }
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_token(
        &self,
        user_id: UserId,
        refresh_token: &str,
    ) -> StoreResult<StoredRefreshToken> {
        let record = StoredRefreshToken::new(user_id, refresh_token.to_string());
        self.sessions.write().await.insert(user_id, record.clone());
        Ok(record)
    }

    async fn find_token(&self, refresh_token: &str) -> StoreResult<Option<StoredRefreshToken>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|s| s.refresh_token == refresh_token)
            .cloned())
    }

    async fn remove_token(
        &self,
        refresh_token: &str,
    ) -> StoreResult<Option<StoredRefreshToken>> {
        let mut sessions = self.sessions.write().await;
        let owner = sessions
            .iter()
            .find(|(_, s)| s.refresh_token == refresh_token)
            .map(|(user_id, _)| *user_id);

        Ok(owner.and_then(|user_id| sessions.remove(&user_id)))
    }

    async fn replace_token(
        &self,
        user_id: UserId,
        previous: &str,
        next: &str,
    ) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&user_id) {
            Some(record) if record.refresh_token == previous => {
                *record = StoredRefreshToken::new(user_id, next.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
