//! SurrealDB implementation for credential and session storage
//!
//! Users live in the `users` table keyed by user id; sessions live in the
//! `sessions` table keyed by the owning user id, which makes "at most one
//! refresh token per user" a property of the record key itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sked_core::{
    CredentialStore, DatabaseConfig, SessionStore, StoreError, StoreResult, StoredRefreshToken,
    User, UserId,
};
use serde::{Deserialize, Serialize};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use uuid::Uuid;

/// SurrealDB store implementation
#[derive(Clone)]
pub struct SurrealStore {
    client: Surreal<Client>,
}

impl SurrealStore {
    /// Create a new SurrealDB connection
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        // Remove ws:// or wss:// prefix if present (surrealdb crate adds it automatically)
        let url = config
            .surrealdb_url
            .strip_prefix("ws://")
            .or_else(|| config.surrealdb_url.strip_prefix("wss://"))
            .unwrap_or(&config.surrealdb_url);

        let client = Surreal::new::<Ws>(url)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("SurrealDB connection failed: {e}")))?;

        client
            .signin(Root {
                username: &config.surrealdb_user,
                password: &config.surrealdb_pass,
            })
            .await
            .map_err(|e| StoreError::DatabaseError(format!("SurrealDB auth failed: {e}")))?;

        client
            .use_ns(&config.surrealdb_namespace)
            .use_db(&config.surrealdb_database)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("SurrealDB namespace error: {e}")))?;

        tracing::info!(
            url = %config.surrealdb_url,
            namespace = %config.surrealdb_namespace,
            database = %config.surrealdb_database,
            "Connected to SurrealDB"
        );

        Ok(Self { client })
    }

    /// Initialize schema (idempotent, run on startup)
    pub async fn init_schema(&self) -> StoreResult<()> {
        self.client
            .query(
                r#"
                DEFINE TABLE IF NOT EXISTS users SCHEMALESS;
                DEFINE INDEX IF NOT EXISTS idx_users_email ON users FIELDS email UNIQUE;
                DEFINE INDEX IF NOT EXISTS idx_users_activation_link ON users FIELDS activation_link UNIQUE;
                DEFINE TABLE IF NOT EXISTS sessions SCHEMALESS;
                DEFINE INDEX IF NOT EXISTS idx_sessions_refresh_token ON sessions FIELDS refresh_token UNIQUE;
            "#,
            )
            .await
            .and_then(|response| response.check())
            .map_err(|e| StoreError::DatabaseError(format!("Schema init failed: {e}")))?;

        Ok(())
    }

    async fn select_user(&self, field: &'static str, value: String) -> StoreResult<Option<User>> {
        let query = format!("SELECT * FROM users WHERE {field} = $value LIMIT 1");
        let records: Vec<UserRecord> = self
            .client
            .query(query)
            .bind(("value", value))
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| StoreError::DatabaseError(format!("Result extraction failed: {e}")))?;

        records.into_iter().next().map(User::try_from).transpose()
    }
}

/// User record for SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    #[serde(default, skip_serializing)]
    id: Option<surrealdb::sql::Thing>,
    uid: String,
    email: String,
    password_hash: String,
    is_activated: bool,
    activation_link: String,
    created_at: DateTime<Utc>,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: None,
            uid: user.id.to_string(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            is_activated: user.is_activated,
            activation_link: user.activation_link.clone(),
            created_at: user.created_at,
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = StoreError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uid(&record.uid)?,
            email: record.email,
            password_hash: record.password_hash,
            is_activated: record.is_activated,
            activation_link: record.activation_link,
            created_at: record.created_at,
        })
    }
}

/// Session record for SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default, skip_serializing)]
    id: Option<surrealdb::sql::Thing>,
    user_id: String,
    refresh_token: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRecord> for StoredRefreshToken {
    type Error = StoreError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        Ok(StoredRefreshToken {
            user_id: parse_uid(&record.user_id)?,
            refresh_token: record.refresh_token,
            updated_at: record.updated_at,
        })
    }
}

fn parse_uid(uid: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(uid)
        .map_err(|e| StoreError::DatabaseError(format!("Invalid record id {uid}: {e}")))
}

/// Map a write failure, surfacing unique index violations as conflicts
fn map_write_error(e: surrealdb::Error, context: &str) -> StoreError {
    let message = e.to_string();
    if message.contains("already contains") || message.contains("already exists") {
        StoreError::Conflict(message)
    } else {
        StoreError::DatabaseError(format!("{context}: {message}"))
    }
}

#[async_trait]
impl CredentialStore for SurrealStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        self.client
            .query("CREATE type::thing('users', $uid) CONTENT $record RETURN NONE")
            .bind(("uid", user.id.to_string()))
            .bind(("record", UserRecord::from(user)))
            .await
            .and_then(|response| response.check())
            .map_err(|e| map_write_error(e, "Failed to create user"))?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.select_user("email", email.to_string()).await
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        // Record key lookup, no table scan
        let record: Option<UserRecord> = self
            .client
            .select(("users", id.to_string()))
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Select failed: {e}")))?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_activation_link(&self, link: &str) -> StoreResult<Option<User>> {
        self.select_user("activation_link", link.to_string()).await
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let updated: Vec<UserRecord> = self
            .client
            .query(
                r#"
                UPDATE type::thing('users', $uid) MERGE {
                    email: $email,
                    password_hash: $password_hash,
                    is_activated: $is_activated
                }
            "#,
            )
            .bind(("uid", user.id.to_string()))
            .bind(("email", user.email.clone()))
            .bind(("password_hash", user.password_hash.clone()))
            .bind(("is_activated", user.is_activated))
            .await
            .map_err(|e| map_write_error(e, "Failed to save user"))?
            .take(0)
            .map_err(|e| map_write_error(e, "Failed to save user"))?;

        if updated.is_empty() {
            return Err(StoreError::DatabaseError(format!(
                "user {} does not exist",
                user.id
            )));
        }
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let records: Vec<UserRecord> = self
            .client
            .query("SELECT * FROM users ORDER BY created_at ASC")
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| StoreError::DatabaseError(format!("Result extraction failed: {e}")))?;

        records.into_iter().map(User::try_from).collect()
    }
}

#[async_trait]
impl SessionStore for SurrealStore {
    async fn save_token(
        &self,
        user_id: UserId,
        refresh_token: &str,
    ) -> StoreResult<StoredRefreshToken> {
        let stored = StoredRefreshToken::new(user_id, refresh_token.to_string());

        self.client
            .query(
                r#"
                UPSERT type::thing('sessions', $user_id) CONTENT {
                    user_id: $user_id,
                    refresh_token: $refresh_token,
                    updated_at: $updated_at
                } RETURN NONE
            "#,
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("refresh_token", stored.refresh_token.clone()))
            .bind(("updated_at", stored.updated_at))
            .await
            .and_then(|response| response.check())
            .map_err(|e| map_write_error(e, "Failed to save refresh token"))?;

        Ok(stored)
    }

    async fn find_token(&self, refresh_token: &str) -> StoreResult<Option<StoredRefreshToken>> {
        let records: Vec<SessionRecord> = self
            .client
            .query("SELECT * FROM sessions WHERE refresh_token = $refresh_token LIMIT 1")
            .bind(("refresh_token", refresh_token.to_string()))
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| StoreError::DatabaseError(format!("Result extraction failed: {e}")))?;

        records
            .into_iter()
            .next()
            .map(StoredRefreshToken::try_from)
            .transpose()
    }

    async fn remove_token(
        &self,
        refresh_token: &str,
    ) -> StoreResult<Option<StoredRefreshToken>> {
        let removed: Vec<SessionRecord> = self
            .client
            .query("DELETE sessions WHERE refresh_token = $refresh_token RETURN BEFORE")
            .bind(("refresh_token", refresh_token.to_string()))
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Delete failed: {e}")))?
            .take(0)
            .map_err(|e| StoreError::DatabaseError(format!("Result extraction failed: {e}")))?;

        removed
            .into_iter()
            .next()
            .map(StoredRefreshToken::try_from)
            .transpose()
    }

    async fn replace_token(
        &self,
        user_id: UserId,
        previous: &str,
        next: &str,
    ) -> StoreResult<bool> {
        // Single-record conditional UPDATE: the WHERE check and the write run
        // in the same statement transaction.
        let updated: Vec<SessionRecord> = self
            .client
            .query(
                r#"
                UPDATE type::thing('sessions', $user_id)
                SET refresh_token = $next, updated_at = $updated_at
                WHERE refresh_token = $previous
                RETURN AFTER
            "#,
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("previous", previous.to_string()))
            .bind(("next", next.to_string()))
            .bind(("updated_at", Utc::now()))
            .await
            .map_err(|e| map_write_error(e, "Failed to rotate refresh token"))?
            .take(0)
            .map_err(|e| map_write_error(e, "Failed to rotate refresh token"))?;

        Ok(!updated.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect() -> SurrealStore {
        let store = SurrealStore::connect(&DatabaseConfig {
            surrealdb_database: format!("test_{}", Uuid::new_v4().simple()),
            ..Default::default()
        })
        .await
        .expect("SurrealDB must be running on ws://localhost:8000");
        store.init_schema().await.unwrap();
        store
    }

    fn user(email: &str) -> User {
        User::new(
            email.to_string(),
            "hash".to_string(),
            Uuid::new_v4().simple().to_string(),
        )
    }

    #[test]
    fn test_user_record_round_trip() {
        let mut u = user("a@x.com");
        u.activate();

        let record = UserRecord::from(&u);
        assert_eq!(record.uid, u.id.to_string());

        let back = User::try_from(record).unwrap();
        assert_eq!(back, u);
    }

    #[test]
    fn test_invalid_uid_rejected() {
        let record = SessionRecord {
            id: None,
            user_id: "not-a-uuid".to_string(),
            refresh_token: "t".to_string(),
            updated_at: Utc::now(),
        };
        assert!(StoredRefreshToken::try_from(record).is_err());
    }

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_user_lifecycle() {
        let store = connect().await;
        let mut u = user("a@x.com");
        store.create_user(&u).await.unwrap();

        let duplicate = store.create_user(&user("a@x.com")).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        u.activate();
        store.save_user(&u).await.unwrap();

        let loaded = store
            .find_by_activation_link(&u.activation_link)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.is_activated);
        assert_eq!(store.find_by_id(u.id).await.unwrap().unwrap().email, "a@x.com");
    }

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_find_by_id_uses_record_key() {
        let store = connect().await;
        let u = user("key@x.com");
        store.create_user(&u).await.unwrap();

        let loaded = store.find_by_id(u.id).await.unwrap().unwrap();
        assert_eq!(loaded, u);
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());

        // The record id is the user id itself
        let keyed: Option<UserRecord> = store
            .client
            .query("SELECT * FROM type::thing('users', $uid)")
            .bind(("uid", u.id.to_string()))
            .await
            .unwrap()
            .take(0)
            .unwrap();
        assert_eq!(keyed.map(|r| r.uid), Some(u.id.to_string()));
    }

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_session_rotation() {
        let store = connect().await;
        let user_id = Uuid::new_v4();

        store.save_token(user_id, "r1").await.unwrap();
        store.save_token(user_id, "r2").await.unwrap();
        assert!(store.find_token("r1").await.unwrap().is_none());

        assert!(store.replace_token(user_id, "r2", "r3").await.unwrap());
        assert!(!store.replace_token(user_id, "r2", "r4").await.unwrap());

        let removed = store.remove_token("r3").await.unwrap();
        assert_eq!(removed.map(|r| r.user_id), Some(user_id));
        assert!(store.remove_token("r3").await.unwrap().is_none());
    }
}
