//! sked Store - Credential and session persistence
//!
//! Provides the document-store backends behind the `CredentialStore` and
//! `SessionStore` traits:
//! - `SurrealStore`: SurrealDB over WebSocket, used in production
//! - `MemoryStore`: process-local maps, used by tests and `--memory` runs

pub mod memory;
pub mod surrealdb_store;

pub use memory::MemoryStore;
pub use surrealdb_store::SurrealStore;
