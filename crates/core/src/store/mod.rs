//! Backing store abstraction.
//!
//! The engine talks to a key/document database through four repository traits,
//! combined into [`Store`] and injected into every service as [`SharedStore`].
//! Implementations guarantee per-record strong consistency and make the two
//! multi-record operations (`delete_document_cascade`, `migrate_permission`)
//! atomic. Nothing else spans records.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::account::Account;
use crate::document::{Document, DocumentChanges};
use crate::permission::Permission;
use crate::version::Version;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Maximum number of ids accepted by one "IN" query.
pub const IN_QUERY_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unsupported query: {0}")]
    Unsupported(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn find_account(&self, id: &str) -> StoreResult<Option<Account>>;

    /// Exact match on the stored email.
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Case-insensitive match over all accounts. Cost grows with the table.
    async fn scan_account_by_email(&self, normalized_email: &str) -> StoreResult<Option<Account>>;

    /// Create or replace. Fails with `Conflict` if another account holds the email.
    async fn put_account(&self, account: &Account) -> StoreResult<()>;

    async fn delete_account(&self, id: &str) -> StoreResult<()>;

    /// Accounts whose lowercased display name or email starts with `prefix`,
    /// name matches first, without duplicates.
    async fn search_accounts(
        &self,
        prefix: &str,
        exclude_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<Account>>;
}

#[async_trait]
pub trait DocumentRepo: Send + Sync {
    async fn find_document(&self, id: &str) -> StoreResult<Option<Document>>;

    async fn insert_document(&self, doc: &Document) -> StoreResult<()>;

    /// Apply the given field changes; returns the updated document, `None` if absent.
    async fn update_document(
        &self,
        id: &str,
        changes: &DocumentChanges,
    ) -> StoreResult<Option<Document>>;

    async fn list_owned_documents(&self, owner_id: &str) -> StoreResult<Vec<Document>>;

    /// Documents among `ids`; at most [`IN_QUERY_LIMIT`] ids per call.
    async fn find_documents_in(&self, ids: &[String]) -> StoreResult<Vec<Document>>;

    /// Atomically delete a document and every permission row on it.
    async fn delete_document_cascade(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait PermissionRepo: Send + Sync {
    async fn find_permission(
        &self,
        document_id: &str,
        account_id: &str,
    ) -> StoreResult<Option<Permission>>;

    /// Insert, or on an existing key update only `level` and `updated_at`.
    /// Returns the stored row.
    async fn upsert_permission(&self, permission: &Permission) -> StoreResult<Permission>;

    async fn delete_permission(&self, document_id: &str, account_id: &str) -> StoreResult<()>;

    async fn list_document_permissions(&self, document_id: &str) -> StoreResult<Vec<Permission>>;

    async fn list_account_permissions(&self, account_id: &str) -> StoreResult<Vec<Permission>>;

    /// Atomically re-key the `(document_id, from_id)` row to `to_id` and delete the
    /// source. If `to_id` already holds a row it keeps the higher level. Returns the
    /// resulting row, or `None` when there was no source row.
    async fn migrate_permission(
        &self,
        document_id: &str,
        from_id: &str,
        to_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Permission>>;
}

#[async_trait]
pub trait VersionRepo: Send + Sync {
    async fn list_versions(&self, document_id: &str) -> StoreResult<Vec<Version>>;

    /// Fails with `Conflict` if the document already has this version number.
    async fn insert_version(&self, version: &Version) -> StoreResult<()>;

    async fn find_version(
        &self,
        document_id: &str,
        version_number: i64,
    ) -> StoreResult<Option<Version>>;
}

/// Combined backing store.
#[async_trait]
pub trait Store: AccountRepo + DocumentRepo + PermissionRepo + VersionRepo {
    async fn health_check(&self) -> StoreResult<()>;
}

pub type SharedStore = Arc<dyn Store>;
