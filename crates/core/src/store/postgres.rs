//! PostgreSQL store. Multi-record operations run in a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    AccountRepo, DocumentRepo, PermissionRepo, Store, StoreError, StoreResult, VersionRepo,
    IN_QUERY_LIMIT,
};
use crate::account::Account;
use crate::document::{Document, DocumentChanges};
use crate::permission::Permission;
use crate::version::Version;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Map unique violations to `Conflict`, everything else to `Database`.
fn conflict_or(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what()),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl AccountRepo for PgStore {
    async fn find_account(&self, id: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1 LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn scan_account_by_email(&self, normalized_email: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE lower(email) = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(normalized_email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_account(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, email, display_name, avatar_ref, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                 email = EXCLUDED.email,
                 display_name = EXCLUDED.display_name,
                 avatar_ref = EXCLUDED.avatar_ref,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.avatar_ref)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_or(e, || {
                format!("email {} already belongs to another account", account.email)
            })
        })?;
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search_accounts(
        &self,
        prefix: &str,
        exclude_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts
             WHERE id <> $2
               AND (starts_with(lower(display_name), $1) OR starts_with(lower(email), $1))
             ORDER BY starts_with(lower(display_name), $1) DESC, display_name, id
             LIMIT $3",
        )
        .bind(prefix)
        .bind(exclude_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl DocumentRepo for PgStore {
    async fn find_document(&self, id: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_document(&self, doc: &Document) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO documents (id, title, body, owner_id, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.body)
        .bind(&doc.owner_id)
        .bind(doc.archived)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, || format!("document {} exists", doc.id)))?;
        Ok(())
    }

    async fn update_document(
        &self,
        id: &str,
        changes: &DocumentChanges,
    ) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, Document>(
            "UPDATE documents SET
                 title = COALESCE($2, title),
                 body = COALESCE($3, body),
                 archived = COALESCE($4, archived),
                 updated_at = $5
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.body)
        .bind(changes.archived)
        .bind(changes.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_owned_documents(&self, owner_id: &str) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE owner_id = $1 ORDER BY updated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_documents_in(&self, ids: &[String]) -> StoreResult<Vec<Document>> {
        if ids.len() > IN_QUERY_LIMIT {
            return Err(StoreError::Unsupported(format!(
                "IN query with {} ids, limit is {IN_QUERY_LIMIT}",
                ids.len()
            )));
        }
        let rows = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete_document_cascade(&self, id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM permissions WHERE document_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PermissionRepo for PgStore {
    async fn find_permission(
        &self,
        document_id: &str,
        account_id: &str,
    ) -> StoreResult<Option<Permission>> {
        let row = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE document_id = $1 AND account_id = $2",
        )
        .bind(document_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_permission(&self, permission: &Permission) -> StoreResult<Permission> {
        let row = sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions
                 (document_id, account_id, level, granted_by, migrated_from, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (document_id, account_id) DO UPDATE SET
                 level = EXCLUDED.level,
                 updated_at = EXCLUDED.updated_at
             RETURNING *",
        )
        .bind(&permission.document_id)
        .bind(&permission.account_id)
        .bind(permission.level)
        .bind(&permission.granted_by)
        .bind(&permission.migrated_from)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_permission(&self, document_id: &str, account_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM permissions WHERE document_id = $1 AND account_id = $2")
            .bind(document_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_document_permissions(&self, document_id: &str) -> StoreResult<Vec<Permission>> {
        let rows =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE document_id = $1")
                .bind(document_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn list_account_permissions(&self, account_id: &str) -> StoreResult<Vec<Permission>> {
        let rows =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE account_id = $1")
                .bind(account_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn migrate_permission(
        &self,
        document_id: &str,
        from_id: &str,
        to_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Permission>> {
        let mut tx = self.pool.begin().await?;

        let source = sqlx::query_as::<_, Permission>(
            "DELETE FROM permissions WHERE document_id = $1 AND account_id = $2 RETURNING *",
        )
        .bind(document_id)
        .bind(from_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(source) = source else {
            tx.rollback().await?;
            return Ok(None);
        };

        let row = sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions
                 (document_id, account_id, level, granted_by, migrated_from, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             ON CONFLICT (document_id, account_id) DO UPDATE SET
                 level = GREATEST(permissions.level, EXCLUDED.level),
                 migrated_from = EXCLUDED.migrated_from,
                 updated_at = EXCLUDED.updated_at
             RETURNING *",
        )
        .bind(document_id)
        .bind(to_id)
        .bind(source.level)
        .bind(&source.granted_by)
        .bind(from_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }
}

#[async_trait]
impl VersionRepo for PgStore {
    async fn list_versions(&self, document_id: &str) -> StoreResult<Vec<Version>> {
        let rows = sqlx::query_as::<_, Version>("SELECT * FROM versions WHERE document_id = $1")
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_version(&self, version: &Version) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO versions
                 (id, document_id, title, body, version_number, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(version.id)
        .bind(&version.document_id)
        .bind(&version.title)
        .bind(&version.body)
        .bind(version.version_number)
        .bind(&version.created_by)
        .bind(version.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_or(e, || {
                format!(
                    "version {} of document {} exists",
                    version.version_number, version.document_id
                )
            })
        })?;
        Ok(())
    }

    async fn find_version(
        &self,
        document_id: &str,
        version_number: i64,
    ) -> StoreResult<Option<Version>> {
        let row = sqlx::query_as::<_, Version>(
            "SELECT * FROM versions WHERE document_id = $1 AND version_number = $2",
        )
        .bind(document_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
