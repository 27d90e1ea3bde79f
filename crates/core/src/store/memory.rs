//! In-process store used by tests and by the API when no database is configured.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    AccountRepo, DocumentRepo, PermissionRepo, Store, StoreError, StoreResult, VersionRepo,
    IN_QUERY_LIMIT,
};
use crate::account::Account;
use crate::document::{Document, DocumentChanges};
use crate::permission::Permission;
use crate::version::Version;

type PermissionKey = (String, String);

fn key(document_id: &str, account_id: &str) -> PermissionKey {
    (document_id.to_string(), account_id.to_string())
}

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    documents: HashMap<String, Document>,
    permissions: HashMap<PermissionKey, Permission>,
    versions: Vec<Version>,
}

/// All tables behind one lock, so every multi-record operation is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_version_reads: AtomicBool,
    rejected_version_inserts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `list_versions` fail with `Unavailable` until reset.
    pub fn fail_version_reads(&self, fail: bool) {
        self.fail_version_reads.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `insert_version` fail with `Conflict`, as
    /// if another writer had taken the number first.
    pub fn reject_version_inserts(&self, count: usize) {
        self.rejected_version_inserts.store(count, Ordering::SeqCst);
    }

    fn take_rejected_insert(&self) -> bool {
        self.rejected_version_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn find_account(&self, id: &str) -> StoreResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn scan_account_by_email(&self, normalized_email: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.email.to_lowercase() == normalized_email)
            .cloned())
    }

    async fn put_account(&self, account: &Account) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .accounts
            .values()
            .any(|a| a.email == account.email && a.id != account.id);
        if taken {
            return Err(StoreError::Conflict(format!(
                "email {} already belongs to another account",
                account.email
            )));
        }
        tables.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> StoreResult<()> {
        self.tables.write().await.accounts.remove(id);
        Ok(())
    }

    async fn search_accounts(
        &self,
        prefix: &str,
        exclude_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<Account>> {
        let tables = self.tables.read().await;
        let mut candidates: Vec<&Account> = tables
            .accounts
            .values()
            .filter(|a| a.id != exclude_id)
            .collect();
        candidates.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));

        let by_name = candidates
            .iter()
            .filter(|a| a.display_name.to_lowercase().starts_with(prefix));
        let by_email = candidates
            .iter()
            .filter(|a| a.email.to_lowercase().starts_with(prefix));

        let mut seen = HashSet::new();
        Ok(by_name
            .chain(by_email)
            .filter(|a| seen.insert(a.id.clone()))
            .take(limit)
            .map(|a| (*a).clone())
            .collect())
    }
}

#[async_trait]
impl DocumentRepo for MemoryStore {
    async fn find_document(&self, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.tables.read().await.documents.get(id).cloned())
    }

    async fn insert_document(&self, doc: &Document) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.documents.contains_key(&doc.id) {
            return Err(StoreError::Conflict(format!("document {} exists", doc.id)));
        }
        tables.documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        id: &str,
        changes: &DocumentChanges,
    ) -> StoreResult<Option<Document>> {
        let mut tables = self.tables.write().await;
        Ok(tables.documents.get_mut(id).map(|doc| {
            changes.apply(doc);
            doc.clone()
        }))
    }

    async fn list_owned_documents(&self, owner_id: &str) -> StoreResult<Vec<Document>> {
        let tables = self.tables.read().await;
        let mut docs: Vec<Document> = tables
            .documents
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }

    async fn find_documents_in(&self, ids: &[String]) -> StoreResult<Vec<Document>> {
        if ids.len() > IN_QUERY_LIMIT {
            return Err(StoreError::Unsupported(format!(
                "IN query with {} ids, limit is {IN_QUERY_LIMIT}",
                ids.len()
            )));
        }
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.documents.get(id).cloned())
            .collect())
    }

    async fn delete_document_cascade(&self, id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.permissions.retain(|(doc_id, _), _| doc_id != id);
        tables.documents.remove(id);
        Ok(())
    }
}

#[async_trait]
impl PermissionRepo for MemoryStore {
    async fn find_permission(
        &self,
        document_id: &str,
        account_id: &str,
    ) -> StoreResult<Option<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables.permissions.get(&key(document_id, account_id)).cloned())
    }

    async fn upsert_permission(&self, permission: &Permission) -> StoreResult<Permission> {
        let mut tables = self.tables.write().await;
        let row = tables
            .permissions
            .entry(key(&permission.document_id, &permission.account_id))
            .and_modify(|existing| {
                existing.level = permission.level;
                existing.updated_at = permission.updated_at;
            })
            .or_insert_with(|| permission.clone());
        Ok(row.clone())
    }

    async fn delete_permission(&self, document_id: &str, account_id: &str) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .permissions
            .remove(&key(document_id, account_id));
        Ok(())
    }

    async fn list_document_permissions(&self, document_id: &str) -> StoreResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .filter(|p| p.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn list_account_permissions(&self, account_id: &str) -> StoreResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn migrate_permission(
        &self,
        document_id: &str,
        from_id: &str,
        to_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Permission>> {
        let mut tables = self.tables.write().await;
        let Some(source) = tables.permissions.remove(&key(document_id, from_id)) else {
            return Ok(None);
        };

        let row = tables
            .permissions
            .entry(key(document_id, to_id))
            .and_modify(|existing| {
                existing.level = existing.level.max(source.level);
                existing.migrated_from = Some(from_id.to_string());
                existing.updated_at = now;
            })
            .or_insert_with(|| Permission {
                document_id: document_id.to_string(),
                account_id: to_id.to_string(),
                level: source.level,
                granted_by: source.granted_by.clone(),
                migrated_from: Some(from_id.to_string()),
                created_at: now,
                updated_at: now,
            });
        Ok(Some(row.clone()))
    }
}

#[async_trait]
impl VersionRepo for MemoryStore {
    async fn list_versions(&self, document_id: &str) -> StoreResult<Vec<Version>> {
        if self.fail_version_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("version reads disabled".to_string()));
        }
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .iter()
            .filter(|v| v.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn insert_version(&self, version: &Version) -> StoreResult<()> {
        if self.take_rejected_insert() {
            return Err(StoreError::Conflict(format!(
                "version {} of document {} was taken concurrently",
                version.version_number, version.document_id
            )));
        }
        let mut tables = self.tables.write().await;
        let duplicate = tables.versions.iter().any(|v| {
            v.document_id == version.document_id && v.version_number == version.version_number
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "version {} of document {} exists",
                version.version_number, version.document_id
            )));
        }
        tables.versions.push(version.clone());
        Ok(())
    }

    async fn find_version(
        &self,
        document_id: &str,
        version_number: i64,
    ) -> StoreResult<Option<Version>> {
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .iter()
            .find(|v| v.document_id == document_id && v.version_number == version_number)
            .cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::AccessLevel;

    fn permission(doc: &str, account: &str, level: AccessLevel) -> Permission {
        Permission::new(doc, account, level, "owner", Utc::now())
    }

    #[tokio::test]
    async fn upsert_keeps_grant_metadata() {
        let store = MemoryStore::new();
        let first = store
            .upsert_permission(&permission("d1", "a1", AccessLevel::Read))
            .await
            .unwrap();

        let mut second = permission("d1", "a1", AccessLevel::Admin);
        second.granted_by = "someone-else".to_string();
        let stored = store.upsert_permission(&second).await.unwrap();

        assert_eq!(stored.level, AccessLevel::Admin);
        assert_eq!(stored.granted_by, "owner");
        assert_eq!(stored.created_at, first.created_at);
    }

    #[tokio::test]
    async fn migrate_moves_row_and_is_noop_without_source() {
        let store = MemoryStore::new();
        store
            .upsert_permission(&permission("d1", "pending_bob_x_com", AccessLevel::Write))
            .await
            .unwrap();

        let migrated = store
            .migrate_permission("d1", "pending_bob_x_com", "bob123", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(migrated.account_id, "bob123");
        assert_eq!(migrated.level, AccessLevel::Write);
        assert_eq!(migrated.migrated_from.as_deref(), Some("pending_bob_x_com"));
        assert!(store
            .find_permission("d1", "pending_bob_x_com")
            .await
            .unwrap()
            .is_none());

        let again = store
            .migrate_permission("d1", "pending_bob_x_com", "bob123", Utc::now())
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn migrate_keeps_higher_level_on_existing_target() {
        let store = MemoryStore::new();
        store
            .upsert_permission(&permission("d1", "pending_bob_x_com", AccessLevel::Read))
            .await
            .unwrap();
        store
            .upsert_permission(&permission("d1", "bob123", AccessLevel::Write))
            .await
            .unwrap();

        let row = store
            .migrate_permission("d1", "pending_bob_x_com", "bob123", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.level, AccessLevel::Write);
    }

    #[tokio::test]
    async fn in_query_is_bounded() {
        let store = MemoryStore::new();
        let ids: Vec<String> = (0..=IN_QUERY_LIMIT).map(|i| i.to_string()).collect();
        let err = store.find_documents_in(&ids).await.unwrap_err();
        assert!(matches!(err, StoreError::Unsupported(_)));
        assert!(store.find_documents_in(&ids[..IN_QUERY_LIMIT]).await.is_ok());
    }
}
