use chrono::Utc;
use tracing::info;

use super::model::{AccessLevel, Permission};
use crate::error::CoreResult;
use crate::store::SharedStore;

/// CRUD over `(document, account)` grants.
#[derive(Clone)]
pub struct PermissionService {
    store: SharedStore,
}

impl PermissionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, document_id: &str, account_id: &str) -> CoreResult<Option<Permission>> {
        Ok(self.store.find_permission(document_id, account_id).await?)
    }

    /// Create the grant, or change its level. `granted_by` and `created_at` of an
    /// existing grant are kept.
    pub async fn upsert(
        &self,
        document_id: &str,
        account_id: &str,
        level: AccessLevel,
        granted_by: &str,
    ) -> CoreResult<Permission> {
        let row = Permission::new(document_id, account_id, level, granted_by, Utc::now());
        Ok(self.store.upsert_permission(&row).await?)
    }

    /// Idempotent.
    pub async fn delete(&self, document_id: &str, account_id: &str) -> CoreResult<()> {
        Ok(self.store.delete_permission(document_id, account_id).await?)
    }

    pub async fn list_by_document(&self, document_id: &str) -> CoreResult<Vec<Permission>> {
        Ok(self.store.list_document_permissions(document_id).await?)
    }

    pub async fn list_by_account(&self, account_id: &str) -> CoreResult<Vec<Permission>> {
        Ok(self.store.list_account_permissions(account_id).await?)
    }

    /// Move a grant from `from_id` to `to_id` atomically. No-op without a source row.
    pub async fn migrate(
        &self,
        document_id: &str,
        from_id: &str,
        to_id: &str,
    ) -> CoreResult<Option<Permission>> {
        let migrated = self
            .store
            .migrate_permission(document_id, from_id, to_id, Utc::now())
            .await?;
        if let Some(row) = &migrated {
            info!(
                document_id,
                from = from_id,
                to = to_id,
                level = %row.level,
                "permission migrated"
            );
        }
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn upsert_then_delete_is_idempotent() {
        let permissions = PermissionService::new(Arc::new(MemoryStore::new()));
        permissions
            .upsert("d1", "u2", AccessLevel::Read, "u1")
            .await
            .unwrap();
        let updated = permissions
            .upsert("d1", "u2", AccessLevel::Write, "u3")
            .await
            .unwrap();
        assert_eq!(updated.level, AccessLevel::Write);
        assert_eq!(updated.granted_by, "u1");
        assert_eq!(permissions.list_by_document("d1").await.unwrap().len(), 1);

        permissions.delete("d1", "u2").await.unwrap();
        permissions.delete("d1", "u2").await.unwrap();
        assert!(permissions.get("d1", "u2").await.unwrap().is_none());
    }
}
