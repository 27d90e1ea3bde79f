use tracing::{debug, info};

use crate::error::CoreResult;
use crate::identity::{derive_placeholder_id, AccountIdKind};
use crate::permission::{AccessLevel, PermissionService};
use crate::store::SharedStore;

/// Migration of grants made to a placeholder id onto the account that later
/// registered with the matching email.
#[derive(Clone)]
pub struct PendingShares {
    store: SharedStore,
}

impl PendingShares {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Placeholder id the account's email would have been shared under.
    async fn placeholder_for(&self, account_id: &str) -> CoreResult<Option<String>> {
        if AccountIdKind::parse(account_id).is_placeholder() {
            return Ok(None);
        }
        let Some(account) = self.store.find_account(account_id).await? else {
            return Ok(None);
        };
        Ok(derive_placeholder_id(&account.email)
            .ok()
            .filter(|placeholder_id| placeholder_id != account_id))
    }

    /// Migrate the pending grant on one document, if any. Returns the level now
    /// held by `account_id`.
    pub async fn resolve(
        &self,
        document_id: &str,
        account_id: &str,
    ) -> CoreResult<Option<AccessLevel>> {
        let Some(placeholder_id) = self.placeholder_for(account_id).await? else {
            return Ok(None);
        };
        debug!(document_id, account_id, %placeholder_id, "checking for pending share");

        let migrated = PermissionService::new(self.store.clone())
            .migrate(document_id, &placeholder_id, account_id)
            .await?;
        Ok(migrated.map(|row| row.level))
    }

    /// Drop any grant on `document_id` left under the account's placeholder id,
    /// so a direct grant or revoke on the account is the only one that counts.
    pub async fn discard(&self, document_id: &str, account_id: &str) -> CoreResult<()> {
        let Some(placeholder_id) = self.placeholder_for(account_id).await? else {
            return Ok(());
        };
        if self
            .store
            .find_permission(document_id, &placeholder_id)
            .await?
            .is_some()
        {
            self.store
                .delete_permission(document_id, &placeholder_id)
                .await?;
            info!(document_id, account_id, %placeholder_id, "stale pending share dropped");
        }
        Ok(())
    }

    /// Migrate every pending grant of the account. Returns how many moved.
    pub async fn claim_all(&self, account_id: &str) -> CoreResult<usize> {
        let Some(placeholder_id) = self.placeholder_for(account_id).await? else {
            return Ok(0);
        };

        let permissions = PermissionService::new(self.store.clone());
        let pending = permissions.list_by_account(&placeholder_id).await?;
        let mut claimed = 0;
        for row in pending {
            if permissions
                .migrate(&row.document_id, &placeholder_id, account_id)
                .await?
                .is_some()
            {
                claimed += 1;
            }
        }

        if claimed > 0 {
            info!(account_id, %placeholder_id, claimed, "pending shares claimed");
        }
        Ok(claimed)
    }
}
