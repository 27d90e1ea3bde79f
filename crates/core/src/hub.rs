use std::sync::Arc;

use tracing::warn;

use crate::account::{AccountService, NewAccount, Registration};
use crate::document::DocumentService;
use crate::error::CoreResult;
use crate::notify::Notifier;
use crate::permission::PermissionService;
use crate::sharing::SharingService;
use crate::store::SharedStore;
use crate::version::VersionService;

/// Entry point used by the transport layer: every service over one store.
#[derive(Clone)]
pub struct NoteHub {
    pub accounts: AccountService,
    pub documents: DocumentService,
    pub permissions: PermissionService,
    pub versions: VersionService,
    pub sharing: SharingService,
    notifier: Arc<dyn Notifier>,
}

impl NoteHub {
    pub fn new(store: SharedStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            documents: DocumentService::new(store.clone()),
            permissions: PermissionService::new(store.clone()),
            versions: VersionService::new(store.clone()),
            sharing: SharingService::new(store, notifier.clone()),
            notifier,
        }
    }

    /// Create or refresh an account. Newly registered real accounts get a
    /// welcome message; a delivery failure is only logged.
    pub async fn register(&self, data: NewAccount) -> CoreResult<Registration> {
        let registration = self.accounts.create(data).await?;

        let account = &registration.account;
        if registration.created && !account.is_pending {
            if let Err(err) = self
                .notifier
                .notify_welcome(&account.email, &account.display_name)
                .await
            {
                warn!(account_id = %account.id, error = %err, "welcome notification failed");
            }
        }
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MemoryNotifier, SentNotice};
    use crate::store::MemoryStore;

    fn alice() -> NewAccount {
        NewAccount {
            id: "alice".to_string(),
            email: "alice@x.com".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn welcomes_only_new_accounts() {
        let notifier = Arc::new(MemoryNotifier::new());
        let hub = NoteHub::new(Arc::new(MemoryStore::new()), notifier.clone());

        assert!(hub.register(alice()).await.unwrap().created);
        assert!(!hub.register(alice()).await.unwrap().created);

        assert_eq!(
            notifier.sent().await,
            vec![SentNotice::Welcome {
                email: "alice@x.com".to_string(),
                name: "alice".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn welcome_failure_does_not_fail_registration() {
        let hub = NoteHub::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryNotifier::failing()),
        );
        let registration = hub.register(alice()).await.unwrap();
        assert_eq!(registration.account.display_name, "alice");
    }
}
