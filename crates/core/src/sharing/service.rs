use std::sync::Arc;

use tracing::{info, warn};

use super::model::{Collaborator, CollaboratorListing, UNKNOWN_OWNER_NAME};
use super::pending::PendingShares;
use crate::account::{Account, AccountService, NewAccount};
use crate::document::{DocumentService, NEW_DOCUMENT_ID};
use crate::error::{CoreError, CoreResult};
use crate::identity::{derive_placeholder_id, normalize_email};
use crate::notify::{Notifier, ShareNotice};
use crate::permission::{AccessLevel, PermissionService};
use crate::store::SharedStore;
use crate::validate::validate_recipient;

/// Share, revoke and collaborator listing on top of the document, account and
/// permission services.
#[derive(Clone)]
pub struct SharingService {
    store: SharedStore,
    notifier: Arc<dyn Notifier>,
}

impl SharingService {
    pub fn new(store: SharedStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    fn documents(&self) -> DocumentService {
        DocumentService::new(self.store.clone())
    }

    fn accounts(&self) -> AccountService {
        AccountService::new(self.store.clone())
    }

    fn pending(&self) -> PendingShares {
        PendingShares::new(self.store.clone())
    }

    /// Grant `level` on a document to the account registered under `email`, or
    /// to its placeholder when nobody has registered it yet. Requires admin.
    pub async fn share(
        &self,
        document_id: &str,
        caller_id: &str,
        email: &str,
        level: &str,
    ) -> CoreResult<Account> {
        validate_recipient(email)?;
        let level: AccessLevel = level.parse()?;

        let effective = self.documents().authorize(document_id, caller_id).await?;
        if !effective.level.can_admin() {
            return Err(CoreError::Forbidden("admin access required to share"));
        }

        let recipient = self.resolve_recipient(email).await?;
        if recipient.id == caller_id {
            return Err(CoreError::SelfShare);
        }
        if recipient.id == effective.document.owner_id {
            return Err(CoreError::OwnerProtected);
        }

        PermissionService::new(self.store.clone())
            .upsert(document_id, &recipient.id, level, caller_id)
            .await?;
        if !recipient.is_pending {
            self.pending().discard(document_id, &recipient.id).await?;
        }
        info!(
            document_id,
            caller_id,
            recipient_id = %recipient.id,
            pending = recipient.is_pending,
            %level,
            "document shared"
        );

        let sender_name = match self.store.find_account(caller_id).await {
            Ok(Some(caller)) => caller.display_name,
            _ => UNKNOWN_OWNER_NAME.to_string(),
        };
        let notice = ShareNotice {
            recipient_email: recipient.email.clone(),
            sender_name,
            document_title: effective.document.title,
            document_id: document_id.to_string(),
            level,
        };
        if let Err(err) = self.notifier.notify_share(&notice).await {
            warn!(document_id, recipient_id = %recipient.id, error = %err, "share notification failed");
        }

        Ok(recipient)
    }

    /// Registered account for the email, else the (possibly new) placeholder.
    async fn resolve_recipient(&self, email: &str) -> CoreResult<Account> {
        let accounts = self.accounts();
        if let Some(account) = accounts.get_by_email(email).await? {
            return Ok(account);
        }

        let placeholder_id = derive_placeholder_id(email)?;
        if let Some(existing) = self.store.find_account(&placeholder_id).await? {
            return Ok(existing.derived());
        }

        let registration = accounts
            .create(NewAccount {
                id: placeholder_id,
                email: normalize_email(email),
                ..Default::default()
            })
            .await?;
        Ok(registration.account)
    }

    /// Remove a grant. Requires admin; the owner's access cannot be revoked.
    pub async fn revoke(
        &self,
        document_id: &str,
        caller_id: &str,
        target_id: &str,
    ) -> CoreResult<()> {
        let effective = self.documents().authorize(document_id, caller_id).await?;
        if target_id == effective.document.owner_id {
            return Err(CoreError::OwnerProtected);
        }
        if !effective.level.can_admin() {
            return Err(CoreError::Forbidden("admin access required to revoke"));
        }

        PermissionService::new(self.store.clone())
            .delete(document_id, target_id)
            .await?;
        self.pending().discard(document_id, target_id).await?;
        info!(document_id, caller_id, target_id, "share revoked");
        Ok(())
    }

    /// Move a pending grant on `document_id` to `account_id`, if one exists.
    pub async fn resolve_pending_shares(
        &self,
        document_id: &str,
        account_id: &str,
    ) -> CoreResult<Option<AccessLevel>> {
        self.pending().resolve(document_id, account_id).await
    }

    /// Owner plus every other grant holder. Holders whose account cannot be
    /// resolved are skipped.
    pub async fn list_collaborators(
        &self,
        document_id: &str,
        caller_id: &str,
    ) -> CoreResult<CollaboratorListing> {
        let accounts = self.accounts();

        if document_id == NEW_DOCUMENT_ID {
            let caller = accounts
                .get_by_id(caller_id)
                .await?
                .ok_or(CoreError::NotFound("account"))?;
            return Ok(CollaboratorListing {
                owner: Collaborator::from_account(caller, AccessLevel::Admin),
                collaborators: Vec::new(),
            });
        }

        let effective = self.documents().authorize(document_id, caller_id).await?;
        let owner_id = effective.document.owner_id;

        let owner = match accounts.get_by_id(&owner_id).await {
            Ok(Some(account)) => Collaborator::from_account(account, AccessLevel::Admin),
            Ok(None) => Collaborator::unknown_owner(&owner_id),
            Err(err) => {
                warn!(document_id, owner_id = %owner_id, error = %err, "failed to load owner");
                Collaborator::unknown_owner(&owner_id)
            }
        };

        let mut rows = PermissionService::new(self.store.clone())
            .list_by_document(document_id)
            .await?;
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut collaborators = Vec::with_capacity(rows.len());
        for row in rows {
            if row.account_id == owner_id {
                continue;
            }
            match accounts.get_by_id(&row.account_id).await {
                Ok(Some(account)) => {
                    collaborators.push(Collaborator::from_account(account, row.level));
                }
                Ok(None) => {
                    warn!(document_id, account_id = %row.account_id, "collaborator account missing, skipping");
                }
                Err(err) => {
                    warn!(
                        document_id,
                        account_id = %row.account_id,
                        error = %err,
                        "failed to load collaborator, skipping"
                    );
                }
            }
        }

        Ok(CollaboratorListing {
            owner,
            collaborators,
        })
    }
}
