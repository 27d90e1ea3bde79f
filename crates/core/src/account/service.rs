use chrono::Utc;
use tracing::{debug, info};

use super::model::{Account, NewAccount, ProfilePatch};
use crate::error::{CoreError, CoreResult};
use crate::identity::{derive_placeholder_id, local_part, normalize_email, AccountIdKind};
use crate::sharing::PendingShares;
use crate::store::SharedStore;
use crate::validate::{validate_account_fields, validate_search_query};

/// Default and maximum page sizes for account search.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Outcome of [`AccountService::create`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    /// `false` when the id already existed and only mutable fields were refreshed.
    pub created: bool,
}

#[derive(Clone)]
pub struct AccountService {
    store: SharedStore,
}

impl AccountService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create an account, or refresh display name and avatar when the id exists.
    /// Safe to retry.
    pub async fn create(&self, data: NewAccount) -> CoreResult<Registration> {
        validate_account_fields(&data.id, &data.email)?;
        let now = Utc::now();

        if let Some(existing) = self.store.find_account(&data.id).await? {
            let refreshed = Account {
                display_name: data
                    .display_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| local_part(&existing.email).to_string()),
                avatar_ref: data.avatar_ref,
                updated_at: now,
                ..existing
            };
            self.store.put_account(&refreshed).await?;
            debug!(account_id = %refreshed.id, "account already exists, refreshed profile");
            self.claim_pending(&refreshed.id).await?;
            return Ok(Registration {
                account: refreshed.derived(),
                created: false,
            });
        }

        let account = Account::new(data, now);
        if !account.is_pending {
            self.retire_placeholder(&account).await?;
        }
        self.store.put_account(&account).await?;
        info!(account_id = %account.id, pending = account.is_pending, "account created");
        if !account.is_pending {
            self.claim_pending(&account.id).await?;
        }

        Ok(Registration {
            account,
            created: true,
        })
    }

    /// Drop the persisted placeholder record for the email a real account claims.
    async fn retire_placeholder(&self, account: &Account) -> CoreResult<()> {
        let Ok(placeholder_id) = derive_placeholder_id(&account.email) else {
            return Ok(());
        };
        if placeholder_id != account.id && self.store.find_account(&placeholder_id).await?.is_some()
        {
            self.store.delete_account(&placeholder_id).await?;
            info!(
                account_id = %account.id,
                placeholder_id = %placeholder_id,
                "placeholder account claimed"
            );
        }
        Ok(())
    }

    /// Move every grant still held by the account's placeholder id onto it.
    /// Runs after the account is stored. No-op for placeholder ids.
    async fn claim_pending(&self, account_id: &str) -> CoreResult<()> {
        PendingShares::new(self.store.clone())
            .claim_all(account_id)
            .await?;
        Ok(())
    }

    /// Persisted account, or a transient pending account for a well-formed
    /// placeholder id with no record.
    pub async fn get_by_id(&self, id: &str) -> CoreResult<Option<Account>> {
        if id.trim().is_empty() {
            return Ok(None);
        }
        if let Some(account) = self.store.find_account(id).await? {
            return Ok(Some(account.derived()));
        }

        match AccountIdKind::parse(id) {
            AccountIdKind::Placeholder { id, email } => {
                debug!(account_id = %id, "synthesizing pending account");
                Ok(Some(Account::synthesized(&id, email, Utc::now())))
            }
            AccountIdKind::Registered(_) => Ok(None),
        }
    }

    /// Exact match on the normalized email, then a case-insensitive scan.
    pub async fn get_by_email(&self, email: &str) -> CoreResult<Option<Account>> {
        let normalized = normalize_email(email);
        if normalized.is_empty() {
            return Ok(None);
        }

        if let Some(account) = self.store.find_account_by_email(&normalized).await? {
            return Ok(Some(account.derived()));
        }

        debug!(email = %normalized, "no exact email match, scanning case-insensitively");
        let found = self.store.scan_account_by_email(&normalized).await?;
        Ok(found.map(Account::derived))
    }

    pub async fn update_profile(&self, id: &str, patch: ProfilePatch) -> CoreResult<Account> {
        let existing = self
            .store
            .find_account(id)
            .await?
            .ok_or(CoreError::NotFound("account"))?;

        let default_name = local_part(&existing.email).to_string();
        let mut updated = existing;
        if let Some(name) = patch.display_name.resolve(|| default_name) {
            updated.display_name = name;
        }
        if let Some(avatar) = patch.avatar_ref.resolve_nullable() {
            updated.avatar_ref = avatar;
        }
        updated.updated_at = Utc::now();

        self.store.put_account(&updated).await?;
        Ok(updated.derived())
    }

    /// Case-insensitive prefix search over display name and email.
    pub async fn search(
        &self,
        query: &str,
        exclude_id: &str,
        limit: Option<usize>,
    ) -> CoreResult<Vec<Account>> {
        validate_search_query(query)?;
        let limit = limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);
        let prefix = query.trim().to_lowercase();

        let accounts = self
            .store
            .search_accounts(&prefix, exclude_id, limit)
            .await?;
        Ok(accounts.into_iter().map(Account::derived).collect())
    }
}
