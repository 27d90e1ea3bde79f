use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{local_part, AccountIdKind};
use crate::patch::FieldPatch;

/// An account, registered or placeholder.
/// Maps to the `accounts` PostgreSQL table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Stored as provided at creation; lookups normalize.
    pub email: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Derived from the id shape, never persisted.
    #[sqlx(skip)]
    #[serde(default)]
    pub is_pending: bool,
}

impl Account {
    pub fn new(data: NewAccount, now: DateTime<Utc>) -> Self {
        let display_name = data
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| local_part(&data.email).to_string());
        Self {
            id: data.id,
            email: data.email,
            display_name,
            avatar_ref: data.avatar_ref,
            created_at: now,
            updated_at: now,
            is_pending: false,
        }
        .derived()
    }

    /// Transient account standing in for a placeholder id with no record.
    pub fn synthesized(id: &str, email: String, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            display_name: local_part(&email).to_string(),
            email,
            avatar_ref: None,
            created_at: now,
            updated_at: now,
            is_pending: true,
        }
    }

    /// Recompute the fields derived from the id.
    pub fn derived(mut self) -> Self {
        self.is_pending = AccountIdKind::parse(&self.id).is_placeholder();
        self
    }
}

/// Input for account creation and auto-provisioning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

/// Profile update. `displayName: null` resets to the email local part,
/// `avatarRef: null` removes the avatar.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default)]
    pub display_name: FieldPatch<String>,
    #[serde(default)]
    pub avatar_ref: FieldPatch<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_unchanged() && self.avatar_ref.is_unchanged()
    }
}

/// Fields of an account visible to any authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

impl From<Account> for PublicProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            display_name: account.display_name,
            avatar_ref: account.avatar_ref,
        }
    }
}
