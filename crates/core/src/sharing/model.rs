use serde::Serialize;

use crate::account::Account;
use crate::permission::AccessLevel;

/// Display name used when a document owner's account cannot be resolved.
pub const UNKNOWN_OWNER_NAME: &str = "Unknown User";

/// An account with access to a document, as shown in the collaborator panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_ref: Option<String>,
    pub level: AccessLevel,
    pub is_pending: bool,
}

impl Collaborator {
    pub fn from_account(account: Account, level: AccessLevel) -> Self {
        Self {
            id: account.id,
            display_name: account.display_name,
            email: account.email,
            avatar_ref: account.avatar_ref,
            level,
            is_pending: account.is_pending,
        }
    }

    /// Owner entry for an owner id whose account record is gone.
    pub fn unknown_owner(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: UNKNOWN_OWNER_NAME.to_string(),
            email: String::new(),
            avatar_ref: None,
            level: AccessLevel::Admin,
            is_pending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaboratorListing {
    pub owner: Collaborator,
    pub collaborators: Vec<Collaborator>,
}
