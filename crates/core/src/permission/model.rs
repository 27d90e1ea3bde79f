use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Access level on a document. Ordered: `Admin` implies `Write` implies `Read`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "access_level", rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Write,
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Admin => "admin",
        }
    }

    pub fn can_write(self) -> bool {
        self >= AccessLevel::Write
    }

    pub fn can_admin(self) -> bool {
        self == AccessLevel::Admin
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(AccessLevel::Read),
            "write" => Ok(AccessLevel::Write),
            "admin" => Ok(AccessLevel::Admin),
            other => Err(ValidationError::InvalidAccessLevel(other.to_string())),
        }
    }
}

/// A `(document, account)` grant. Never exists for the document's owner.
/// Maps to the `permissions` PostgreSQL table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub document_id: String,
    pub account_id: String,
    pub level: AccessLevel,
    pub granted_by: String,
    /// Placeholder id this grant was migrated from, if any.
    pub migrated_from: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(
        document_id: &str,
        account_id: &str,
        level: AccessLevel,
        granted_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            document_id: document_id.to_string(),
            account_id: account_id.to_string(),
            level,
            granted_by: granted_by.to_string(),
            migrated_from: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(AccessLevel::Admin > AccessLevel::Write);
        assert!(AccessLevel::Write > AccessLevel::Read);
        assert!(AccessLevel::Admin.can_write());
        assert!(!AccessLevel::Read.can_write());
        assert!(!AccessLevel::Write.can_admin());
    }

    #[test]
    fn parse_level() {
        assert_eq!("write".parse::<AccessLevel>(), Ok(AccessLevel::Write));
        assert_eq!(
            "owner".parse::<AccessLevel>(),
            Err(ValidationError::InvalidAccessLevel("owner".to_string()))
        );
    }
}
