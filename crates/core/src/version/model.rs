use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a document's append-only history.
/// Maps to the `versions` PostgreSQL table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: Uuid,
    pub document_id: String,
    pub title: String,
    pub body: String,
    /// Sequential per document in the common case; a millisecond timestamp when
    /// numbering fell back.
    pub version_number: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A version with its author's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    #[serde(flatten)]
    pub version: Version,
    pub author_name: String,
}
