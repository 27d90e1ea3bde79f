use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patch::FieldPatch;
use crate::permission::AccessLevel;

/// Title given to documents created without one.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// Document id that stands for "not persisted yet".
pub const NEW_DOCUMENT_ID: &str = "new";

/// A note. Maps to the `documents` PostgreSQL table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    pub owner_id: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Partial document update. `null` clears a field back to its default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default)]
    pub title: FieldPatch<String>,
    #[serde(default)]
    pub body: FieldPatch<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_unchanged() && self.body.is_unchanged()
    }

    /// Creation input for a patch sent to the `new` document id.
    pub fn into_new_document(self) -> NewDocument {
        let set = |field: FieldPatch<String>| match field {
            FieldPatch::Set(value) => Some(value),
            FieldPatch::Unchanged | FieldPatch::Clear => None,
        };
        NewDocument {
            title: set(self.title),
            body: set(self.body),
        }
    }

    pub fn into_changes(self, now: DateTime<Utc>) -> DocumentChanges {
        DocumentChanges {
            title: self.title.resolve(|| DEFAULT_TITLE.to_string()),
            body: self.body.resolve(String::new),
            archived: None,
            updated_at: now,
        }
    }
}

/// Field-level update applied by the store; `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub archived: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentChanges {
    pub fn archive(now: DateTime<Utc>) -> Self {
        Self {
            title: None,
            body: None,
            archived: Some(true),
            updated_at: now,
        }
    }

    pub fn apply(&self, doc: &mut Document) {
        if let Some(title) = &self.title {
            doc.title.clone_from(title);
        }
        if let Some(body) = &self.body {
            doc.body.clone_from(body);
        }
        if let Some(archived) = self.archived {
            doc.archived = archived;
        }
        doc.updated_at = self.updated_at;
    }
}

/// A document together with the caller's effective level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveDocument {
    #[serde(flatten)]
    pub document: Document,
    pub level: AccessLevel,
}

/// A document shared with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDocument {
    #[serde(flatten)]
    pub document: Document,
    pub level: AccessLevel,
    pub owner_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentListing {
    pub owned: Vec<Document>,
    pub shared: Vec<SharedDocument>,
}
