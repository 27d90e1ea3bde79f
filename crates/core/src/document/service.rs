use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::model::{
    Document, DocumentChanges, DocumentListing, DocumentPatch, EffectiveDocument, NewDocument,
    SharedDocument, DEFAULT_TITLE, NEW_DOCUMENT_ID,
};
use crate::error::{CoreError, CoreResult};
use crate::permission::AccessLevel;
use crate::sharing::PendingShares;
use crate::store::{SharedStore, IN_QUERY_LIMIT};
use crate::validate::ValidationError;
use crate::version::VersionService;

/// Owner name shown on shared documents whose owner record is gone.
pub const UNKNOWN_OWNER: &str = "Unknown";

#[derive(Clone)]
pub struct DocumentService {
    store: SharedStore,
}

impl DocumentService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn pending(&self) -> PendingShares {
        PendingShares::new(self.store.clone())
    }

    fn versions(&self) -> VersionService {
        VersionService::new(self.store.clone())
    }

    pub async fn create(&self, owner_id: &str, data: NewDocument) -> CoreResult<Document> {
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            title: data
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: data.body.unwrap_or_default(),
            owner_id: owner_id.to_string(),
            archived: false,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_document(&doc).await?;
        info!(document_id = %doc.id, owner_id, "document created");
        Ok(doc)
    }

    /// Effective level of `account_id` on `doc`: owner, then direct grant, then a
    /// pending grant migrated on the spot. `None` means no access.
    pub async fn resolve_level(
        &self,
        doc: &Document,
        account_id: &str,
    ) -> CoreResult<Option<AccessLevel>> {
        if doc.owner_id == account_id {
            return Ok(Some(AccessLevel::Admin));
        }

        if let Some(row) = self.store.find_permission(&doc.id, account_id).await? {
            return Ok(Some(row.level));
        }

        match self.pending().resolve(&doc.id, account_id).await {
            Ok(level) => Ok(level),
            Err(err) => {
                warn!(document_id = %doc.id, account_id, error = %err, "pending share lookup failed");
                Ok(None)
            }
        }
    }

    /// The document and the caller's level, or `None` when it is missing or the
    /// caller has no access.
    pub async fn get_effective(
        &self,
        document_id: &str,
        account_id: &str,
    ) -> CoreResult<Option<EffectiveDocument>> {
        let Some(document) = self.store.find_document(document_id).await? else {
            debug!(document_id, "document not found");
            return Ok(None);
        };

        let level = self.resolve_level(&document, account_id).await?;
        Ok(level.map(|level| EffectiveDocument { document, level }))
    }

    /// Like [`get_effective`](Self::get_effective), but absence is an error.
    pub async fn authorize(
        &self,
        document_id: &str,
        account_id: &str,
    ) -> CoreResult<EffectiveDocument> {
        self.get_effective(document_id, account_id)
            .await?
            .ok_or(CoreError::NotFound("document"))
    }

    /// Apply a partial update and record a version. Requires write access.
    pub async fn update(
        &self,
        document_id: &str,
        account_id: &str,
        patch: DocumentPatch,
    ) -> CoreResult<Document> {
        if document_id == NEW_DOCUMENT_ID {
            return self.create(account_id, patch.into_new_document()).await;
        }
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let doc = self
            .store
            .find_document(document_id)
            .await?
            .ok_or(CoreError::NotFound("document"))?;

        match self.resolve_level(&doc, account_id).await? {
            Some(level) if level.can_write() => {}
            _ => return Err(CoreError::Forbidden("write access required")),
        }

        let updated = self
            .store
            .update_document(document_id, &patch.into_changes(Utc::now()))
            .await?
            .ok_or(CoreError::NotFound("document"))?;
        info!(document_id, account_id, "document updated");

        if let Err(err) = self
            .versions()
            .append(&updated.id, account_id, &updated.title, &updated.body)
            .await
        {
            error!(document_id, error = %err, "failed to record version");
        }

        Ok(updated)
    }

    /// Load a document for an owner-only action. Non-owners with some access get
    /// `Forbidden`, everyone else `NotFound`.
    async fn require_owner(
        &self,
        document_id: &str,
        account_id: &str,
        action: &'static str,
    ) -> CoreResult<Document> {
        let doc = self
            .store
            .find_document(document_id)
            .await?
            .ok_or(CoreError::NotFound("document"))?;

        if doc.owner_id == account_id {
            return Ok(doc);
        }
        match self.resolve_level(&doc, account_id).await? {
            Some(_) => Err(CoreError::Forbidden(action)),
            None => Err(CoreError::NotFound("document")),
        }
    }

    /// Soft delete. Owner only.
    pub async fn archive(&self, document_id: &str, account_id: &str) -> CoreResult<()> {
        self.require_owner(document_id, account_id, "only the owner can archive")
            .await?;
        self.store
            .update_document(document_id, &DocumentChanges::archive(Utc::now()))
            .await?;
        info!(document_id, account_id, "document archived");
        Ok(())
    }

    /// Delete the document and its grants in one batch. Versions are kept.
    pub async fn hard_delete(&self, document_id: &str, account_id: &str) -> CoreResult<()> {
        self.require_owner(document_id, account_id, "only the owner can delete")
            .await?;
        self.store.delete_document_cascade(document_id).await?;
        info!(document_id, account_id, "document permanently deleted");
        Ok(())
    }

    /// Non-archived documents owned by, and shared with, the account.
    pub async fn list_for_account(&self, account_id: &str) -> CoreResult<DocumentListing> {
        if let Err(err) = self.pending().claim_all(account_id).await {
            warn!(account_id, error = %err, "failed to claim pending shares");
        }

        let owned: Vec<Document> = self
            .store
            .list_owned_documents(account_id)
            .await?
            .into_iter()
            .filter(|doc| !doc.archived)
            .collect();

        let levels: HashMap<String, AccessLevel> = self
            .store
            .list_account_permissions(account_id)
            .await?
            .into_iter()
            .map(|row| (row.document_id, row.level))
            .collect();

        let mut ids: Vec<String> = levels.keys().cloned().collect();
        ids.sort();

        let mut docs = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_QUERY_LIMIT) {
            docs.extend(self.store.find_documents_in(chunk).await?);
        }

        let mut owner_names: HashMap<String, String> = HashMap::new();
        let mut shared = Vec::with_capacity(docs.len());
        for document in docs {
            if document.archived || document.owner_id == account_id {
                continue;
            }
            let Some(&level) = levels.get(&document.id) else {
                continue;
            };

            let owner_name = match owner_names.get(&document.owner_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .store
                        .find_account(&document.owner_id)
                        .await?
                        .map(|owner| owner.display_name)
                        .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
                    owner_names.insert(document.owner_id.clone(), name.clone());
                    name
                }
            };

            shared.push(SharedDocument {
                document,
                level,
                owner_name,
            });
        }
        shared.sort_by(|a, b| b.document.updated_at.cmp(&a.document.updated_at));

        debug!(
            account_id,
            owned = owned.len(),
            shared = shared.len(),
            "listed documents"
        );
        Ok(DocumentListing { owned, shared })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::patch::FieldPatch;
    use crate::permission::Permission;
    use crate::store::{DocumentRepo, MemoryStore, PermissionRepo, VersionRepo};

    fn setup() -> (Arc<MemoryStore>, DocumentService) {
        let store = Arc::new(MemoryStore::new());
        let service = DocumentService::new(store.clone());
        (store, service)
    }

    async fn grant(store: &MemoryStore, doc: &str, account: &str, level: AccessLevel) {
        store
            .upsert_permission(&Permission::new(doc, account, level, "owner", Utc::now()))
            .await
            .unwrap();
    }

    fn title_patch(title: &str) -> DocumentPatch {
        DocumentPatch {
            title: FieldPatch::Set(title.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_defaults_title() {
        let (_, docs) = setup();
        let doc = docs.create("owner", NewDocument::default()).await.unwrap();
        assert_eq!(doc.title, DEFAULT_TITLE);
        assert_eq!(doc.body, "");
        assert!(!doc.archived);
    }

    #[tokio::test]
    async fn owner_short_circuits_stale_permission_row() {
        let (store, docs) = setup();
        let doc = docs.create("owner", NewDocument::default()).await.unwrap();
        grant(&store, &doc.id, "owner", AccessLevel::Read).await;

        let effective = docs.get_effective(&doc.id, "owner").await.unwrap().unwrap();
        assert_eq!(effective.level, AccessLevel::Admin);
    }

    #[tokio::test]
    async fn stranger_sees_nothing() {
        let (_, docs) = setup();
        let doc = docs.create("owner", NewDocument::default()).await.unwrap();
        assert!(docs.get_effective(&doc.id, "stranger").await.unwrap().is_none());
        assert!(docs.get_effective("missing", "owner").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_requires_write() {
        let (store, docs) = setup();
        let doc = docs.create("owner", NewDocument::default()).await.unwrap();
        grant(&store, &doc.id, "reader", AccessLevel::Read).await;
        grant(&store, &doc.id, "writer", AccessLevel::Write).await;

        let err = docs
            .update(&doc.id, "reader", title_patch("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = docs
            .update(&doc.id, "stranger", title_patch("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = docs
            .update("missing", "writer", title_patch("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound("document")));

        let updated = docs
            .update(&doc.id, "writer", title_patch("Plans"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Plans");
    }

    #[tokio::test]
    async fn update_succeeds_when_no_version_can_be_recorded() {
        let (store, docs) = setup();
        let doc = docs.create("owner", NewDocument::default()).await.unwrap();

        store.reject_version_inserts(2);
        let updated = docs
            .update(&doc.id, "owner", title_patch("Kept"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Kept");
        assert_eq!(store.find_document(&doc.id).await.unwrap().unwrap().title, "Kept");
        assert!(store.list_versions(&doc.id).await.unwrap().is_empty());

        docs.update(&doc.id, "owner", title_patch("Next")).await.unwrap();
        let numbers: Vec<i64> = store
            .list_versions(&doc.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![1]);
    }

    #[tokio::test]
    async fn update_is_partial_and_clear_resets_to_default() {
        let (_, docs) = setup();
        let doc = docs
            .create(
                "owner",
                NewDocument {
                    title: Some("Groceries".to_string()),
                    body: Some("milk".to_string()),
                },
            )
            .await
            .unwrap();

        let updated = docs
            .update(
                &doc.id,
                "owner",
                DocumentPatch {
                    body: FieldPatch::Set("eggs".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Groceries");
        assert_eq!(updated.body, "eggs");
        assert!(updated.updated_at >= doc.updated_at);

        let cleared = docs
            .update(
                &doc.id,
                "owner",
                DocumentPatch {
                    title: FieldPatch::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.title, DEFAULT_TITLE);

        let err = docs
            .update(&doc.id, "owner", DocumentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyPatch)));
    }

    #[tokio::test]
    async fn update_on_new_creates() {
        let (_, docs) = setup();
        let doc = docs
            .update(NEW_DOCUMENT_ID, "owner", title_patch("Fresh"))
            .await
            .unwrap();
        assert_eq!(doc.title, "Fresh");
        assert_eq!(doc.owner_id, "owner");
        assert_ne!(doc.id, NEW_DOCUMENT_ID);
    }

    #[tokio::test]
    async fn archive_and_delete_are_owner_only() {
        let (store, docs) = setup();
        let doc = docs.create("owner", NewDocument::default()).await.unwrap();
        grant(&store, &doc.id, "admin", AccessLevel::Admin).await;

        let err = docs.archive(&doc.id, "admin").await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        let err = docs.hard_delete(&doc.id, "stranger").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        docs.hard_delete(&doc.id, "owner").await.unwrap();
        assert!(store.find_document(&doc.id).await.unwrap().is_none());
        assert!(store
            .list_document_permissions(&doc.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn archived_documents_leave_listing_but_stay_readable() {
        let (_, docs) = setup();
        let doc = docs
            .create(
                "owner",
                NewDocument {
                    title: Some("Old".to_string()),
                    body: Some("keep me".to_string()),
                },
            )
            .await
            .unwrap();

        docs.archive(&doc.id, "owner").await.unwrap();

        let listing = docs.list_for_account("owner").await.unwrap();
        assert!(listing.owned.is_empty());

        let still = docs.get_effective(&doc.id, "owner").await.unwrap().unwrap();
        assert!(still.document.archived);
        assert_eq!(still.document.body, "keep me");
    }

    #[tokio::test]
    async fn shared_listing_chunks_id_batches() {
        let (store, docs) = setup();
        let total = IN_QUERY_LIMIT * 2 + 3;
        for i in 0..total {
            let doc = docs
                .create(
                    "owner",
                    NewDocument {
                        title: Some(format!("note {i}")),
                        body: None,
                    },
                )
                .await
                .unwrap();
            grant(&store, &doc.id, "reader", AccessLevel::Read).await;
        }

        let listing = docs.list_for_account("reader").await.unwrap();
        assert!(listing.owned.is_empty());
        assert_eq!(listing.shared.len(), total);
        assert!(listing
            .shared
            .iter()
            .all(|s| s.level == AccessLevel::Read && s.owner_name == UNKNOWN_OWNER));
    }
}
