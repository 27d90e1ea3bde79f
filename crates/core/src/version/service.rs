use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::model::{Version, VersionEntry};
use crate::document::DocumentService;
use crate::error::{CoreError, CoreResult};
use crate::store::{SharedStore, StoreResult};

/// Author name shown on versions whose author record is gone.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Clone)]
pub struct VersionService {
    store: SharedStore,
}

impl VersionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn next_number(&self, document_id: &str) -> StoreResult<i64> {
        let versions = self.store.list_versions(document_id).await?;
        Ok(versions
            .iter()
            .map(|v| v.version_number)
            .max()
            .map_or(1, |max| max + 1))
    }

    /// Append a snapshot. Numbers are `max + 1`; when reading or writing the
    /// sequential number fails, the current millisecond timestamp is used instead.
    pub async fn append(
        &self,
        document_id: &str,
        author_id: &str,
        title: &str,
        body: &str,
    ) -> CoreResult<Version> {
        let now = Utc::now();
        let mut version = Version {
            id: Uuid::now_v7(),
            document_id: document_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            version_number: 0,
            created_by: author_id.to_string(),
            created_at: now,
        };

        let sequential = match self.next_number(document_id).await {
            Ok(number) => {
                version.version_number = number;
                self.store.insert_version(&version).await
            }
            Err(err) => Err(err),
        };

        match sequential {
            Ok(()) => {
                debug!(document_id, number = version.version_number, "version appended");
                Ok(version)
            }
            Err(err) => {
                version.version_number = now.timestamp_millis();
                warn!(
                    document_id,
                    error = %err,
                    fallback = version.version_number,
                    "version numbering failed, using timestamp"
                );
                self.store.insert_version(&version).await?;
                Ok(version)
            }
        }
    }

    /// Full history, newest first. Requires read access to the document.
    pub async fn list(&self, document_id: &str, account_id: &str) -> CoreResult<Vec<VersionEntry>> {
        DocumentService::new(self.store.clone())
            .authorize(document_id, account_id)
            .await?;

        let mut versions = self.store.list_versions(document_id).await?;
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));

        let mut authors: HashMap<String, String> = HashMap::new();
        let mut entries = Vec::with_capacity(versions.len());
        for version in versions {
            let author_name = match authors.get(&version.created_by) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .store
                        .find_account(&version.created_by)
                        .await?
                        .map(|author| author.display_name)
                        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
                    authors.insert(version.created_by.clone(), name.clone());
                    name
                }
            };
            entries.push(VersionEntry {
                version,
                author_name,
            });
        }
        Ok(entries)
    }

    /// One version by number. Requires read access to the document.
    pub async fn get_by_number(
        &self,
        document_id: &str,
        account_id: &str,
        version_number: i64,
    ) -> CoreResult<Version> {
        DocumentService::new(self.store.clone())
            .authorize(document_id, account_id)
            .await?;

        self.store
            .find_version(document_id, version_number)
            .await?
            .ok_or(CoreError::NotFound("version"))
    }
}
