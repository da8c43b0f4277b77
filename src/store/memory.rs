//! In-memory `DocumentStore` backend.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

use super::traits::{DocumentRecord, DocumentStore, NewDocument};

struct StoredDocument {
    record: DocumentRecord,
    artifact: Vec<u8>,
}

/// Keeps everything in process memory. Suitable for tests and single-node
/// deployments without durability requirements; the `DocumentStore` trait is
/// the seam for a durable backend.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<StoredDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored artifact's bytes by record id.
    pub async fn artifact(&self, id: Uuid) -> Result<Vec<u8>, StoreError> {
        self.documents
            .read()
            .await
            .iter()
            .find(|d| d.record.id == id)
            .map(|d| d.artifact.clone())
            .ok_or(StoreError::NotFound { id: id.to_string() })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn store_document(&self, document: NewDocument) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let record = DocumentRecord {
            id,
            user_id: document.user_id,
            category: document.category,
            template_id: document.template_id,
            file_name: document.file_name,
            created_at: Utc::now(),
        };
        self.documents.write().await.push(StoredDocument {
            record,
            artifact: document.artifact,
        });
        Ok(id)
    }

    async fn recent_documents(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DocumentRecord>, StoreError> {
        let documents = self.documents.read().await;
        let mut records: Vec<DocumentRecord> = documents
            .iter()
            .filter(|d| d.record.user_id == user_id)
            .map(|d| d.record.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}
