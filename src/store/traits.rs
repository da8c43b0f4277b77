//! `DocumentStore` trait — the persistence gateway's narrow interface.
//!
//! The wizard never blocks on the store: it is invoked only at the terminal
//! transition, and a failure is reported to the user as a non-fatal warning,
//! never rolled back into the dialogue.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::Category;
use crate::error::StoreError;

/// A finalized document to persist.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: String,
    pub user_name: Option<String>,
    pub category: Category,
    pub template_id: String,
    pub fields: BTreeMap<String, String>,
    pub file_name: String,
    pub artifact: Vec<u8>,
}

/// A persisted document record (artifact bytes omitted from listings).
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub user_id: String,
    pub category: Category,
    pub template_id: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a document. Returns the generated record id.
    async fn store_document(&self, document: NewDocument) -> Result<Uuid, StoreError>;

    /// Recent documents for an identity, most recent first, up to `limit`.
    async fn recent_documents(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DocumentRecord>, StoreError>;
}
