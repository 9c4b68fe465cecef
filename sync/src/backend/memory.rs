//! In-memory stores.
//!
//! Useful for embedding hosts without durable storage and for tests. Clones
//! share the same underlying map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{LocalStore, RemoteDocument, RemoteStore};
use crate::error::StoreError;

/// Key-value store kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Document store kept in memory, merging on write like a hosted store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    documents: Arc<RwLock<HashMap<String, RemoteDocument>>>,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the document of `id` without merging.
    pub async fn insert(&self, id: &str, document: RemoteDocument) {
        self.documents
            .write()
            .await
            .insert(id.to_string(), document);
    }

    /// Ids that currently have a document.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn get(&self, id: &str) -> Result<Option<RemoteDocument>, StoreError> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn put(&self, id: &str, document: &RemoteDocument) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .entry(id.to_string())
            .or_default()
            .merge(document);
        Ok(())
    }
}
