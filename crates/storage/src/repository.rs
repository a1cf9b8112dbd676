use async_trait::async_trait;
use bite_core::model::{Feedback, Fingerprint, ItemId, Like};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Fixed keys under which each concern persists its JSON document.
pub mod keys {
    pub const PROGRESS: &str = "bite.progress";
    pub const NOTES: &str = "bite.notes";
    pub const LAYOUT: &str = "bite.layout";
    pub const FINGERPRINT: &str = "bite.fingerprint";
}

/// Durable string key-value storage; values are JSON documents owned by the caller.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Row store for anonymous likes and feedback.
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Insert a like.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the (item, fingerprint) pair already liked.
    async fn insert_like(&self, like: &Like) -> Result<(), StorageError>;

    /// Delete a like. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_like(
        &self,
        item_id: &ItemId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_likes(&self, item_id: &ItemId) -> Result<Vec<Like>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_feedback(&self, item_id: &ItemId) -> Result<Vec<Feedback>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_likes(&self) -> Result<Vec<Like>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_feedback(&self) -> Result<Vec<Feedback>, StorageError>;
}

/// Bundle of the storage ports used by the services.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
    pub engagement: Arc<dyn EngagementRepository>,
}

impl Storage {
    /// Build a `Storage` backed entirely by memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(InMemoryStore::new()),
            engagement: Arc::new(InMemoryEngagement::new()),
        }
    }
}

/// Simple in-memory key-value store for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// In-memory likes and feedback tables.
#[derive(Clone, Default)]
pub struct InMemoryEngagement {
    likes: Arc<Mutex<Vec<Like>>>,
    feedback: Arc<Mutex<Vec<Feedback>>>,
}

impl InMemoryEngagement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngagementRepository for InMemoryEngagement {
    async fn insert_like(&self, like: &Like) -> Result<(), StorageError> {
        let mut guard = self
            .likes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .iter()
            .any(|row| row.item_id == like.item_id && row.fingerprint == like.fingerprint)
        {
            return Err(StorageError::Conflict);
        }
        guard.push(like.clone());
        Ok(())
    }

    async fn delete_like(
        &self,
        item_id: &ItemId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StorageError> {
        let mut guard = self
            .likes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let before = guard.len();
        guard.retain(|row| !(&row.item_id == item_id && &row.fingerprint == fingerprint));
        Ok(guard.len() != before)
    }

    async fn list_likes(&self, item_id: &ItemId) -> Result<Vec<Like>, StorageError> {
        let guard = self
            .likes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|row| &row.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), StorageError> {
        let mut guard = self
            .feedback
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(feedback.clone());
        Ok(())
    }

    async fn list_feedback(&self, item_id: &ItemId) -> Result<Vec<Feedback>, StorageError> {
        let guard = self
            .feedback
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|row| &row.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_all_likes(&self) -> Result<Vec<Like>, StorageError> {
        let guard = self
            .likes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn list_all_feedback(&self) -> Result<Vec<Feedback>, StorageError> {
        let guard = self
            .feedback
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}
