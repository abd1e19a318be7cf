use std::collections::HashMap;

use async_trait::async_trait;
use braid_types::{Thread, ThreadItem};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::prefs::Preferences;

/// Durable local storage: the single source of truth for one tab.
/// Two collections (threads, thread items) plus the preferences blob.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn upsert_thread(&self, thread: &Thread) -> Result<()>;
    async fn get_thread(&self, id: &str) -> Result<Option<Thread>>;
    async fn list_threads(&self) -> Result<Vec<Thread>>;
    /// Cascades to the thread's items.
    async fn delete_thread(&self, id: &str) -> Result<()>;

    async fn upsert_item(&self, item: &ThreadItem) -> Result<()>;
    /// Batch write; all-or-nothing is not guaranteed, callers fall back
    /// to per-item writes on failure.
    async fn upsert_items(&self, items: &[ThreadItem]) -> Result<()>;
    async fn get_item(&self, id: &str) -> Result<Option<ThreadItem>>;
    async fn list_items(&self, thread_id: &str) -> Result<Vec<ThreadItem>>;
    async fn delete_item(&self, id: &str) -> Result<()>;

    async fn load_preferences(&self) -> Result<Preferences>;
    async fn save_preferences(&self, prefs: &Preferences) -> Result<()>;
}

/// In-memory backend, used in tests and as the default when no durable
/// backend is configured.
#[derive(Default)]
pub struct MemoryStore {
    threads: RwLock<HashMap<String, Thread>>,
    items: RwLock<HashMap<String, ThreadItem>>,
    prefs: RwLock<Preferences>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn upsert_thread(&self, thread: &Thread) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(thread.id.clone(), thread.clone());
        Ok(())
    }

    async fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        Ok(self.threads.read().await.get(id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self.threads.read().await.values().cloned().collect();
        threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(threads)
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        if self.threads.write().await.remove(id).is_none() {
            return Err(StoreError::ThreadNotFound(id.to_string()));
        }
        self.items
            .write()
            .await
            .retain(|_, item| item.thread_id != id);
        Ok(())
    }

    async fn upsert_item(&self, item: &ThreadItem) -> Result<()> {
        self.items
            .write()
            .await
            .insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn upsert_items(&self, items: &[ThreadItem]) -> Result<()> {
        let mut guard = self.items.write().await;
        for item in items {
            guard.insert(item.id.clone(), item.clone());
        }
        Ok(())
    }

    async fn get_item(&self, id: &str) -> Result<Option<ThreadItem>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn list_items(&self, thread_id: &str) -> Result<Vec<ThreadItem>> {
        let mut items: Vec<ThreadItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.thread_id == thread_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        if self.items.write().await.remove(id).is_none() {
            return Err(StoreError::ItemNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn load_preferences(&self) -> Result<Preferences> {
        Ok(self.prefs.read().await.clone())
    }

    async fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        *self.prefs.write().await = prefs.clone();
        Ok(())
    }
}
