//! Deduplicating write batcher for non-critical item updates. The
//! pending map keeps the last write per item id; a background loop
//! flushes it on a fixed interval. A failed batch write degrades to
//! per-item writes so one bad row cannot hold back the rest.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use braid_types::ThreadItem;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::local::LocalStore;

pub struct WriteBatcher {
    pending: Arc<Mutex<HashMap<String, ThreadItem>>>,
    store: Arc<dyn LocalStore>,
    flusher: JoinHandle<()>,
}

impl WriteBatcher {
    pub fn new(store: Arc<dyn LocalStore>, interval: Duration) -> Self {
        let pending: Arc<Mutex<HashMap<String, ThreadItem>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let flusher = {
            let pending = Arc::clone(&pending);
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    flush(&pending, store.as_ref()).await;
                }
            })
        };

        Self {
            pending,
            store,
            flusher,
        }
    }

    /// Queue an item write; a later write for the same id wins.
    pub async fn queue(&self, item: ThreadItem) {
        self.pending.lock().await.insert(item.id.clone(), item);
    }

    /// Bypass the interval and write everything pending now. Returns
    /// the number of items flushed.
    pub async fn flush_now(&self) -> usize {
        flush(&self.pending, self.store.as_ref()).await
    }

    /// Stop the background loop. Pending writes are flushed first.
    pub async fn shutdown(self) {
        self.flusher.abort();
        flush(&self.pending, self.store.as_ref()).await;
    }
}

impl Drop for WriteBatcher {
    fn drop(&mut self) {
        self.flusher.abort();
    }
}

async fn flush(
    pending: &Mutex<HashMap<String, ThreadItem>>,
    store: &dyn LocalStore,
) -> usize {
    let drained: Vec<ThreadItem> = pending.lock().await.drain().map(|(_, item)| item).collect();
    if drained.is_empty() {
        return 0;
    }

    if let Err(e) = store.upsert_items(&drained).await {
        tracing::warn!("batch write failed ({}), falling back to per-item writes", e);
        for item in &drained {
            if let Err(e) = store.upsert_item(item).await {
                tracing::error!(item_id = %item.id, "item write failed: {}", e);
            }
        }
    }
    drained.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryStore;
    use braid_types::{ChatMode, ItemStatus};

    #[tokio::test]
    async fn last_write_per_id_wins() {
        let store = Arc::new(MemoryStore::new());
        let batcher = WriteBatcher::new(store.clone(), Duration::from_secs(3600));

        let mut item = ThreadItem::new("t1", "q", ChatMode::Auto);
        let id = item.id.clone();
        batcher.queue(item.clone()).await;

        item.status = ItemStatus::Completed;
        batcher.queue(item).await;

        assert_eq!(batcher.flush_now().await, 1);
        let stored = store.get_item(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::Completed);
    }

    #[tokio::test]
    async fn shutdown_flushes_pending_writes() {
        let store = Arc::new(MemoryStore::new());
        let batcher = WriteBatcher::new(store.clone(), Duration::from_secs(3600));

        let item = ThreadItem::new("t1", "q", ChatMode::Auto);
        let id = item.id.clone();
        batcher.queue(item).await;
        batcher.shutdown().await;

        assert!(store.get_item(&id).await.unwrap().is_some());
    }
}
