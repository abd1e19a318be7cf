//! Remote reconciliation. The local store stays the source of truth;
//! pushes are debounced per thread so a streaming run produces one
//! remote write per quiet period instead of one per delta.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use braid_store::LocalStore;
use braid_types::{Thread, ThreadItem};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{RemoteError, Result};

/// CRUD surface of the remote persistence backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upsert_thread(&self, thread: &Thread, items: &[ThreadItem]) -> Result<()>;
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
    async fn delete_item(&self, thread_id: &str, item_id: &str) -> Result<()>;
}

struct Inner {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    debounce: Duration,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    enabled: AtomicBool,
    last_error: std::sync::Mutex<Option<String>>,
}

/// Pushes local changes to the remote store with per-thread debouncing.
#[derive(Clone)]
pub struct RemoteSync {
    inner: Arc<Inner>,
}

impl RemoteSync {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                local,
                remote,
                debounce,
                timers: Mutex::new(HashMap::new()),
                enabled: AtomicBool::new(true),
                last_error: std::sync::Mutex::new(None),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// User-visible sync error, set when sync downgraded itself.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().expect("lock poisoned").clone()
    }

    /// Notify that a thread (or any of its items) changed locally.
    /// Thread creation pushes immediately; later updates are coalesced
    /// over the debounce window.
    pub async fn note_thread_changed(&self, thread_id: &str, created: bool) {
        if !self.is_enabled() {
            return;
        }

        if created {
            self.cancel_timer(thread_id).await;
            self.push(thread_id).await;
            return;
        }

        let mut timers = self.inner.timers.lock().await;
        if let Some(previous) = timers.remove(thread_id) {
            previous.abort();
        }
        let sync = self.clone();
        let thread_id = thread_id.to_string();
        let debounce = self.inner.debounce;
        let key = thread_id.clone();
        timers.insert(
            key,
            tokio::spawn(async move {
                tokio::time::sleep(debounce).await;
                sync.inner.timers.lock().await.remove(&thread_id);
                sync.push(&thread_id).await;
            }),
        );
    }

    /// Deletions are pushed immediately; there is nothing to coalesce.
    pub async fn note_thread_deleted(&self, thread_id: &str) {
        if !self.is_enabled() {
            return;
        }
        self.cancel_timer(thread_id).await;
        if let Err(e) = self.inner.remote.delete_thread(thread_id).await {
            self.handle_error(e);
        }
    }

    pub async fn note_item_deleted(&self, thread_id: &str, item_id: &str) {
        if !self.is_enabled() {
            return;
        }
        if let Err(e) = self.inner.remote.delete_item(thread_id, item_id).await {
            self.handle_error(e);
        }
    }

    /// Stop syncing and cancel every pending timer.
    pub async fn disable(&self) {
        self.inner.enabled.store(false, Ordering::SeqCst);
        let mut timers = self.inner.timers.lock().await;
        for (_, timer) in timers.drain() {
            timer.abort();
        }
    }

    async fn cancel_timer(&self, thread_id: &str) {
        if let Some(timer) = self.inner.timers.lock().await.remove(thread_id) {
            timer.abort();
        }
    }

    async fn push(&self, thread_id: &str) {
        if !self.is_enabled() {
            return;
        }
        let thread = match self.inner.local.get_thread(thread_id).await {
            Ok(Some(thread)) => thread,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(thread_id, "local read failed before push: {}", e);
                return;
            }
        };
        let items = match self.inner.local.list_items(thread_id).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(thread_id, "local read failed before push: {}", e);
                return;
            }
        };

        if let Err(e) = self.inner.remote.upsert_thread(&thread, &items).await {
            self.handle_error(e);
        }
    }

    fn handle_error(&self, error: RemoteError) {
        match error {
            RemoteError::Unauthorized => {
                tracing::warn!("remote sync unauthorized, downgrading to local-only");
                self.inner.enabled.store(false, Ordering::SeqCst);
                *self.inner.last_error.lock().expect("lock poisoned") =
                    Some("Sync is paused: sign in again to resume syncing.".to_string());
                let sync = self.clone();
                tokio::spawn(async move { sync.disable().await });
            }
            other => {
                tracing::warn!("remote push failed: {}", other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_store::MemoryStore;
    use braid_types::ChatMode;
    use std::sync::atomic::AtomicUsize;

    struct CountingRemote {
        pushes: AtomicUsize,
        unauthorized: bool,
    }

    impl CountingRemote {
        fn new(unauthorized: bool) -> Self {
            Self {
                pushes: AtomicUsize::new(0),
                unauthorized,
            }
        }
    }

    #[async_trait]
    impl RemoteStore for CountingRemote {
        async fn upsert_thread(&self, _thread: &Thread, _items: &[ThreadItem]) -> Result<()> {
            if self.unauthorized {
                return Err(RemoteError::Unauthorized);
            }
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete_thread(&self, _thread_id: &str) -> Result<()> {
            Ok(())
        }

        async fn delete_item(&self, _thread_id: &str, _item_id: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn seeded_local() -> (Arc<MemoryStore>, String) {
        let local = Arc::new(MemoryStore::new());
        let thread = Thread::new("t");
        let id = thread.id.clone();
        local.upsert_thread(&thread).await.unwrap();
        local
            .upsert_item(&ThreadItem::new(&id, "q", ChatMode::Auto))
            .await
            .unwrap();
        (local, id)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_updates_coalesce_into_one_push() {
        let (local, thread_id) = seeded_local().await;
        let remote = Arc::new(CountingRemote::new(false));
        let sync = RemoteSync::new(local, remote.clone(), Duration::from_millis(500));

        for _ in 0..5 {
            sync.note_thread_changed(&thread_id, false).await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(remote.pushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn creation_pushes_immediately() {
        let (local, thread_id) = seeded_local().await;
        let remote = Arc::new(CountingRemote::new(false));
        let sync = RemoteSync::new(local, remote.clone(), Duration::from_secs(5));

        sync.note_thread_changed(&thread_id, true).await;
        assert_eq!(remote.pushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_downgrades_to_local_only() {
        let (local, thread_id) = seeded_local().await;
        let remote = Arc::new(CountingRemote::new(true));
        let sync = RemoteSync::new(local, remote.clone(), Duration::from_millis(10));

        sync.note_thread_changed(&thread_id, true).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!sync.is_enabled());
        assert!(sync.last_error().is_some());

        // Further updates are ignored once disabled.
        sync.note_thread_changed(&thread_id, false).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(remote.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disable_cancels_pending_timers() {
        let (local, thread_id) = seeded_local().await;
        let remote = Arc::new(CountingRemote::new(false));
        let sync = RemoteSync::new(local, remote.clone(), Duration::from_millis(100));

        sync.note_thread_changed(&thread_id, false).await;
        sync.disable().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(remote.pushes.load(Ordering::SeqCst), 0);
    }
}
