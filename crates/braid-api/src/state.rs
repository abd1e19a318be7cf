use std::sync::Arc;
use std::time::Duration;

use braid_flow::Flow;
use braid_gen::CredentialStore;
use braid_store::{ChatStore, LocalStore, WriteBatcher};
use braid_sync::{ChangeChannel, RemoteSync};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// The generation run currently streaming, if any. One per process:
/// starting a new run aborts the previous one.
pub struct ActiveRun {
    pub thread_item_id: String,
    pub cancel: CancellationToken,
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// In-memory conversation model: branch bookkeeping and the
    /// materialized view live here; every mutation is mirrored to the
    /// durable store.
    pub chat: Arc<Mutex<ChatStore>>,
    pub store: Arc<dyn LocalStore>,
    pub batcher: Arc<WriteBatcher>,
    pub flow: Flow,
    pub credentials: Arc<dyn CredentialStore>,
    pub channel: Arc<dyn ChangeChannel>,
    pub sync: Option<RemoteSync>,
    pub active_run: Arc<Mutex<Option<ActiveRun>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn LocalStore>,
        flow: Flow,
        credentials: Arc<dyn CredentialStore>,
        channel: Arc<dyn ChangeChannel>,
        sync: Option<RemoteSync>,
    ) -> Self {
        let batch_interval = Duration::from_millis(config.storage.batch_interval_ms);
        let batcher = Arc::new(WriteBatcher::new(Arc::clone(&store), batch_interval));
        Self {
            config: Arc::new(config),
            chat: Arc::new(Mutex::new(ChatStore::new())),
            store,
            batcher,
            flow,
            credentials,
            channel,
            sync,
            active_run: Arc::new(Mutex::new(None)),
        }
    }

    /// Load the durable store into the in-memory conversation model.
    /// Called once at startup.
    pub async fn hydrate(&self) -> braid_store::error::Result<()> {
        let threads = self.store.list_threads().await?;
        let mut chat = self.chat.lock().await;
        for thread in threads {
            let items = self.store.list_items(&thread.id).await?;
            chat.upsert_thread(thread);
            for item in items {
                chat.upsert_item(item);
            }
        }
        Ok(())
    }

    /// Abort whatever run is active and register the new one.
    pub async fn replace_active_run(&self, run: ActiveRun) {
        let mut active = self.active_run.lock().await;
        if let Some(previous) = active.take() {
            tracing::debug!(
                thread_item_id = %previous.thread_item_id,
                "aborting previous run before starting a new one"
            );
            previous.cancel.cancel();
        }
        *active = Some(run);
    }

    /// Clear the guard if it still refers to `thread_item_id`.
    pub async fn finish_run(&self, thread_item_id: &str) {
        let mut active = self.active_run.lock().await;
        if active
            .as_ref()
            .is_some_and(|run| run.thread_item_id == thread_item_id)
        {
            *active = None;
        }
    }

    /// Abort the active run, if any. Returns whether one was running.
    pub async fn abort_active_run(&self) -> bool {
        let mut active = self.active_run.lock().await;
        match active.take() {
            Some(run) => {
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }
}
