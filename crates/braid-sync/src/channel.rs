//! Cross-tab change notifications. Notes are advisory cache
//! invalidation: they carry identifiers, never data payloads, so a
//! tab that missed notes only re-reads more than strictly needed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "thread-update")]
    ThreadUpdate,
    #[serde(rename = "thread-item-update")]
    ThreadItemUpdate,
    #[serde(rename = "thread-delete")]
    ThreadDelete,
    #[serde(rename = "thread-item-delete")]
    ThreadItemDelete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNote {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub data: ChangeData,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeData {
    pub thread_id: String,
    /// Item id for item-level notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChangeNote {
    pub fn thread(kind: ChangeKind, thread_id: impl Into<String>) -> Self {
        Self {
            kind,
            data: ChangeData {
                thread_id: thread_id.into(),
                id: None,
            },
            timestamp: Utc::now(),
        }
    }

    pub fn item(kind: ChangeKind, thread_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            data: ChangeData {
                thread_id: thread_id.into(),
                id: Some(id.into()),
            },
            timestamp: Utc::now(),
        }
    }
}

/// Incoming notes for one subscriber.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeNote>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<ChangeNote> {
        self.rx.recv().await
    }
}

/// Fan-out of change notes between tabs of one process.
pub trait ChangeChannel: Send + Sync {
    fn publish(&self, note: ChangeNote);
    fn subscribe(&self) -> Subscription;
}

/// Primary channel: direct fan-out over a tokio broadcast bus.
pub struct BroadcastChannel {
    tx: broadcast::Sender<ChangeNote>,
}

impl BroadcastChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl ChangeChannel for BroadcastChannel {
    fn publish(&self, note: ChangeNote) {
        // No subscribers is not an error.
        let _ = self.tx.send(note);
    }

    fn subscribe(&self) -> Subscription {
        let mut source = self.tx.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(note) => {
                        if tx.send(note).is_err() {
                            break;
                        }
                    }
                    // Lagging subscribers skip ahead; notes are only
                    // invalidation hints.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { rx }
    }
}

/// Maximum notes retained in the polling journal.
const JOURNAL_CAP: usize = 256;

/// Fallback channel for environments without a shared bus: publishers
/// append to a bounded journal, subscribers poll it on an interval.
pub struct PollingChannel {
    journal: Arc<RwLock<Vec<ChangeNote>>>,
    interval: Duration,
}

impl PollingChannel {
    pub fn new(interval: Duration) -> Self {
        Self {
            journal: Arc::new(RwLock::new(Vec::new())),
            interval,
        }
    }
}

impl ChangeChannel for PollingChannel {
    fn publish(&self, note: ChangeNote) {
        let journal = Arc::clone(&self.journal);
        tokio::spawn(async move {
            let mut guard = journal.write().await;
            guard.push(note);
            if guard.len() > JOURNAL_CAP {
                let excess = guard.len() - JOURNAL_CAP;
                guard.drain(..excess);
            }
        });
    }

    fn subscribe(&self) -> Subscription {
        let journal = Arc::clone(&self.journal);
        let interval = self.interval;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            // Start past the existing journal: only new notes matter.
            let mut cursor = journal.read().await.len();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let guard = journal.read().await;
                // Journal trimming may have moved the cursor past the end.
                let start = cursor.min(guard.len());
                for note in &guard[start..] {
                    if tx.send(note.clone()).is_err() {
                        return;
                    }
                }
                cursor = guard.len();
            }
        });
        Subscription { rx }
    }
}

/// Pick the channel implementation at startup: the broadcast bus when
/// the environment supports it, journal polling otherwise.
pub fn select_channel(broadcast_available: bool, poll_interval: Duration) -> Arc<dyn ChangeChannel> {
    if broadcast_available {
        tracing::info!("change channel: broadcast");
        Arc::new(BroadcastChannel::new(64))
    } else {
        tracing::info!("change channel: polling fallback");
        Arc::new(PollingChannel::new(poll_interval))
    }
}
