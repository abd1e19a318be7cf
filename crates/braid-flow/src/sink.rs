use std::sync::Arc;

use braid_types::{ChatEvent, EventEnvelope};
use tokio::sync::mpsc;

/// Hook fired for every event regardless of type, before it enters the
/// channel. Drives side channels like persistence without a second
/// consumer on the stream.
pub type OnAllHook = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// Attributes every event with the run's identity and forwards it to
/// the run's channel. Dropped receivers are tolerated: a client that
/// went away must not fail the run.
#[derive(Clone)]
pub struct EventSink {
    thread_id: String,
    thread_item_id: String,
    parent_thread_item_id: Option<String>,
    tx: mpsc::Sender<EventEnvelope>,
    on_all: Option<OnAllHook>,
}

impl EventSink {
    pub fn new(
        thread_id: impl Into<String>,
        thread_item_id: impl Into<String>,
        parent_thread_item_id: Option<String>,
        tx: mpsc::Sender<EventEnvelope>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            thread_item_id: thread_item_id.into(),
            parent_thread_item_id,
            tx,
            on_all: None,
        }
    }

    pub fn with_on_all(mut self, hook: OnAllHook) -> Self {
        self.on_all = Some(hook);
        self
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn thread_item_id(&self) -> &str {
        &self.thread_item_id
    }

    pub async fn send(&self, event: ChatEvent) {
        let envelope = EventEnvelope::new(
            self.thread_id.clone(),
            self.thread_item_id.clone(),
            self.parent_thread_item_id.clone(),
            event,
        );
        if let Some(hook) = &self.on_all {
            hook(&envelope);
        }
        if self.tx.send(envelope).await.is_err() {
            tracing::debug!(
                thread_item_id = %self.thread_item_id,
                "event receiver dropped, discarding event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_types::AnswerDelta;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn events_carry_run_identity() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = EventSink::new("t1", "i1", Some("p1".into()), tx);

        sink.send(ChatEvent::Answer(AnswerDelta::delta("hi"))).await;
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.thread_id, "t1");
        assert_eq!(envelope.thread_item_id, "i1");
        assert_eq!(envelope.parent_thread_item_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn on_all_fires_for_every_event() {
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, _rx) = mpsc::channel(8);
        let hook = {
            let count = Arc::clone(&count);
            Arc::new(move |_: &EventEnvelope| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        let sink = EventSink::new("t1", "i1", None, tx).with_on_all(hook);

        sink.send(ChatEvent::Answer(AnswerDelta::delta("a"))).await;
        sink.send(ChatEvent::Suggestions(vec!["b".into()])).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_fail_send() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = EventSink::new("t1", "i1", None, tx);
        sink.send(ChatEvent::Answer(AnswerDelta::delta("hi"))).await;
    }
}
