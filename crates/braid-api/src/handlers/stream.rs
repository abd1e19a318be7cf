use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::Response;
use axum::Json;
use braid_sync::{ChangeKind, ChangeNote};
use braid_types::{CompletionRequest, EventEnvelope, Thread, ThreadItem};
use braid_wire::{FrameSender, StreamReducer};
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{ApiError, ApiResult};
use crate::state::{ActiveRun, AppState};

/// Run a completion and stream progress frames back as
/// `text/event-stream`. Starting a run aborts whichever run was active.
pub async fn completion(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompletionRequest>,
) -> ApiResult<Response> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".to_string()));
    }

    state.abort_active_run().await;

    let thread = ensure_thread(&state, &req).await?;
    let item = create_optimistic_item(&state, &req).await?;

    let (mut events, handle) = state.flow.spawn_run(req.clone());
    state
        .replace_active_run(ActiveRun {
            thread_item_id: item.id.clone(),
            cancel: handle.cancel_token(),
        })
        .await;

    // Outbound wire frames.
    let (frame_tx, frame_rx) = mpsc::channel::<String>(64);
    let mut frames = FrameSender::new(frame_tx);

    let pump_state = Arc::clone(&state);
    let thread_id = thread.id.clone();
    tokio::spawn(async move {
        let mut reducer = StreamReducer::new();
        reducer.track(item.clone());

        while let Some(envelope) = events.recv().await {
            frames.send_message(&envelope).await;
            apply_update(&pump_state, &mut reducer, &envelope, &thread_id).await;
        }

        pump_state.finish_run(&item.id).await;
        if let Some(sync) = &pump_state.sync {
            sync.note_thread_changed(&thread_id, false).await;
        }
    });

    let body = Body::from_stream(
        ReceiverStream::new(frame_rx).map(Ok::<_, Infallible>),
    );
    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(response)
}

async fn ensure_thread(state: &AppState, req: &CompletionRequest) -> ApiResult<Thread> {
    if let Some(mut thread) = state.store.get_thread(&req.thread_id).await? {
        thread.touch();
        state.store.upsert_thread(&thread).await?;
        state.chat.lock().await.upsert_thread(thread.clone());
        return Ok(thread);
    }

    // First message of a new conversation: the thread is created with
    // the client-supplied id so later frames attribute correctly.
    let mut thread = Thread::new(initial_title(&req.prompt));
    thread.id = req.thread_id.clone();
    state.store.upsert_thread(&thread).await?;
    state.chat.lock().await.upsert_thread(thread.clone());
    state
        .channel
        .publish(ChangeNote::thread(ChangeKind::ThreadUpdate, &thread.id));
    if let Some(sync) = &state.sync {
        sync.note_thread_changed(&thread.id, true).await;
    }
    Ok(thread)
}

fn initial_title(prompt: &str) -> String {
    const MAX_TITLE_CHARS: usize = 60;
    let title: String = prompt.chars().take(MAX_TITLE_CHARS).collect();
    if title.len() < prompt.len() {
        format!("{title}…")
    } else {
        title
    }
}

/// Create the QUEUED item before any network activity so the UI can
/// render immediately and every stream frame has a merge target.
async fn create_optimistic_item(
    state: &AppState,
    req: &CompletionRequest,
) -> ApiResult<ThreadItem> {
    let mut item = ThreadItem::new(&req.thread_id, &req.prompt, req.mode);
    item.id = req.thread_item_id.clone();
    item.parent_id = req.parent_thread_item_id.clone();
    item.image_attachment = req.image_attachment.clone();
    if let Some(requested) = req.requested_mode {
        item.metadata
            .insert("requestedMode".to_string(), json!(requested));
    }
    if let Some(reason) = &req.mode_selection_reason {
        item.metadata
            .insert("selectionReason".to_string(), json!(reason));
    }

    state.store.upsert_item(&item).await?;
    state.chat.lock().await.upsert_item(item.clone());
    state.channel.publish(ChangeNote::item(
        ChangeKind::ThreadItemUpdate,
        &req.thread_id,
        &item.id,
    ));
    Ok(item)
}

/// Apply one stream event to the conversation model. In-memory state
/// updates on every event; durable writes follow the reducer's
/// throttle, with terminal updates written straight through.
async fn apply_update(
    state: &AppState,
    reducer: &mut StreamReducer,
    envelope: &EventEnvelope,
    thread_id: &str,
) {
    let Some(update) = reducer.apply(envelope) else {
        return;
    };

    state.chat.lock().await.upsert_item(update.item.clone());

    if update.terminal {
        // Drain queued interim snapshots first so the terminal write
        // lands last; flushing afterwards would clobber it with a
        // stale non-terminal state.
        state.batcher.flush_now().await;
        if let Err(e) = state.store.upsert_item(&update.item).await {
            tracing::error!(
                item_id = %update.item.id,
                "failed to persist terminal item state: {}",
                e
            );
        }
    } else if update.persist {
        state.batcher.queue(update.item.clone()).await;
    }

    if update.persist || update.terminal {
        state.channel.publish(ChangeNote::item(
            ChangeKind::ThreadItemUpdate,
            thread_id,
            &update.item.id,
        ));
    }
}
