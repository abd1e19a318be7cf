use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use braid_sync::{ChangeKind, ChangeNote};
use braid_types::{Thread, ThreadItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<Thread>)> {
    let thread = Thread::new(req.title.unwrap_or_else(|| "New chat".to_string()));

    state.store.upsert_thread(&thread).await?;
    state.chat.lock().await.upsert_thread(thread.clone());
    state
        .channel
        .publish(ChangeNote::thread(ChangeKind::ThreadUpdate, &thread.id));
    if let Some(sync) = &state.sync {
        sync.note_thread_changed(&thread.id, true).await;
    }

    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list_threads(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Thread>>> {
    // Sidebar ordering: pinned first, then newest first.
    let chat = state.chat.lock().await;
    let threads = chat.list_threads().into_iter().cloned().collect();
    Ok(Json(threads))
}

pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let thread = state
        .store
        .get_thread(&thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("thread {thread_id}")))?;
    Ok(Json(thread))
}

pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.chat.lock().await.delete_thread(&thread_id)?;
    state.store.delete_thread(&thread_id).await?;

    state
        .channel
        .publish(ChangeNote::thread(ChangeKind::ThreadDelete, &thread_id));
    if let Some(sync) = &state.sync {
        sync.note_thread_deleted(&thread_id).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Vec<ThreadItem>>> {
    state
        .store
        .get_thread(&thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("thread {thread_id}")))?;
    let items = state.store.list_items(&thread_id).await?;
    Ok(Json(items))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItemResponse {
    /// The deleted item was the thread's last one, so the thread is
    /// gone too and the client must navigate away.
    pub thread_removed: bool,
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path((thread_id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteItemResponse>> {
    let item = state
        .store
        .get_item(&item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("thread item {item_id}")))?;
    if item.thread_id != thread_id {
        return Err(ApiError::BadRequest(format!(
            "item {item_id} does not belong to thread {thread_id}"
        )));
    }

    let outcome = state.chat.lock().await.delete_item(&item_id)?;
    state.store.delete_item(&item_id).await?;

    if outcome.thread_removed {
        // The in-memory model already dropped the thread; mirror it.
        if let Err(e) = state.store.delete_thread(&thread_id).await {
            tracing::warn!(thread_id, "thread cleanup after last-item delete failed: {}", e);
        }
        state
            .channel
            .publish(ChangeNote::thread(ChangeKind::ThreadDelete, &thread_id));
        if let Some(sync) = &state.sync {
            sync.note_thread_deleted(&thread_id).await;
        }
    } else {
        state.channel.publish(ChangeNote::item(
            ChangeKind::ThreadItemDelete,
            &thread_id,
            &item_id,
        ));
        if let Some(sync) = &state.sync {
            sync.note_item_deleted(&thread_id, &item_id).await;
        }
    }

    Ok(Json(DeleteItemResponse {
        thread_removed: outcome.thread_removed,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBranchResponse {
    pub branch_root_id: String,
    pub selected_item_id: String,
}

/// Change which sibling of the item's branch group is displayed.
pub async fn select_branch(
    State(state): State<Arc<AppState>>,
    Path((thread_id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<SelectBranchResponse>> {
    let mut chat = state.chat.lock().await;
    let root_id = chat
        .get_item(&item_id)
        .filter(|item| item.thread_id == thread_id)
        .map(|item| item.effective_branch_root().to_string())
        .ok_or_else(|| ApiError::NotFound(format!("thread item {item_id}")))?;

    chat.select_branch(&root_id, &item_id)?;

    Ok(Json(SelectBranchResponse {
        branch_root_id: root_id,
        selected_item_id: item_id,
    }))
}
