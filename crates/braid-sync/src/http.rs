use async_trait::async_trait;
use braid_types::{Thread, ThreadItem};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::{RemoteError, Result};
use crate::remote::RemoteStore;

#[derive(Serialize)]
struct ThreadPayload<'a> {
    thread: &'a Thread,
    items: &'a [ThreadItem],
}

/// Remote store over plain HTTP. The backend exposes thread-level
/// endpoints; item granularity stays local.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check(status: StatusCode) -> Result<()> {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
            status if status.is_success() => Ok(()),
            status => Err(RemoteError::Backend(format!(
                "remote returned {status}"
            ))),
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn upsert_thread(&self, thread: &Thread, items: &[ThreadItem]) -> Result<()> {
        let url = format!("{}/threads/{}", self.base_url, thread.id);
        let response = self
            .authorize(self.client.put(&url))
            .json(&ThreadPayload { thread, items })
            .send()
            .await?;
        Self::check(response.status())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let url = format!("{}/threads/{}", self.base_url, thread_id);
        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check(response.status())
    }

    async fn delete_item(&self, thread_id: &str, item_id: &str) -> Result<()> {
        let url = format!(
            "{}/threads/{}/items/{}",
            self.base_url, thread_id, item_id
        );
        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_unauthorized() {
        assert!(matches!(
            HttpRemoteStore::check(StatusCode::UNAUTHORIZED),
            Err(RemoteError::Unauthorized)
        ));
        assert!(matches!(
            HttpRemoteStore::check(StatusCode::FORBIDDEN),
            Err(RemoteError::Unauthorized)
        ));
        assert!(HttpRemoteStore::check(StatusCode::OK).is_ok());
        assert!(matches!(
            HttpRemoteStore::check(StatusCode::INTERNAL_SERVER_ERROR),
            Err(RemoteError::Backend(_))
        ));
    }
}
