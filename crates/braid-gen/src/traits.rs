use std::pin::Pin;

use async_trait::async_trait;
use braid_types::ChatMessage;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Incremental output from a generation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum GenDelta {
    /// Answer text token(s).
    Text { content: String },
    /// Auxiliary reasoning token(s), kept separate from the answer.
    Reasoning { content: String },
    /// Usage totals, usually arriving once near the end of the stream.
    Usage { total_tokens: u64 },
    Done { finish_reason: Option<String> },
}

pub type GenStream = Pin<Box<dyn Stream<Item = Result<GenDelta>> + Send>>;

/// Uniform "generate text/object" capability. Vendor SDKs stay outside
/// this boundary; the workflow only ever sees this trait.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Streaming text generation.
    async fn generate_stream(&self, request: GenerationRequest) -> Result<GenStream>;

    /// One-shot structured output (used for suggestions and titles).
    async fn generate_object(&self, request: GenerationRequest) -> Result<Value>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageContent {
    pub link: String,
    pub content: String,
}

/// Web search and page reading capability used by the retrieval task.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    async fn read_pages(&self, links: &[String]) -> Result<Vec<PageContent>>;
}

/// Placeholder search backend used when no retrieval API is configured:
/// search runs but grounds nothing.
pub struct DisabledSearch;

#[async_trait]
impl SearchClient for DisabledSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        tracing::debug!(query, "search requested but no search backend is configured");
        Ok(Vec::new())
    }

    async fn read_pages(&self, _links: &[String]) -> Result<Vec<PageContent>> {
        Ok(Vec::new())
    }
}
