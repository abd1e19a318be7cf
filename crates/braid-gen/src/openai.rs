// OpenAI-compatible chat-completions client (HTTP direct, no SDK).
//
// Every provider in the catalog exposes this wire shape behind some
// base URL, so one client covers all of them; only the base URL and
// key differ.

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use async_trait::async_trait;
use braid_types::MessageRole;

use crate::error::{GenError, Result};
use crate::sse::LineBuffer;
use crate::traits::{GenDelta, GenStream, GenerationClient, GenerationRequest};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatClient {
    http_client: reqwest::Client,
    base_url: String,
    authenticated: bool,
}

impl OpenAiCompatClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, OPENAI_API_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let authenticated = !api_key.is_empty();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if authenticated {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key))
                    .map_err(|_| GenError::Payload("Invalid API key format".to_string()))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GenError::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            authenticated,
        })
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": role_str(msg.role),
                    "content": msg.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
        });
        let obj = body.as_object_mut().expect("body is an object");
        if stream {
            obj.insert(
                "stream_options".to_string(),
                serde_json::json!({ "include_usage": true }),
            );
        }
        if let Some(temperature) = request.temperature {
            obj.insert("temperature".to_string(), serde_json::json!(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            obj.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
        }
        body
    }

    async fn post_completions(&self, body: Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenError::Http(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GenError::RateLimited {
                authenticated: self.authenticated,
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenError::Http(format!("{}: {}", status, text)));
        }
        Ok(response)
    }

    /// Parse one SSE data line into deltas. Chunks may carry content,
    /// reasoning content, a finish reason, or trailing usage totals.
    fn parse_data_line(data: &str) -> Result<Vec<GenDelta>> {
        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| GenError::Payload(format!("bad stream chunk: {}", e)))?;

        let mut deltas = Vec::new();

        if let Some(choice) = chunk.get("choices").and_then(|c| c.get(0)) {
            let delta = choice.get("delta");
            if let Some(content) = delta
                .and_then(|d| d.get("content"))
                .and_then(Value::as_str)
            {
                if !content.is_empty() {
                    deltas.push(GenDelta::Text {
                        content: content.to_string(),
                    });
                }
            }
            if let Some(reasoning) = delta
                .and_then(|d| d.get("reasoning_content"))
                .and_then(Value::as_str)
            {
                if !reasoning.is_empty() {
                    deltas.push(GenDelta::Reasoning {
                        content: reasoning.to_string(),
                    });
                }
            }
            if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                deltas.push(GenDelta::Done {
                    finish_reason: Some(reason.to_string()),
                });
            }
        }

        if let Some(total) = chunk
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(Value::as_u64)
        {
            deltas.push(GenDelta::Usage {
                total_tokens: total,
            });
        }

        Ok(deltas)
    }
}

fn role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

#[async_trait]
impl GenerationClient for OpenAiCompatClient {
    async fn generate_stream(&self, request: GenerationRequest) -> Result<GenStream> {
        let body = self.build_request(&request, true);
        let response = self.post_completions(body).await?;
        let mut byte_stream = response.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut buffer = LineBuffer::with_capacity(4096);

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(GenError::Stream(e.to_string()));
                        return;
                    }
                };
                buffer.extend(&bytes);

                while let Some(line_result) = buffer.next_line() {
                    let line = match line_result {
                        Ok(line) => line,
                        Err(e) => {
                            yield Err(GenError::Stream(e.to_string()));
                            continue;
                        }
                    };
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        yield Ok(GenDelta::Done { finish_reason: None });
                        return;
                    }
                    match Self::parse_data_line(data) {
                        Ok(deltas) => {
                            for delta in deltas {
                                yield Ok(delta);
                            }
                        }
                        Err(e) => yield Err(e),
                    }
                }
            }
        }))
    }

    async fn generate_object(&self, request: GenerationRequest) -> Result<Value> {
        let mut body = self.build_request(&request, false);
        body["response_format"] = serde_json::json!({ "type": "json_object" });
        let response = self.post_completions(body).await?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenError::Payload(e.to_string()))?;
        let content = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| GenError::Payload("missing message content".to_string()))?;

        serde_json::from_str(content).map_err(|e| GenError::Payload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        let deltas = OpenAiCompatClient::parse_data_line(data).unwrap();
        assert_eq!(
            deltas,
            vec![GenDelta::Text {
                content: "Hello".to_string()
            }]
        );
    }

    #[test]
    fn parses_finish_and_usage() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"total_tokens":42}}"#;
        let deltas = OpenAiCompatClient::parse_data_line(data).unwrap();
        assert_eq!(deltas.len(), 2);
        assert!(matches!(deltas[0], GenDelta::Done { .. }));
        assert_eq!(
            deltas[1],
            GenDelta::Usage {
                total_tokens: 42
            }
        );
    }

    #[test]
    fn malformed_chunk_is_an_error() {
        assert!(OpenAiCompatClient::parse_data_line("not json").is_err());
    }
}
