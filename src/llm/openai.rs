//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatResponse, CompletionOptions, LlmClient, TokenUsage};

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("insight-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn a raw completion body into a `ChatResponse`.
fn parse_completion(body: &str) -> anyhow::Result<ChatResponse> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("Malformed completion response: {}", e))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Completion response contained no choices"))?;

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: parsed.usage,
    })
}

/// Best-effort extraction of the provider's error message.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = CompletionRequest {
            model,
            messages,
            temperature: options.temperature,
            stop: (!options.stop.is_empty()).then_some(options.stop.as_slice()),
        };

        tracing::debug!(model = %model, messages = messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "LLM request failed ({}): {}",
                status,
                error_message(&body)
            ));
        }

        let parsed = parse_completion(&body)?;
        if let Some(usage) = parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn parse_completion_extracts_first_choice() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Thought: search"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;
        let parsed = parse_completion(body).expect("valid body");
        assert_eq!(parsed.content, "Thought: search");
        assert_eq!(parsed.finish_reason.as_deref(), Some("stop"));
        assert!(!parsed.is_truncated());
        assert_eq!(
            parsed.usage,
            Some(TokenUsage {
                prompt_tokens: 12,
                completion_tokens: 3
            })
        );
    }

    #[test]
    fn parse_completion_without_choices_fails() {
        let err = parse_completion(r#"{"choices": []}"#).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn parse_completion_null_content_is_empty() {
        let body = r#"{"choices": [{"message": {"content": null}, "finish_reason": "length"}]}"#;
        let parsed = parse_completion(body).expect("valid body");
        assert!(parsed.content.is_empty());
        assert!(parsed.is_truncated());
    }

    #[test]
    fn error_message_prefers_provider_message() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
        assert_eq!(error_message(body), "Rate limit reached");
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[test]
    fn request_omits_empty_stop_list() {
        let messages = vec![ChatMessage::user("hi")];
        let request = CompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            temperature: 0.0,
            stop: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("stop").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn completions_url_joins_base() {
        let client = OpenAiClient::new(
            "sk".to_string(),
            "http://localhost:1234/v1/".to_string(),
            Duration::from_secs(5),
        )
        .expect("client");
        assert_eq!(
            client.completions_url(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn chat_completion_round_trip_against_local_server() {
        use axum::http::HeaderMap;
        use serde_json::{json, Value};

        let router = axum::Router::new().route(
            "/v1/chat/completions",
            axum::routing::post(|headers: HeaderMap, axum::Json(body): axum::Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer sk-local")
                );
                assert_eq!(body["temperature"], 0.0);
                assert_eq!(body["stop"][0], "\nObservation:");
                axum::Json(json!({
                    "choices": [{"message": {"content": "Final Answer: ok"}, "finish_reason": "stop"}]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = OpenAiClient::new(
            "sk-local".to_string(),
            format!("http://{}/v1", addr),
            Duration::from_secs(5),
        )
        .unwrap();
        let options = CompletionOptions {
            temperature: 0.0,
            stop: vec!["\nObservation:".to_string()],
        };
        let response = client
            .chat_completion("gpt-3.5-turbo", &[ChatMessage::user("hi")], &options)
            .await
            .unwrap();
        assert_eq!(response.content, "Final Answer: ok");
    }

    #[tokio::test]
    async fn chat_completion_reports_provider_error() {
        use serde_json::json;

        let router = axum::Router::new().route(
            "/v1/chat/completions",
            axum::routing::post(|| async {
                (
                    axum::http::StatusCode::TOO_MANY_REQUESTS,
                    axum::Json(json!({"error": {"message": "rate limited"}})),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = OpenAiClient::new(
            "sk".to_string(),
            format!("http://{}/v1", addr),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client
            .chat_completion("m", &[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }
}
