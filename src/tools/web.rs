//! Web search backed by SerpAPI's Google engine.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::SearchProvider;

const NO_RESULT: &str = "No good search result found";

/// SerpAPI client. The key is passed in explicitly per run.
pub struct SerpApiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl SerpApiClient {
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

    async fn fetch(&self, query: &str) -> anyhow::Result<Value> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("google_domain", "google.com"),
                ("gl", "us"),
                ("hl", "en"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Invalid search response ({}): {}", status, e))?;

        // SerpAPI reports quota/auth problems in an `error` field, sometimes with 200.
        if let Some(err) = body["error"].as_str() {
            return Err(anyhow::anyhow!("Got error from SerpAPI: {}", err));
        }
        if !status.is_success() {
            return Err(anyhow::anyhow!("HTTP error: {}", status));
        }

        Ok(body)
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn run(&self, query: &str) -> anyhow::Result<String> {
        let body = self.fetch(query).await?;
        Ok(extract_answer(&body))
    }
}

/// Pick the most direct answer from a SerpAPI result page.
fn extract_answer(body: &Value) -> String {
    let answer_box = match &body["answer_box"] {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };

    if let Some(answer) = answer_box["answer"].as_str() {
        return answer.to_string();
    }
    if let Some(snippet) = answer_box["snippet"].as_str() {
        return snippet.to_string();
    }
    if let Some(word) = answer_box["snippet_highlighted_words"][0].as_str() {
        return word.to_string();
    }

    let spotlight = &body["sports_results"]["game_spotlight"];
    if !spotlight.is_null() {
        return value_text(spotlight);
    }

    if let Some(title) = body["shopping_results"][0]["title"].as_str() {
        return title.to_string();
    }

    if let Some(description) = body["knowledge_graph"]["description"].as_str() {
        return description.to_string();
    }

    let snippets: Vec<&str> = body["organic_results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r["snippet"].as_str())
                .filter(|s| !s.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();

    if snippets.is_empty() {
        NO_RESULT.to_string()
    } else {
        format!(
            "[{}]",
            snippets
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
