//! HTTP routes: the page, health, and the streamed run.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::page::{ChannelPage, PageController, PageEvent, PageSink};

use super::types::{ErrorResponse, HealthResponse, RunRequest};

const INDEX_HTML: &str = include_str!("page.html");

/// Shared application state.
pub struct AppState {
    pub controller: Arc<PageController>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/run", post(run))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credentials_configured: state.controller.has_stored_credentials(),
        running: state.controller.is_running(),
    })
}

/// Start a run and stream its page events via SSE.
///
/// Only one run may be in flight; a concurrent submission gets 409.
async fn run(State(state): State<Arc<AppState>>, Json(req): Json<RunRequest>) -> Response {
    let Some(permit) = state.controller.try_begin() else {
        tracing::info!("Run refused: another run is in progress");
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "A run is already in progress".to_string(),
            }),
        )
            .into_response();
    };

    let run_id = Uuid::new_v4();
    let (page, rx) = ChannelPage::new();
    let page: Arc<dyn PageSink> = Arc::new(page);
    let controller = state.controller.clone();

    tokio::spawn(async move {
        tracing::info!(run_id = %run_id, "Run started");
        let outcome = controller.run(&permit, req, page.clone()).await;
        tracing::info!(run_id = %run_id, outcome = ?outcome, "Run finished");
        // Dropping the permit re-enables submissions.
        drop(permit);
        if page.emit(PageEvent::Done).is_err() {
            tracing::debug!(run_id = %run_id, "Client left before run finished");
        }
    });

    Sse::new(event_stream(rx))
        .keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(15)).text("keepalive"))
        .into_response()
}

fn event_stream(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<PageEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(ev) = rx.recv().await {
            let last = matches!(ev, PageEvent::Done);
            match Event::default().event(ev.event_name()).json_data(&ev) {
                Ok(sse) => yield Ok(sse),
                Err(e) => {
                    tracing::error!(event = %ev.event_name(), error = %e, "Failed to serialize page event; dropping");
                }
            }
            if last {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentCallbacks, AgentRequest, AgentRuntime, ModelHandle};
    use crate::config::Credentials;
    use crate::llm::{ChatMessage, ChatResponse, CompletionOptions, LlmClient};
    use crate::page::RunBackend;
    use crate::tools::SearchProvider;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct EchoSearch;

    #[async_trait]
    impl SearchProvider for EchoSearch {
        async fn run(&self, query: &str) -> anyhow::Result<String> {
            Ok(query.to_string())
        }
    }

    struct SilentLlm;

    #[async_trait]
    impl LlmClient for SilentLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> anyhow::Result<ChatResponse> {
            Ok(ChatResponse::default())
        }
    }

    struct OneStep;

    #[async_trait]
    impl AgentRuntime for OneStep {
        async fn run(
            &self,
            _request: AgentRequest,
            callbacks: &dyn AgentCallbacks,
        ) -> anyhow::Result<String> {
            callbacks.on_text("comparing")?;
            Ok("Nike: ...; Adidas: ...".to_string())
        }
    }

    struct Backend;

    impl RunBackend for Backend {
        fn search(&self, _credentials: &Credentials) -> anyhow::Result<Arc<dyn SearchProvider>> {
            Ok(Arc::new(EchoSearch))
        }

        fn model(&self, _credentials: &Credentials) -> anyhow::Result<ModelHandle> {
            Ok(ModelHandle::deterministic(Arc::new(SilentLlm), "stub"))
        }

        fn runtime(&self) -> Arc<dyn AgentRuntime> {
            Arc::new(OneStep)
        }
    }

    fn app(credentials: Credentials) -> (Router, Arc<PageController>) {
        let controller = Arc::new(PageController::new(credentials, Arc::new(Backend)));
        let state = Arc::new(AppState {
            controller: controller.clone(),
        });
        (router(state), controller)
    }

    fn run_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/run")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_serves_page() {
        let (app, _) = app(Credentials::default());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Agentic AI for Marketing: Product Comparison"));
        assert!(html.contains("Nike Pegasus"));
        assert!(html.contains("Adidas Ultraboost"));
        assert!(html.contains("renderInline(block.markdown"));
    }

    #[tokio::test]
    async fn health_reports_credentials() {
        let (app, _) = app(Credentials::new("sk", "serp"));
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["credentials_configured"], true);
        assert_eq!(json["running"], false);
    }

    #[tokio::test]
    async fn run_streams_log_and_summary() {
        let (app, _) = app(Credentials::new("sk", "serp"));
        let response = app
            .oneshot(run_request(r#"{"product1":"Nike Pegasus","product2":"Adidas Ultraboost"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        let info = body.find("event: info").expect("info event");
        let log = body.find("event: log").expect("log event");
        let summary = body.find("event: summary").expect("summary event");
        let done = body.find("event: done").expect("done event");
        assert!(info < log && log < summary && summary < done);
        assert!(body.contains("Agent Thought: comparing"));
        assert!(body.contains(r#""markdown":"**Agent Thought:** comparing""#));
        assert!(body.contains("Marketing Summary"));
        assert!(body.contains("Nike: ...; Adidas: ..."));
    }

    #[tokio::test]
    async fn run_without_keys_streams_validation_error() {
        let (app, _) = app(Credentials::default());
        let response = app.oneshot(run_request("{}")).await.unwrap();
        let body = body_text(response).await;
        assert!(body.contains("event: error"));
        assert!(body.contains("Please enter both API keys."));
        assert!(!body.contains("event: summary"));
    }

    #[tokio::test]
    async fn concurrent_run_is_conflict() {
        let (app, controller) = app(Credentials::new("sk", "serp"));
        let _permit = controller.try_begin().expect("permit");

        let response = app.oneshot(run_request("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_json_is_rejected() {
        let (app, controller) = app(Credentials::new("sk", "serp"));
        let response = app.oneshot(run_request("{not json")).await.unwrap();
        assert!(response.status().is_client_error());
        assert!(!controller.is_running());
    }
}
