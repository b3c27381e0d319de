//! Run workflow behind the "Run Agent" button.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::agent::{AgentRequest, AgentRuntime, ModelHandle, ReactAgent};
use crate::config::{Config, Credentials};
use crate::llm::OpenAiClient;
use crate::tools::{SearchProvider, SearchTool, SerpApiClient, ToolRegistry};

use super::render::{LogRenderer, PageEvent, PageSink};

pub const DEFAULT_PRODUCT_1: &str = "Nike Pegasus";
pub const DEFAULT_PRODUCT_2: &str = "Adidas Ultraboost";

pub const SUMMARY_HEADING: &str = "Marketing Summary";
pub const MISSING_KEYS_MESSAGE: &str = "Please enter both API keys.";
pub const RUNNING_MESSAGE: &str = "Running the agent... this may take a few seconds.";
pub const COMPLETED_MESSAGE: &str = "Agent completed the task.";

/// Fields submitted from the page.
///
/// A blank product name falls back to its default, so a cleared field still
/// produces a meaningful comparison.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunForm {
    #[serde(default)]
    pub product1: Option<String>,
    #[serde(default)]
    pub product2: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
}

impl RunForm {
    pub fn products(product1: impl Into<String>, product2: impl Into<String>) -> Self {
        Self {
            product1: Some(product1.into()),
            product2: Some(product2.into()),
            ..Default::default()
        }
    }

    fn product_names(&self) -> (String, String) {
        fn or_default(value: &Option<String>, default: &str) -> String {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => default.to_string(),
            }
        }

        (
            or_default(&self.product1, DEFAULT_PRODUCT_1),
            or_default(&self.product2, DEFAULT_PRODUCT_2),
        )
    }
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The agent produced a summary.
    Completed(String),
    /// The agent or one of its collaborators failed.
    Failed(String),
    /// Input was invalid; nothing ran.
    Rejected(String),
    /// Another run is in flight.
    Busy,
}

/// Builds the external collaborators for a run from explicit credentials.
pub trait RunBackend: Send + Sync {
    fn search(&self, credentials: &Credentials) -> anyhow::Result<Arc<dyn SearchProvider>>;

    fn model(&self, credentials: &Credentials) -> anyhow::Result<ModelHandle>;

    fn runtime(&self) -> Arc<dyn AgentRuntime>;
}

/// SerpAPI + OpenAI + ReAct.
pub struct LiveBackend {
    config: Config,
}

impl LiveBackend {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}

impl RunBackend for LiveBackend {
    fn search(&self, credentials: &Credentials) -> anyhow::Result<Arc<dyn SearchProvider>> {
        Ok(Arc::new(SerpApiClient::new(
            credentials.serpapi_api_key.clone(),
            self.config.serpapi_base_url.clone(),
            self.timeout(),
        )?))
    }

    fn model(&self, credentials: &Credentials) -> anyhow::Result<ModelHandle> {
        let client = OpenAiClient::new(
            credentials.openai_api_key.clone(),
            self.config.openai_base_url.clone(),
            self.timeout(),
        )?;
        Ok(ModelHandle::deterministic(
            Arc::new(client),
            self.config.default_model.clone(),
        ))
    }

    fn runtime(&self) -> Arc<dyn AgentRuntime> {
        Arc::new(ReactAgent::new(self.config.max_iterations))
    }
}

/// Fill the fixed comparison template.
pub fn build_task_prompt(product1: &str, product2: &str) -> String {
    format!(
        "Compare {product1} and {product2} for a marketing campaign. \n\
         List 3 key product insights for each, and suggest a messaging idea for each insight.\n\
         Focus on what would be relevant to consumers choosing between them."
    )
}

/// Held for the whole duration of a run; dropping it frees the slot.
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Orchestrates one run per submission.
pub struct PageController {
    credentials: Credentials,
    backend: Arc<dyn RunBackend>,
    running: Arc<AtomicBool>,
}

impl PageController {
    /// `credentials` are the stored keys; page fields may override them per run.
    pub fn new(credentials: Credentials, backend: Arc<dyn RunBackend>) -> Self {
        Self {
            credentials,
            backend,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(config: Config) -> Self {
        let credentials = config.credentials.clone();
        Self::new(credentials, Arc::new(LiveBackend::new(config)))
    }

    /// Whether stored credentials are complete (page key fields optional).
    pub fn has_stored_credentials(&self) -> bool {
        self.credentials.is_complete()
    }

    /// Claim the single run slot, or `None` if a run is in flight.
    pub fn try_begin(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }

    /// Read-only; never contends with `try_begin`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the run slot and run.
    pub async fn submit(&self, form: RunForm, sink: Arc<dyn PageSink>) -> RunOutcome {
        match self.try_begin() {
            Some(permit) => self.run(&permit, form, sink).await,
            None => RunOutcome::Busy,
        }
    }

    /// Run the workflow under an already-claimed permit.
    ///
    /// All collaborator failures are caught here, once.
    pub async fn run(
        &self,
        _permit: &RunPermit,
        form: RunForm,
        sink: Arc<dyn PageSink>,
    ) -> RunOutcome {
        let credentials = self.credentials.overridden_by(
            form.openai_api_key.as_deref(),
            form.serpapi_api_key.as_deref(),
        );

        if !credentials.is_complete() {
            tracing::info!("Run rejected: missing API keys");
            notify(&sink, PageEvent::Error {
                message: MISSING_KEYS_MESSAGE.to_string(),
            });
            return RunOutcome::Rejected(MISSING_KEYS_MESSAGE.to_string());
        }

        let (product1, product2) = form.product_names();
        tracing::info!(product1 = %product1, product2 = %product2, "Starting agent run");

        match self.execute(&credentials, &product1, &product2, &sink).await {
            Ok(summary) => {
                tracing::info!(chars = summary.chars().count(), "Agent run completed");
                notify(&sink, PageEvent::Success {
                    message: COMPLETED_MESSAGE.to_string(),
                });
                notify(&sink, PageEvent::Summary {
                    heading: SUMMARY_HEADING.to_string(),
                    content: summary.clone(),
                });
                RunOutcome::Completed(summary)
            }
            Err(e) => {
                let message = format!("Agent failed: {}", e);
                tracing::warn!(error = %e, "Agent run failed");
                notify(&sink, PageEvent::Error {
                    message: message.clone(),
                });
                RunOutcome::Failed(message)
            }
        }
    }

    async fn execute(
        &self,
        credentials: &Credentials,
        product1: &str,
        product2: &str,
        sink: &Arc<dyn PageSink>,
    ) -> anyhow::Result<String> {
        sink.emit(PageEvent::Info {
            message: RUNNING_MESSAGE.to_string(),
        })?;

        let search = self.backend.search(credentials)?;
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(SearchTool::new(search)))?;

        let request = AgentRequest {
            tools,
            model: self.backend.model(credentials)?,
            prompt: build_task_prompt(product1, product2),
            verbose: true,
            handle_parsing_errors: true,
        };

        let renderer = LogRenderer::new(sink.clone());
        self.backend.runtime().run(request, &renderer).await
    }
}

/// Emit an outcome event; a closed page only gets logged.
fn notify(sink: &Arc<dyn PageSink>, event: PageEvent) {
    let name = event.event_name();
    if let Err(e) = sink.emit(event) {
        tracing::warn!(event = name, error = %e, "Failed to deliver page event");
    }
}
