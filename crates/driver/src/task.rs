use anyhow::Result;
use async_trait::async_trait;
use harness::{RequestEvents, Task, UserContext};
use llm::{ModelInvoker, ModelResponse, PreparedRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

pub const REQUEST_TYPE: &str = "[Send]";
pub const REQUEST_NAME: &str = "Prompt";

#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub raw: Vec<u8>,
    pub response: ModelResponse,
    pub elapsed: Duration,
}

impl InvocationResult {
    pub fn text(&self) -> &str {
        // decode() already rejected responses without generated text
        self.response.text().unwrap_or_default()
    }
}

/// Sends the prepared request once per run and times it as `[Send] Prompt`.
pub struct LoadTask {
    invoker: Arc<dyn ModelInvoker>,
    request: Arc<PreparedRequest>,
}

impl LoadTask {
    pub fn new(invoker: Arc<dyn ModelInvoker>, request: Arc<PreparedRequest>) -> Self {
        Self { invoker, request }
    }

    /// Invokes the model inside a measurement span. Errors are recorded as a
    /// failed request and then returned as-is.
    pub async fn generate(&self, events: &RequestEvents) -> Result<InvocationResult> {
        let span = events.span(REQUEST_TYPE, REQUEST_NAME);
        let result = self.invoke_and_decode().await;
        match &result {
            Ok(invocation) => span.success(invocation.raw.len()),
            Err(e) => span.failure(e),
        }
        result
    }

    async fn invoke_and_decode(&self) -> Result<InvocationResult> {
        let started = Instant::now();
        let raw = self.invoker.invoke(&self.request).await?;
        let response = ModelResponse::decode(self.request.format, &raw)?;
        let elapsed = started.elapsed();

        info!("{}", response.text()?);
        Ok(InvocationResult {
            raw,
            response,
            elapsed,
        })
    }
}

#[async_trait]
impl Task for LoadTask {
    fn name(&self) -> &str {
        "generation"
    }

    async fn run(&self, ctx: &UserContext) -> Result<()> {
        self.generate(&ctx.events).await?;
        info!(user_id = ctx.user_id, "Finished generation!");
        Ok(())
    }
}
