use crate::models::{MessagesRequest, RequestPayload, TextCompletionRequest, ANTHROPIC_VERSION};
use anyhow::{Context, Result};
use loadtest_core::config::{ModelConfig, PayloadConfig, PayloadFormat};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Everything `InvokeModel` needs, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub model_id: String,
    pub accept: String,
    pub content_type: String,
    pub body: Vec<u8>,
    pub format: PayloadFormat,
}

pub struct RequestPayloadBuilder<'a> {
    model: &'a ModelConfig,
    payload: &'a PayloadConfig,
}

impl<'a> RequestPayloadBuilder<'a> {
    pub fn new(model: &'a ModelConfig, payload: &'a PayloadConfig) -> Self {
        Self { model, payload }
    }

    pub fn payload(&self) -> RequestPayload {
        let model = self.model;
        match self.payload.format {
            PayloadFormat::TextCompletion => RequestPayload::TextCompletion(TextCompletionRequest {
                prompt: self.payload.prompt(model.max_tokens),
                max_tokens_to_sample: model.max_tokens,
                temperature: model.temperature,
                top_p: model.top_p,
            }),
            PayloadFormat::Messages => RequestPayload::Messages(MessagesRequest {
                anthropic_version: ANTHROPIC_VERSION.to_string(),
                messages: self.payload.messages(),
                system: self.payload.system(model.max_tokens),
                max_tokens: model.max_tokens,
                temperature: model.temperature,
                top_p: model.top_p,
            }),
        }
    }

    pub fn build(&self) -> Result<PreparedRequest> {
        let payload = self.payload();
        let body = serde_json::to_vec(&payload).context("Failed to serialize request payload")?;

        Ok(PreparedRequest {
            model_id: self.model.id.clone(),
            accept: JSON_CONTENT_TYPE.to_string(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            body,
            format: payload.format(),
        })
    }
}
