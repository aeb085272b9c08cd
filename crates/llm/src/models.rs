use crate::error::DecodeError;
use loadtest_core::config::PayloadFormat;
use loadtest_core::Message;
use serde::{Deserialize, Serialize};

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Request body sent to `InvokeModel`, one variant per payload format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestPayload {
    TextCompletion(TextCompletionRequest),
    Messages(MessagesRequest),
}

impl RequestPayload {
    pub fn format(&self) -> PayloadFormat {
        match self {
            RequestPayload::TextCompletion(_) => PayloadFormat::TextCompletion,
            RequestPayload::Messages(_) => PayloadFormat::Messages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCompletionRequest {
    pub prompt: String,
    pub max_tokens_to_sample: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub anthropic_version: String,
    pub messages: Vec<Message>,
    pub system: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextCompletionResponse {
    pub completion: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Decoded model output, tagged by the format it was requested with.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    TextCompletion(TextCompletionResponse),
    Messages(MessagesResponse),
}

impl ModelResponse {
    /// Decodes `bytes` with the schema of `format` and checks the generated
    /// text is present.
    pub fn decode(format: PayloadFormat, bytes: &[u8]) -> Result<Self, DecodeError> {
        let response = match format {
            PayloadFormat::TextCompletion => {
                ModelResponse::TextCompletion(serde_json::from_slice(bytes)?)
            }
            PayloadFormat::Messages => ModelResponse::Messages(serde_json::from_slice(bytes)?),
        };
        response.text()?;
        Ok(response)
    }

    /// `completion` for text completions, `content[0].text` for messages.
    pub fn text(&self) -> Result<&str, DecodeError> {
        match self {
            ModelResponse::TextCompletion(response) => Ok(&response.completion),
            ModelResponse::Messages(response) => match response.content.first() {
                Some(ContentBlock::Text { text }) => Ok(text),
                Some(ContentBlock::Other) => Err(DecodeError::NonTextContent),
                None => Err(DecodeError::EmptyContent),
            },
        }
    }

    pub fn stop_reason(&self) -> Option<&str> {
        match self {
            ModelResponse::TextCompletion(response) => response.stop_reason.as_deref(),
            ModelResponse::Messages(response) => response.stop_reason.as_deref(),
        }
    }
}
