pub mod bedrock;
pub mod error;
pub mod models;
pub mod payload;

pub use bedrock::BedrockInvoker;
pub use error::DecodeError;
pub use loadtest_core::config::PayloadFormat;
pub use models::{ModelResponse, RequestPayload};
pub use payload::{PreparedRequest, RequestPayloadBuilder};

use anyhow::Result;
use async_trait::async_trait;

/// Sends one prepared request to the inference endpoint and returns the raw
/// response body. Implementations must be shareable between virtual users.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, request: &PreparedRequest) -> Result<Vec<u8>>;
}
