use crate::payload::PreparedRequest;
use crate::ModelInvoker;
use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::{primitives::Blob, Client};
use log::{debug, error, info};

/// `InvokeModel` over a shared, pre-authenticated Bedrock runtime client.
///
/// Credentials, retries and timeouts are whatever the SDK defaults resolve
/// to; errors are returned as the SDK raised them.
#[derive(Clone)]
pub struct BedrockInvoker {
    client: Client,
}

impl BedrockInvoker {
    pub async fn new(region: Option<&str>) -> Result<Self> {
        info!("Initializing BedrockInvoker");
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let aws_config = loader.load().await;

        Ok(Self::from_client(Client::new(&aws_config)))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModelInvoker for BedrockInvoker {
    async fn invoke(&self, request: &PreparedRequest) -> Result<Vec<u8>> {
        debug!("Invoking Bedrock model: {}", request.model_id);
        let response = self
            .client
            .invoke_model()
            .model_id(&request.model_id)
            .accept(&request.accept)
            .content_type(&request.content_type)
            .body(Blob::new(request.body.clone()))
            .send()
            .await
            .map_err(|e| {
                error!("Bedrock invoke_model failed: {}", e);
                e
            })?;

        Ok(response.body.into_inner())
    }
}
