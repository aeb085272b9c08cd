use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("response is not valid JSON for the requested format: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response content list is empty")]
    EmptyContent,

    #[error("first content block is not text")]
    NonTextContent,
}
