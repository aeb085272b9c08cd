use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("temperature must be within [0, 1], got {0}")]
    Temperature(f32),

    #[error("top_p must be within [0, 1], got {0}")]
    TopP(f32),

    #[error("max_tokens must be greater than zero")]
    MaxTokens,

    #[error("users must be greater than zero")]
    Users,

    #[error("wait_min_ms ({min}) must not exceed wait_max_ms ({max})")]
    WaitRange { min: u64, max: u64 },

    #[error("prompt must contain a \"\\n\\nHuman:\" turn followed by \"\\n\\nAssistant:\"")]
    PromptMarkers,

    #[error("messages payload needs at least one message")]
    NoMessages,

    #[error("first message must come from the user")]
    FirstMessageRole,

    #[error("invalid value for {var}: {value}")]
    EnvOverride { var: String, value: String },
}
