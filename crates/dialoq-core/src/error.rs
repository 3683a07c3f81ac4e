use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialoqError {
    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    #[error("LLM provider not supported: {0}")]
    UnsupportedProvider(String),

    // Flow errors
    #[error("Flow description parse error: {0}")]
    FlowParse(String),

    #[error("Flow graph has no nodes")]
    EmptyGraph,

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DialoqError>;
