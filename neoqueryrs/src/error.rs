use thiserror::Error;

pub type Result<T> = std::result::Result<T, NeoQueryError>;

#[derive(Debug, Error)]
pub enum NeoQueryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
