use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid run identifier: {0} (expected '<cluster>::<task-arn>')")]
    InvalidIdentifier(String),
    #[error("document conversion failed: {0}")]
    Document(#[from] serde_json::Error),
}
