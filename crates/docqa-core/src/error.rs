use thiserror::Error;

/// Failure taxonomy of the answering pipeline.
///
/// Infrastructure failures are kept distinct from evidentiary decisions:
/// a corrupt index is `IndexUnavailable`, never an "insufficient context"
/// answer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
