use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Document produced no chunks")]
    EmptyDocument,

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Retrieval is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
