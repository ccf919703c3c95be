//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Decode failure: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task service is not ready")]
    NotReady,

    #[error("Task service already started")]
    AlreadyStarted,

    #[error("Task queue closed")]
    QueueClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
