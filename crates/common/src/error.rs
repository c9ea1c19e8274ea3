use thiserror::Error;

use crate::ExecutionStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Broker connection error: {0}")]
    Connection(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Order rejected by broker: {0}")]
    OrderRejected(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid execution transition: {from} -> {to}")]
    InvalidTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    #[error("Unknown execution: {0}")]
    UnknownExecution(String),

    #[error("Unknown bot: {0}")]
    UnknownBot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
