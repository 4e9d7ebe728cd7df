use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("request queue full")]
    QueueFull,
    #[error("client closed")]
    Closed,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("invalid topic: {0}")]
    InvalidTopic(String),
    #[error("rejected: {0}")]
    Rejected(String),
}
