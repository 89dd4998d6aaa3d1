/// Errors produced by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The bus configuration is unusable.
    #[error("invalid bus configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the events crate.
pub type Result<T> = std::result::Result<T, EventError>;
