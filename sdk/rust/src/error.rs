use thiserror::Error;

/// Result type alias for harness client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the harness client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection-related errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// SASL authentication failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Broker error
    #[error("Broker error: {0}")]
    Broker(String),

    /// Topic not found
    #[error("Topic not found: {topic}")]
    TopicNotFound { topic: String },

    /// Producer errors
    #[error("Producer error: {0}")]
    Producer(String),

    /// Consumer errors
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// Fewer messages observed than the caller required within the attempt window
    #[error("Insufficient messages: expected at least {expected}, observed {observed}")]
    InsufficientMessages { expected: usize, observed: usize },

    /// Message serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend not compiled into this build
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

#[cfg(feature = "rdkafka")]
impl From<rdkafka::error::KafkaError> for ClientError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        ClientError::Broker(err.to_string())
    }
}

/// Error categories for reporting
impl ClientError {
    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::Connection(_) => "connection",
            ClientError::Authentication(_) => "authentication",
            ClientError::InvalidConfig(_) => "configuration",
            ClientError::Broker(_) => "broker",
            ClientError::TopicNotFound { .. } => "not_found",
            ClientError::Producer(_) => "producer",
            ClientError::Consumer(_) => "consumer",
            ClientError::InsufficientMessages { .. } => "insufficient_messages",
            ClientError::Serialization(_) => "serialization",
            ClientError::UnsupportedBackend(_) => "unsupported_backend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_messages_display() {
        let err = ClientError::InsufficientMessages { expected: 3, observed: 2 };
        assert_eq!(
            err.to_string(),
            "Insufficient messages: expected at least 3, observed 2"
        );
        assert_eq!(err.category(), "insufficient_messages");
    }
}
