use crate::{config::ClientConfig, error::Result, message::Message};
use async_trait::async_trait;

/// Scoped Kafka operations used by the harness.
///
/// Every call opens its own broker connection with the configured servers,
/// credentials and security protocol, performs one operation and releases
/// the connection before returning, on success and on failure alike.
#[async_trait]
pub trait KafkaClient: Send + Sync {
    /// Create the configured topic if it does not exist yet
    async fn create_topic(&self) -> Result<()>;

    /// Produce the configured number of messages, returning how many were acknowledged
    async fn run_producer(&self) -> Result<usize>;

    /// Read the topic from the earliest offset until at least `min_count`
    /// messages are observed or the attempt window elapses.
    ///
    /// Fails with [`crate::ClientError::InsufficientMessages`] when the window
    /// closes first.
    async fn run_consumer(&self, min_count: usize) -> Result<Vec<Message>>;

    fn config(&self) -> &ClientConfig;
}

/// Builds clients for a given configuration
pub trait ClientFactory: Send + Sync {
    fn create(&self, config: ClientConfig) -> Result<Box<dyn KafkaClient>>;
}
