//! In-process broker used by tests and dry runs of the harness.

use crate::{
    client::{ClientFactory, KafkaClient},
    config::ClientConfig,
    error::{ClientError, Result},
    message::Message,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Operation performed over a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    CreateTopic,
    Produce,
    Consume,
}

/// What a client presented when it opened a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub operation: Operation,
    pub servers: Vec<String>,
    pub username: String,
    pub password: String,
    pub security_protocol: String,
}

/// Durable part of the broker: users and topic logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerSnapshot {
    pub users: BTreeMap<String, String>,
    pub topics: BTreeMap<String, Vec<Message>>,
}

#[derive(Default)]
struct BrokerInner {
    state: RwLock<BrokerSnapshot>,
    connections: Mutex<Vec<ConnectionRecord>>,
    open_connections: AtomicUsize,
}

/// In-memory broker with a SASL user table and per-topic message logs.
///
/// When no users are registered any non-empty credentials are accepted.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: BrokerSnapshot) -> Self {
        let broker = Self::default();
        *broker.inner.state.write() = snapshot;
        broker
    }

    /// Load a broker previously written with [`InMemoryBroker::save`]; a
    /// missing file yields an empty broker.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_snapshot(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn snapshot(&self) -> BrokerSnapshot {
        self.inner.state.read().clone()
    }

    /// Register SASL credentials
    pub fn add_user(&self, username: impl Into<String>, password: impl Into<String>) {
        self.inner
            .state
            .write()
            .users
            .insert(username.into(), password.into());
    }

    /// Append a message directly, bypassing any client
    pub fn seed_message(&self, topic: &str, payload: &str) {
        let mut state = self.inner.state.write();
        let log = state.topics.entry(topic.to_string()).or_default();
        let mut message = Message::numbered(topic, log.len());
        message.payload = payload.to_string().into();
        message.offset = log.len() as u64;
        log.push(message);
    }

    pub fn topic_exists(&self, topic: &str) -> bool {
        self.inner.state.read().topics.contains_key(topic)
    }

    pub fn message_count(&self, topic: &str) -> usize {
        self.inner
            .state
            .read()
            .topics
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Every connection opened so far, in order
    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.inner.connections.lock().clone()
    }

    /// Connections currently held by clients
    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::SeqCst)
    }

    fn connect(&self, config: &ClientConfig, operation: Operation) -> Result<Connection<'_>> {
        let connection = Connection::open(&self.inner);

        self.inner.connections.lock().push(ConnectionRecord {
            operation,
            servers: config.servers.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            security_protocol: config.security_protocol.to_string(),
        });

        if config.servers.is_empty() {
            return Err(ClientError::Connection("no bootstrap servers".to_string()));
        }

        if config.security_protocol.uses_sasl() {
            self.authenticate(&config.username, &config.password)?;
        }

        debug!(
            "Opened {:?} connection to {} as '{}'",
            operation,
            config.bootstrap_servers(),
            config.username
        );
        Ok(connection)
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::Authentication(
                "empty SASL credentials".to_string(),
            ));
        }
        let state = self.inner.state.read();
        if state.users.is_empty() {
            return Ok(());
        }
        match state.users.get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(ClientError::Authentication(format!(
                "invalid credentials for user '{}'",
                username
            ))),
        }
    }
}

impl ClientFactory for InMemoryBroker {
    fn create(&self, config: ClientConfig) -> Result<Box<dyn KafkaClient>> {
        config.validate()?;
        Ok(Box::new(InMemoryClient {
            broker: self.clone(),
            config,
        }))
    }
}

/// Held for the duration of one operation; released on drop
struct Connection<'a> {
    inner: &'a BrokerInner,
}

impl<'a> Connection<'a> {
    fn open(inner: &'a BrokerInner) -> Self {
        inner.open_connections.fetch_add(1, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        self.inner.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Client bound to an [`InMemoryBroker`]
pub struct InMemoryClient {
    broker: InMemoryBroker,
    config: ClientConfig,
}

#[async_trait]
impl KafkaClient for InMemoryClient {
    async fn create_topic(&self) -> Result<()> {
        let _connection = self.broker.connect(&self.config, Operation::CreateTopic)?;
        let mut state = self.broker.inner.state.write();
        if state.topics.contains_key(&self.config.topic) {
            info!("Topic {} already exists", self.config.topic);
            return Ok(());
        }
        state.topics.insert(self.config.topic.clone(), Vec::new());
        info!(
            "Created topic {} with {} partitions, replication factor {}",
            self.config.topic, self.config.num_partitions, self.config.replication_factor
        );
        Ok(())
    }

    async fn run_producer(&self) -> Result<usize> {
        let _connection = self.broker.connect(&self.config, Operation::Produce)?;
        let mut state = self.broker.inner.state.write();
        let log = state
            .topics
            .get_mut(&self.config.topic)
            .ok_or_else(|| ClientError::TopicNotFound {
                topic: self.config.topic.clone(),
            })?;

        for n in 0..self.config.message_count {
            let mut message = Message::numbered(&self.config.topic, n);
            message.offset = log.len() as u64;
            log.push(message);
        }

        info!(
            "Produced {} messages to {}",
            self.config.message_count, self.config.topic
        );
        Ok(self.config.message_count)
    }

    async fn run_consumer(&self, min_count: usize) -> Result<Vec<Message>> {
        let _connection = self.broker.connect(&self.config, Operation::Consume)?;
        let group_id = self.config.consumer_group_id();
        let deadline = Instant::now() + self.config.consume_timeout;

        loop {
            let messages = self
                .broker
                .inner
                .state
                .read()
                .topics
                .get(&self.config.topic)
                .cloned()
                .unwrap_or_default();

            if messages.len() >= min_count {
                info!(
                    "Consumer group {} read {} messages from {}",
                    group_id,
                    messages.len(),
                    self.config.topic
                );
                return Ok(messages);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Consumer group {} saw {} of {} required messages on {}",
                    group_id,
                    messages.len(),
                    min_count,
                    self.config.topic
                );
                return Err(ClientError::InsufficientMessages {
                    expected: min_count,
                    observed: messages.len(),
                });
            }

            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ClientConfig {
        ClientConfig {
            servers: vec!["b1:9092".to_string()],
            username: "a".to_string(),
            password: "p".to_string(),
            consume_timeout: Duration::from_millis(100),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_topic_is_idempotent() {
        let broker = InMemoryBroker::new();
        let client = broker.create(test_config()).unwrap();

        client.create_topic().await.unwrap();
        client.create_topic().await.unwrap();

        assert!(broker.topic_exists("test-topic"));
        assert_eq!(broker.connections().len(), 2);
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_produce_requires_topic() {
        let broker = InMemoryBroker::new();
        let client = broker.create(test_config()).unwrap();

        let err = client.run_producer().await.unwrap_err();
        assert_eq!(
            err,
            ClientError::TopicNotFound {
                topic: "test-topic".to_string()
            }
        );
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_produce_then_consume() {
        let broker = InMemoryBroker::new();
        let client = broker.create(test_config()).unwrap();

        client.create_topic().await.unwrap();
        assert_eq!(client.run_producer().await.unwrap(), 15);

        let messages = client.run_consumer(3).await.unwrap();
        assert_eq!(messages.len(), 15);
        assert_eq!(messages[0].payload_as_string().as_deref(), Some("Message #0"));
        assert_eq!(messages[14].offset, 14);
    }

    #[tokio::test]
    async fn test_consume_insufficient_messages() {
        let broker = InMemoryBroker::new();
        broker.seed_message("test-topic", "one");
        broker.seed_message("test-topic", "two");
        let client = broker.create(test_config()).unwrap();

        let err = client.run_consumer(3).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::InsufficientMessages {
                expected: 3,
                observed: 2
            }
        );
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_consume_waits_for_late_messages() {
        let broker = InMemoryBroker::new();
        let mut config = test_config();
        config.consume_timeout = Duration::from_secs(5);
        let client = broker.create(config).unwrap();

        let seeder = broker.clone();
        tokio::spawn(async move {
            for n in 0..3 {
                sleep(Duration::from_millis(10)).await;
                seeder.seed_message("test-topic", &format!("late {}", n));
            }
        });

        let messages = client.run_consumer(3).await.unwrap();
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected_and_released() {
        let broker = InMemoryBroker::new();
        broker.add_user("a", "other");
        let client = broker.create(test_config()).unwrap();

        let err = client.create_topic().await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
        assert!(!broker.topic_exists("test-topic"));
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_connection_records_credentials() {
        let broker = InMemoryBroker::new();
        broker.add_user("a", "p");
        let client = broker.create(test_config()).unwrap();
        client.create_topic().await.unwrap();

        let records = broker.connections();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, Operation::CreateTopic);
        assert_eq!(records[0].servers, vec!["b1:9092".to_string()]);
        assert_eq!(records[0].username, "a");
        assert_eq!(records[0].security_protocol, "SASL_PLAINTEXT");
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let broker = InMemoryBroker::new();
        let mut config = test_config();
        config.servers.clear();
        assert!(broker.create(config).is_err());
    }

    #[test]
    fn test_snapshot_round_trip_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broker.json");

        let broker = InMemoryBroker::new();
        broker.add_user("a", "p");
        broker.seed_message("test-topic", "hello");
        broker.save(&path).unwrap();

        let restored = InMemoryBroker::load(&path).unwrap();
        assert_eq!(restored.snapshot(), broker.snapshot());
        assert_eq!(restored.message_count("test-topic"), 1);
        assert!(InMemoryBroker::load(&dir.path().join("missing.json"))
            .unwrap()
            .snapshot()
            .topics
            .is_empty());
    }

    #[test]
    fn test_save_replaces_previous_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broker.json");
        std::fs::write(&path, "stale").unwrap();

        let broker = InMemoryBroker::new();
        broker.seed_message("test-topic", "hello");
        broker.save(&path).unwrap();

        assert!(!path.with_extension("tmp").exists());
        assert_eq!(InMemoryBroker::load(&path).unwrap().message_count("test-topic"), 1);
    }
}
