//! librdkafka-backed client, built with the `rdkafka` feature.

use crate::{
    client::{ClientFactory, KafkaClient},
    config::ClientConfig,
    error::{ClientError, Result},
    message::{now_millis, Message},
};
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig as RdClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::Message as _;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// SASL mechanism the provider issues credentials for
pub const SASL_MECHANISM: &str = "SCRAM-SHA-512";

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Factory for [`RdKafkaClient`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RdKafkaFactory;

impl ClientFactory for RdKafkaFactory {
    fn create(&self, config: ClientConfig) -> Result<Box<dyn KafkaClient>> {
        config.validate()?;
        Ok(Box::new(RdKafkaClient { config }))
    }
}

/// Client that opens a fresh librdkafka handle per operation and drops it on return
pub struct RdKafkaClient {
    config: ClientConfig,
}

impl RdKafkaClient {
    fn base_config(&self) -> RdClientConfig {
        let mut rd = RdClientConfig::new();
        rd.set("bootstrap.servers", self.config.bootstrap_servers())
            .set("security.protocol", self.config.security_protocol.as_str());

        if self.config.security_protocol.uses_sasl() {
            rd.set("sasl.mechanism", SASL_MECHANISM)
                .set("sasl.username", &self.config.username)
                .set("sasl.password", &self.config.password);
        }
        rd
    }
}

#[async_trait]
impl KafkaClient for RdKafkaClient {
    async fn create_topic(&self) -> Result<()> {
        let admin: AdminClient<DefaultClientContext> = self.base_config().create()?;
        let topic = NewTopic::new(
            &self.config.topic,
            self.config.num_partitions,
            TopicReplication::Fixed(self.config.replication_factor),
        );

        let results = admin
            .create_topics(&[topic], &AdminOptions::new())
            .await?;

        for result in results {
            match result {
                Ok(name) => info!("Created topic {}", name),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    info!("Topic {} already exists", name)
                }
                Err((name, code)) => {
                    return Err(ClientError::Broker(format!(
                        "failed to create topic {}: {}",
                        name, code
                    )))
                }
            }
        }
        Ok(())
    }

    async fn run_producer(&self) -> Result<usize> {
        let producer: FutureProducer = self
            .base_config()
            .set("message.timeout.ms", DELIVERY_TIMEOUT.as_millis().to_string())
            .create()?;

        for n in 0..self.config.message_count {
            let key = n.to_string();
            let payload = format!("Message #{}", n);
            let record = FutureRecord::to(&self.config.topic).key(&key).payload(&payload);
            let (partition, offset) = producer
                .send(record, Timeout::After(DELIVERY_TIMEOUT))
                .await
                .map_err(|(err, _)| ClientError::Producer(err.to_string()))?;
            debug!("Delivered message {} to partition {} offset {}", n, partition, offset);
        }

        info!(
            "Produced {} messages to {}",
            self.config.message_count, self.config.topic
        );
        Ok(self.config.message_count)
    }

    async fn run_consumer(&self, min_count: usize) -> Result<Vec<Message>> {
        let group_id = self.config.consumer_group_id();
        let consumer: StreamConsumer = self
            .base_config()
            .set("group.id", &group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .create()?;
        consumer.subscribe(&[self.config.topic.as_str()])?;

        let deadline = Instant::now() + self.config.consume_timeout;
        let mut messages = Vec::new();

        while messages.len() < min_count {
            let received = match tokio::time::timeout_at(deadline, consumer.recv()).await {
                Ok(received) => received,
                Err(_) => break,
            };
            let borrowed = received.map_err(|e| ClientError::Consumer(e.to_string()))?;
            messages.push(Message {
                topic: borrowed.topic().to_string(),
                offset: borrowed.offset().max(0) as u64,
                key: borrowed.key().map(Bytes::copy_from_slice),
                payload: Bytes::copy_from_slice(borrowed.payload().unwrap_or_default()),
                timestamp: borrowed
                    .timestamp()
                    .to_millis()
                    .map(|ms| ms.max(0) as u64)
                    .unwrap_or_else(now_millis),
            });
        }

        if messages.len() < min_count {
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

        info!(
            "Consumer group {} read {} messages from {}",
            group_id,
            messages.len(),
            self.config.topic
        );
        Ok(messages)
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }
}
