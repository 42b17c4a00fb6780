//! Kafka Harness Client Library
//!
//! Scoped create-topic, produce and consume operations used by the
//! application harness, with an in-memory broker for tests and an optional
//! librdkafka backend.

pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "rdkafka")]
pub mod kafka;
pub mod memory;
pub mod message;

pub use client::{ClientFactory, KafkaClient};
pub use config::{ClientConfig, SecurityProtocol};
pub use error::{ClientError, Result};
#[cfg(feature = "rdkafka")]
pub use kafka::{RdKafkaClient, RdKafkaFactory};
pub use memory::{BrokerSnapshot, ConnectionRecord, InMemoryBroker, InMemoryClient, Operation};
pub use message::Message;
