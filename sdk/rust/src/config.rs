use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Client configuration for a single harness operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bootstrap broker addresses (`host:port`)
    pub servers: Vec<String>,

    /// SASL username
    pub username: String,

    /// SASL password
    pub password: String,

    /// Topic every operation targets
    pub topic: String,

    /// Prefix for the generated consumer group id; `None` means no prefix
    pub consumer_group_prefix: Option<String>,

    /// Security protocol used on the wire
    pub security_protocol: SecurityProtocol,

    /// Partitions requested when the topic is created
    pub num_partitions: i32,

    /// Replication factor requested when the topic is created
    pub replication_factor: i32,

    /// Number of messages a producer run sends
    pub message_count: usize,

    /// Bounded attempt window for a consumer run
    pub consume_timeout: Duration,
}

/// Kafka `security.protocol` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityProtocol {
    #[serde(rename = "PLAINTEXT")]
    Plaintext,
    #[serde(rename = "SSL")]
    Ssl,
    #[serde(rename = "SASL_PLAINTEXT")]
    SaslPlaintext,
    #[serde(rename = "SASL_SSL")]
    SaslSsl,
}

impl SecurityProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProtocol::Plaintext => "PLAINTEXT",
            SecurityProtocol::Ssl => "SSL",
            SecurityProtocol::SaslPlaintext => "SASL_PLAINTEXT",
            SecurityProtocol::SaslSsl => "SASL_SSL",
        }
    }

    /// Whether the protocol authenticates with SASL
    pub fn uses_sasl(&self) -> bool {
        matches!(self, SecurityProtocol::SaslPlaintext | SecurityProtocol::SaslSsl)
    }
}

impl fmt::Display for SecurityProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityProtocol {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PLAINTEXT" => Ok(SecurityProtocol::Plaintext),
            "SSL" => Ok(SecurityProtocol::Ssl),
            "SASL_PLAINTEXT" => Ok(SecurityProtocol::SaslPlaintext),
            "SASL_SSL" => Ok(SecurityProtocol::SaslSsl),
            other => Err(ClientError::InvalidConfig(format!(
                "unknown security protocol '{}'",
                other
            ))),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            servers: vec!["localhost:9092".to_string()],
            username: String::new(),
            password: String::new(),
            topic: "test-topic".to_string(),
            consumer_group_prefix: None,
            security_protocol: SecurityProtocol::SaslPlaintext,
            num_partitions: 1,
            replication_factor: 1,
            message_count: 15,
            consume_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Comma-joined bootstrap list as Kafka clients expect it
    pub fn bootstrap_servers(&self) -> String {
        self.servers.join(",")
    }

    /// Consumer group id: the configured prefix (if any) followed by a fresh uuid
    pub fn consumer_group_id(&self) -> String {
        format!(
            "{}{}",
            self.consumer_group_prefix.as_deref().unwrap_or_default(),
            uuid::Uuid::new_v4()
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() || self.servers.iter().any(|s| s.trim().is_empty()) {
            return Err(ClientError::InvalidConfig(
                "servers must contain at least one non-empty address".to_string(),
            ));
        }

        if self.topic.is_empty() {
            return Err(ClientError::InvalidConfig("topic cannot be empty".to_string()));
        }

        if self.security_protocol.uses_sasl()
            && (self.username.is_empty() || self.password.is_empty())
        {
            return Err(ClientError::InvalidConfig(format!(
                "{} requires both username and password",
                self.security_protocol
            )));
        }

        if self.num_partitions < 1 || self.replication_factor < 1 {
            return Err(ClientError::InvalidConfig(
                "num_partitions and replication_factor must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
