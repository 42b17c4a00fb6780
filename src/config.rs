use crate::types::Role;
use kafka_harness_client::SecurityProtocol;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub app: AppConfig,
    pub relations: RelationsConfig,
    pub client: ClientSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name reported in logs
    pub name: String,
    /// Topic requested on every channel and used by produce/consume
    pub topic: String,
    /// Consumer group prefix declared on the consumer channel
    pub consumer_group_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationsConfig {
    pub consumer: String,
    pub producer: String,
    pub admin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub security_protocol: SecurityProtocol,
    pub num_partitions: i32,
    pub replication_factor: i32,
    /// Messages sent by one produce action
    pub message_count: usize,
    /// Messages a consume action must observe
    pub min_consumed: usize,
    pub consume_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            topic: "test-topic".to_string(),
            consumer_group_prefix: "test-prefix".to_string(),
        }
    }
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            consumer: "kafka-client-consumer".to_string(),
            producer: "kafka-client-producer".to_string(),
            admin: "kafka-client-admin".to_string(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            security_protocol: SecurityProtocol::SaslPlaintext,
            num_partitions: 1,
            replication_factor: 1,
            message_count: 15,
            min_consumed: 3,
            consume_timeout_ms: 30_000, // 30 seconds
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            relations: RelationsConfig::default(),
            client: ClientSettings::default(),
        }
    }
}

impl ClientSettings {
    pub fn consume_timeout(&self) -> Duration {
        Duration::from_millis(self.consume_timeout_ms)
    }
}

impl RelationsConfig {
    pub fn name_for(&self, role: Role) -> &str {
        match role {
            Role::Consumer => &self.consumer,
            Role::Producer => &self.producer,
            Role::Admin => &self.admin,
        }
    }
}

impl HarnessConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: HarnessConfig = toml::from_str(content)
            .map_err(|e| crate::error::HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.app.topic.is_empty() {
            return Err(crate::error::HarnessError::InvalidConfig(
                "app.topic cannot be empty".to_string(),
            ));
        }

        let names = [
            &self.relations.consumer,
            &self.relations.producer,
            &self.relations.admin,
        ];
        if names.iter().any(|name| name.is_empty()) {
            return Err(crate::error::HarnessError::InvalidConfig(
                "relation names cannot be empty".to_string(),
            ));
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(crate::error::HarnessError::InvalidConfig(
                "relation names must be distinct".to_string(),
            ));
        }

        if self.client.min_consumed == 0 {
            return Err(crate::error::HarnessError::InvalidConfig(
                "client.min_consumed must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
