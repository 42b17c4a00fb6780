//! Produce and consume actions: assemble a complete credential set from the
//! shared record and live admin relations, then drive the client.

use crate::{
    config::HarnessConfig,
    error::HarnessError,
    relation::RelationRegistry,
    storage::SharedCredentials,
    types::keys,
    Result,
};
use kafka_harness_client::{ClientConfig, ClientFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

/// Externally triggered commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Produce,
    Consume,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Produce => f.write_str("produce"),
            Action::Consume => f.write_str("consume"),
        }
    }
}

impl FromStr for Action {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "produce" => Ok(Action::Produce),
            "consume" => Ok(Action::Consume),
            other => Err(HarnessError::InvalidConfig(format!("unknown action '{}'", other))),
        }
    }
}

/// What a successful action did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: Action,
    pub servers: Vec<String>,
    pub topic: String,
    pub messages: usize,
}

/// Broker addresses advertised by every bound admin relation, in
/// establishment order. Empty segments are dropped; never cached.
pub fn endpoint_set(registry: &RelationRegistry, admin_relation: &str) -> Vec<String> {
    registry
        .relations(admin_relation)
        .filter(|relation| relation.is_bound())
        .filter_map(|relation| relation.remote(keys::ENDPOINTS))
        .flat_map(|endpoints| endpoints.split(','))
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct CommandDispatcher {
    config: Arc<HarnessConfig>,
    credentials: SharedCredentials,
    factory: Arc<dyn ClientFactory>,
}

impl CommandDispatcher {
    pub fn new(
        config: Arc<HarnessConfig>,
        credentials: SharedCredentials,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            config,
            credentials,
            factory,
        }
    }

    pub async fn run(&self, action: Action, registry: &RelationRegistry) -> Result<ActionOutcome> {
        let result = match action {
            Action::Produce => self.produce(registry).await,
            Action::Consume => self.consume(registry).await,
        };
        if let Err(e) = &result {
            error!("Action {} failed: {}", action, e);
        }
        result
    }

    /// Ensure the topic exists, then produce the configured batch
    pub async fn produce(&self, registry: &RelationRegistry) -> Result<ActionOutcome> {
        let client = self.factory.create(self.preflight(registry).await?)?;

        client.create_topic().await?;
        let produced = client.run_producer().await?;

        info!("Produced {} messages to {}", produced, client.config().topic);
        Ok(ActionOutcome {
            action: Action::Produce,
            servers: client.config().servers.clone(),
            topic: client.config().topic.clone(),
            messages: produced,
        })
    }

    /// Consume and require at least the configured minimum
    pub async fn consume(&self, registry: &RelationRegistry) -> Result<ActionOutcome> {
        let client = self.factory.create(self.preflight(registry).await?)?;

        let messages = client.run_consumer(self.config.client.min_consumed).await?;

        info!("Consumed {} messages from {}", messages.len(), client.config().topic);
        Ok(ActionOutcome {
            action: Action::Consume,
            servers: client.config().servers.clone(),
            topic: client.config().topic.clone(),
            messages: messages.len(),
        })
    }

    /// Gather endpoints and credentials; all three must be non-empty
    async fn preflight(&self, registry: &RelationRegistry) -> Result<ClientConfig> {
        let servers = endpoint_set(registry, &self.config.relations.admin);
        let username = self.credentials.username().await?.unwrap_or_default();
        let password = self.credentials.password().await?.unwrap_or_default();

        let mut missing = Vec::new();
        if username.is_empty() {
            missing.push(keys::USERNAME);
        }
        if password.is_empty() {
            missing.push(keys::PASSWORD);
        }
        if servers.is_empty() {
            missing.push(keys::ENDPOINTS);
        }
        if !missing.is_empty() {
            return Err(HarnessError::MissingRelationData { missing });
        }

        let settings = &self.config.client;
        Ok(ClientConfig {
            servers,
            username,
            password,
            topic: self.config.app.topic.clone(),
            // ad-hoc actions never join the consumer channel's prefixed groups
            consumer_group_prefix: None,
            security_protocol: settings.security_protocol,
            num_partitions: settings.num_partitions,
            replication_factor: settings.replication_factor,
            message_count: settings.message_count,
            consume_timeout: settings.consume_timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPeerStore;
    use kafka_harness_client::{ClientError, InMemoryBroker, Operation};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const ADMIN: &str = "kafka-client-admin";

    fn registry_with_endpoints(endpoints: &[Option<&str>]) -> RelationRegistry {
        let mut registry = RelationRegistry::new();
        for value in endpoints {
            let id = registry.establish(ADMIN, Some("kafka".to_string()));
            if let Some(value) = value {
                registry
                    .update_remote_data(id, [("endpoints".to_string(), Some(value.to_string()))])
                    .unwrap();
            }
        }
        registry
    }

    async fn dispatcher(
        username: Option<&str>,
        password: Option<&str>,
        broker: &InMemoryBroker,
    ) -> CommandDispatcher {
        let credentials = SharedCredentials::new(Arc::new(MemoryPeerStore::new()));
        credentials
            .record(username.unwrap_or_default(), password.unwrap_or_default())
            .await
            .unwrap();
        let mut config = HarnessConfig::default();
        config.client.consume_timeout_ms = 100;
        CommandDispatcher::new(Arc::new(config), credentials, Arc::new(broker.clone()))
    }

    #[test]
    fn test_endpoint_set_preserves_order() {
        let registry = registry_with_endpoints(&[Some("host1:9092,host2:9092")]);
        assert_eq!(
            endpoint_set(&registry, ADMIN),
            vec!["host1:9092".to_string(), "host2:9092".to_string()]
        );
    }

    #[test]
    fn test_endpoint_set_concatenates_relations() {
        let registry = registry_with_endpoints(&[Some("b1:9092"), None, Some("b2:9092, b3:9092")]);
        assert_eq!(
            endpoint_set(&registry, ADMIN),
            vec!["b1:9092", "b2:9092", "b3:9092"]
        );
    }

    #[test]
    fn test_endpoint_set_skips_unbound_and_other_relations() {
        let mut registry = RelationRegistry::new();
        let unbound = registry.establish(ADMIN, None);
        registry
            .update_remote_data(unbound, [("endpoints".to_string(), Some("x:1".to_string()))])
            .unwrap();
        let producer = registry.establish("kafka-client-producer", Some("kafka".to_string()));
        registry
            .update_remote_data(producer, [("endpoints".to_string(), Some("y:1".to_string()))])
            .unwrap();

        assert!(endpoint_set(&registry, ADMIN).is_empty());
    }

    #[test]
    fn test_endpoint_set_empty_field() {
        assert!(endpoint_set(&registry_with_endpoints(&[Some("")]), ADMIN).is_empty());
        assert!(endpoint_set(&RelationRegistry::new(), ADMIN).is_empty());
    }

    proptest! {
        #[test]
        fn prop_endpoint_set_matches_joined_hosts(hosts in prop::collection::vec("[a-z][a-z0-9]{0,8}:[0-9]{1,5}", 1..6)) {
            let joined = hosts.join(",");
            let registry = registry_with_endpoints(&[Some(joined.as_str())]);
            prop_assert_eq!(endpoint_set(&registry, ADMIN), hosts);
        }
    }

    #[tokio::test]
    async fn test_preflight_missing_username() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(None, Some("p"), &broker).await;
        let registry = registry_with_endpoints(&[Some("b1:9092")]);

        let err = dispatcher.produce(&registry).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MissingRelationData { ref missing } if missing == &vec!["username"]
        ));
        assert!(broker.connections().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_missing_password() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(Some("a"), None, &broker).await;
        let registry = registry_with_endpoints(&[Some("b1:9092")]);

        let err = dispatcher.consume(&registry).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MissingRelationData { ref missing } if missing == &vec!["password"]
        ));
        assert!(broker.connections().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_missing_endpoints() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(Some("a"), Some("p"), &broker).await;

        let err = dispatcher.produce(&RelationRegistry::new()).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MissingRelationData { ref missing } if missing == &vec!["endpoints"]
        ));

        let err = dispatcher
            .consume(&registry_with_endpoints(&[Some("")]))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::MissingRelationData { .. }));
        assert!(broker.connections().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_nothing_recorded() {
        let broker = InMemoryBroker::new();
        let credentials = SharedCredentials::new(Arc::new(MemoryPeerStore::new()));
        let dispatcher = CommandDispatcher::new(
            Arc::new(HarnessConfig::default()),
            credentials,
            Arc::new(broker.clone()),
        );

        let err = dispatcher.produce(&RelationRegistry::new()).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MissingRelationData { ref missing }
                if missing == &vec!["username", "password", "endpoints"]
        ));
    }

    #[tokio::test]
    async fn test_produce_uses_sasl_plaintext_without_prefix() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(Some("a"), Some("p"), &broker).await;
        let registry = registry_with_endpoints(&[Some("b1:9092")]);

        let outcome = dispatcher.produce(&registry).await.unwrap();
        assert_eq!(outcome.messages, 15);
        assert_eq!(outcome.topic, "test-topic");

        let operations: Vec<Operation> =
            broker.connections().iter().map(|c| c.operation).collect();
        assert_eq!(operations, vec![Operation::CreateTopic, Operation::Produce]);
        assert!(broker
            .connections()
            .iter()
            .all(|c| c.security_protocol == "SASL_PLAINTEXT"));
    }

    #[tokio::test]
    async fn test_consume_below_minimum_fails() {
        let broker = InMemoryBroker::new();
        broker.seed_message("test-topic", "one");
        broker.seed_message("test-topic", "two");
        let dispatcher = dispatcher(Some("a"), Some("p"), &broker).await;
        let registry = registry_with_endpoints(&[Some("b1:9092")]);

        let err = dispatcher.run(Action::Consume, &registry).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Client(ClientError::InsufficientMessages {
                expected: 3,
                observed: 2
            })
        ));
        assert_eq!(broker.open_connections(), 0);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("produce".parse::<Action>().unwrap(), Action::Produce);
        assert_eq!(Action::Consume.to_string(), "consume");
        assert!("delete".parse::<Action>().is_err());
    }
}
