use crate::{
    relation::Relation,
    types::{keys, ChannelSpec, ChannelState},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Payload the provider publishes once it has provisioned access.
///
/// Absent databag keys stay `None` here; they are collapsed to empty strings
/// only when written to the shared record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCreatedEvent {
    pub relation_id: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Comma-joined broker addresses as published by the provider
    pub bootstrap_server: Option<String>,
    /// `"enabled"` or `"disabled"`
    pub tls: Option<String>,
    pub tls_ca: Option<String>,
    pub zookeeper_uris: Option<String>,
    pub consumer_group_prefix: Option<String>,
}

impl TopicCreatedEvent {
    fn from_relation(relation: &Relation) -> Self {
        let field = |key: &str| relation.remote(key).map(str::to_string);
        Self {
            relation_id: relation.id,
            username: field(keys::USERNAME),
            password: field(keys::PASSWORD),
            bootstrap_server: field(keys::ENDPOINTS),
            tls: field(keys::TLS),
            tls_ca: field(keys::TLS_CA),
            zookeeper_uris: field(keys::ZOOKEEPER_URIS),
            consumer_group_prefix: field(keys::CONSUMER_GROUP_PREFIX),
        }
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.as_deref() == Some("enabled")
    }
}

/// Requirer side of one channel: publishes the request and turns the
/// provider's first grant into a [`TopicCreatedEvent`].
#[derive(Debug, Clone)]
pub struct KafkaRequirer {
    spec: ChannelSpec,
}

impl KafkaRequirer {
    pub fn new(spec: ChannelSpec) -> Self {
        Self { spec }
    }

    pub fn relation_name(&self) -> &str {
        &self.spec.relation_name
    }

    /// Publish topic, role and (consumer only) group prefix to the provider
    pub fn on_relation_created(&self, relation: &mut Relation) {
        let data = &mut relation.local_app_data;
        data.insert(keys::TOPIC.to_string(), self.spec.topic.clone());
        data.insert(
            keys::EXTRA_USER_ROLES.to_string(),
            self.spec.role.as_str().to_string(),
        );
        if let Some(prefix) = &self.spec.consumer_group_prefix {
            data.insert(keys::CONSUMER_GROUP_PREFIX.to_string(), prefix.clone());
        }
        relation.state = ChannelState::Requesting;
        debug!(
            "Requested topic {} as {} on relation {}",
            self.spec.topic, self.spec.role, relation.id
        );
    }

    /// Build the grant event for a provider databag change.
    ///
    /// Yields an event for any change that carries a grant field while the
    /// channel is still `Requesting`. The channel stays `Requesting` until
    /// [`KafkaRequirer::mark_granted`] is called, so a grant whose handler
    /// failed is offered again on the next change.
    pub fn on_relation_changed(&self, relation: &Relation) -> Option<TopicCreatedEvent> {
        if relation.state == ChannelState::Granted {
            return None;
        }

        let carries_grant = [keys::USERNAME, keys::PASSWORD, keys::ENDPOINTS]
            .iter()
            .any(|key| relation.remote_app_data.contains_key(*key));
        if !carries_grant {
            return None;
        }

        Some(TopicCreatedEvent::from_relation(relation))
    }

    /// Close the channel once its grant has been stored
    pub fn mark_granted(&self, relation: &mut Relation) {
        relation.state = ChannelState::Granted;
        debug!("Relation {} granted for {}", relation.id, self.spec.role);
    }
}
