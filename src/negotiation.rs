//! Credential negotiation: persists every channel's grant into the shared record.

use crate::{
    events::TopicCreatedHandler,
    relation::TopicCreatedEvent,
    storage::SharedCredentials,
    types::Role,
    Result,
};
use async_trait::async_trait;
use tracing::info;

/// Handler bound to one channel. All three roles run the same logic against
/// the same [`SharedCredentials`], so the last grant processed wins.
///
/// Partial grants are accepted: absent username or password is stored as an
/// empty string and only rejected later by the dispatcher preflight.
pub struct CredentialNegotiator {
    role: Role,
    credentials: SharedCredentials,
}

impl CredentialNegotiator {
    pub fn new(role: Role, credentials: SharedCredentials) -> Self {
        Self { role, credentials }
    }
}

#[async_trait]
impl TopicCreatedHandler for CredentialNegotiator {
    async fn on_topic_created(&self, event: &TopicCreatedEvent) -> Result<()> {
        info!(
            role = %self.role,
            relation_id = event.relation_id,
            username = ?event.username,
            password = ?event.password,
            bootstrap_server = ?event.bootstrap_server,
            tls = ?event.tls,
            "topic created"
        );

        self.credentials
            .record(
                event.username.as_deref().unwrap_or_default(),
                event.password.as_deref().unwrap_or_default(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryPeerStore, PeerStore};
    use std::sync::Arc;

    fn grant(username: Option<&str>, password: Option<&str>) -> TopicCreatedEvent {
        TopicCreatedEvent {
            relation_id: 0,
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            bootstrap_server: Some("b1:9092".to_string()),
            tls: Some("disabled".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_null_fields_become_empty_strings_for_every_role() {
        for role in Role::ALL {
            let store = Arc::new(MemoryPeerStore::new());
            let negotiator =
                CredentialNegotiator::new(role, SharedCredentials::new(store.clone()));

            negotiator.on_topic_created(&grant(None, None)).await.unwrap();

            assert_eq!(store.get("username").await.unwrap().as_deref(), Some(""));
            assert_eq!(store.get("password").await.unwrap().as_deref(), Some(""));
        }
    }

    #[tokio::test]
    async fn test_later_grant_overwrites_earlier() {
        let store = Arc::new(MemoryPeerStore::new());
        let credentials = SharedCredentials::new(store.clone());
        let consumer = CredentialNegotiator::new(Role::Consumer, credentials.clone());
        let admin = CredentialNegotiator::new(Role::Admin, credentials);

        admin.on_topic_created(&grant(Some("a"), Some("p"))).await.unwrap();
        consumer
            .on_topic_created(&grant(Some("c"), None))
            .await
            .unwrap();

        assert_eq!(store.get("username").await.unwrap().as_deref(), Some("c"));
        assert_eq!(store.get("password").await.unwrap().as_deref(), Some(""));
    }
}
