//! Event delivery: handlers register against channel names and are invoked
//! one at a time, to completion, in registration order.

use crate::{relation::TopicCreatedEvent, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Events the outside world delivers to the harness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessEvent {
    Start,
    RelationCreated { relation_id: u32 },
    RelationChanged { relation_id: u32 },
    RelationBroken { relation_id: u32 },
    TopicCreated { channel: String, event: TopicCreatedEvent },
}

#[async_trait]
pub trait TopicCreatedHandler: Send + Sync {
    async fn on_topic_created(&self, event: &TopicCreatedEvent) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct EventBus {
    handlers: HashMap<String, Vec<Arc<dyn TopicCreatedHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: &str, handler: Arc<dyn TopicCreatedHandler>) {
        self.handlers
            .entry(channel.to_string())
            .or_default()
            .push(handler);
    }

    pub fn handler_count(&self, channel: &str) -> usize {
        self.handlers.get(channel).map(Vec::len).unwrap_or(0)
    }

    /// Deliver to every handler of `channel`; the first failure stops delivery
    pub async fn emit(&self, channel: &str, event: &TopicCreatedEvent) -> Result<()> {
        let Some(handlers) = self.handlers.get(channel) else {
            warn!("No handler registered for channel {}, dropping event", channel);
            return Ok(());
        };

        debug!(
            "Delivering topic-created for relation {} to {} handler(s) on {}",
            event.relation_id,
            handlers.len(),
            channel
        );
        for handler in handlers {
            handler.on_topic_created(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, u32)>>>,
    }

    #[async_trait]
    impl TopicCreatedHandler for Recorder {
        async fn on_topic_created(&self, event: &TopicCreatedEvent) -> Result<()> {
            self.seen.lock().push((self.name, event.relation_id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_emit_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.register("admin", Arc::new(Recorder { name: "first", seen: seen.clone() }));
        bus.register("admin", Arc::new(Recorder { name: "second", seen: seen.clone() }));
        bus.register("consumer", Arc::new(Recorder { name: "other", seen: seen.clone() }));

        let event = TopicCreatedEvent {
            relation_id: 7,
            ..Default::default()
        };
        bus.emit("admin", &event).await.unwrap();

        assert_eq!(*seen.lock(), vec![("first", 7), ("second", 7)]);
        assert_eq!(bus.handler_count("consumer"), 1);
    }

    #[tokio::test]
    async fn test_unregistered_channel_is_dropped() {
        let bus = EventBus::new();
        assert!(bus.emit("nobody", &TopicCreatedEvent::default()).await.is_ok());
    }
}
