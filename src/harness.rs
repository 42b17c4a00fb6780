//! Application wiring: three requirer channels, their negotiators on the
//! event bus, and the produce/consume dispatcher.

use crate::{
    config::HarnessConfig,
    dispatcher::{Action, ActionOutcome, CommandDispatcher},
    error::HarnessError,
    events::{EventBus, HarnessEvent},
    negotiation::CredentialNegotiator,
    relation::{KafkaRequirer, RelationRegistry},
    storage::{PeerStore, SharedCredentials},
    types::{ChannelSpec, Role, UnitStatus},
    Result,
};
use kafka_harness_client::ClientFactory;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ApplicationHarness {
    config: Arc<HarnessConfig>,
    registry: RelationRegistry,
    store: Arc<dyn PeerStore>,
    bus: EventBus,
    requirers: Vec<KafkaRequirer>,
    dispatcher: CommandDispatcher,
    status: UnitStatus,
}

/// The consumer, producer and admin channels declared by `config`
pub fn channel_specs(config: &HarnessConfig) -> Vec<ChannelSpec> {
    Role::ALL
        .into_iter()
        .map(|role| ChannelSpec {
            relation_name: config.relations.name_for(role).to_string(),
            topic: config.app.topic.clone(),
            role,
            consumer_group_prefix: (role == Role::Consumer)
                .then(|| config.app.consumer_group_prefix.clone()),
        })
        .collect()
}

impl ApplicationHarness {
    pub fn new(
        config: HarnessConfig,
        store: Arc<dyn PeerStore>,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let credentials = SharedCredentials::new(store.clone());

        let mut bus = EventBus::new();
        let mut requirers = Vec::new();
        for spec in channel_specs(&config) {
            bus.register(
                &spec.relation_name,
                Arc::new(CredentialNegotiator::new(spec.role, credentials.clone())),
            );
            requirers.push(KafkaRequirer::new(spec));
        }

        let dispatcher = CommandDispatcher::new(config.clone(), credentials, factory);

        Ok(Self {
            config,
            registry: RelationRegistry::new(),
            store,
            bus,
            requirers,
            dispatcher,
            status: UnitStatus::default(),
        })
    }

    /// Resume from a previously persisted registry
    pub fn with_registry(mut self, registry: RelationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &RelationRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn PeerStore> {
        &self.store
    }

    pub fn status(&self) -> &UnitStatus {
        &self.status
    }

    pub async fn handle(&mut self, event: HarnessEvent) -> Result<()> {
        match event {
            HarnessEvent::Start => {
                self.status = UnitStatus::Active;
                info!("Harness {} started", self.config.app.name);
            }
            HarnessEvent::RelationCreated { relation_id } => {
                let relation = self.registry.get_mut(relation_id)?;
                match self
                    .requirers
                    .iter()
                    .find(|r| r.relation_name() == relation.name)
                {
                    Some(requirer) => requirer.on_relation_created(relation),
                    None => debug!("Relation {} is not a kafka channel", relation.name),
                }
            }
            HarnessEvent::RelationChanged { relation_id } => {
                let relation = self.registry.get_mut(relation_id)?;
                let channel = relation.name.clone();
                let Some(requirer) = self
                    .requirers
                    .iter()
                    .find(|r| r.relation_name() == channel)
                else {
                    debug!("Relation {} is not a kafka channel", channel);
                    return Ok(());
                };
                let Some(event) = requirer.on_relation_changed(relation) else {
                    return Ok(());
                };

                // Granted only once the handler has stored the grant
                self.bus.emit(&channel, &event).await?;
                requirer.mark_granted(self.registry.get_mut(relation_id)?);
            }
            HarnessEvent::RelationBroken { relation_id } => {
                let relation = self.registry.break_relation(relation_id)?;
                info!("Relation {} ({}) broken", relation.id, relation.name);
            }
            HarnessEvent::TopicCreated { channel, event } => {
                self.bus.emit(&channel, &event).await?;
            }
        }
        Ok(())
    }

    /// Establish the channel for `role` and publish its request
    pub async fn relate(&mut self, role: Role, remote_app: Option<&str>) -> Result<u32> {
        let name = self.config.relations.name_for(role).to_string();
        let relation_id = self
            .registry
            .establish(&name, remote_app.map(str::to_string));
        self.handle(HarnessEvent::RelationCreated { relation_id }).await?;
        Ok(relation_id)
    }

    /// Apply provider databag changes and process the resulting change event
    pub async fn publish_remote<I>(&mut self, relation_id: u32, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        self.registry.update_remote_data(relation_id, updates)?;
        self.handle(HarnessEvent::RelationChanged { relation_id }).await
    }

    /// Most recently established relation for `role`
    pub fn latest_relation(&self, role: Role) -> Result<u32> {
        let name = self.config.relations.name_for(role);
        self.registry
            .relations(name)
            .last()
            .map(|r| r.id)
            .ok_or_else(|| HarnessError::RelationNotFound(name.to_string()))
    }

    pub async fn run_action(&self, action: Action) -> Result<ActionOutcome> {
        self.dispatcher.run(action, &self.registry).await
    }
}
