pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod harness;
pub mod negotiation;
pub mod relation;
pub mod storage;
pub mod types;

pub use config::HarnessConfig;
pub use dispatcher::{endpoint_set, Action, ActionOutcome, CommandDispatcher};
pub use error::{HarnessError, Result};
pub use events::{EventBus, HarnessEvent, TopicCreatedHandler};
pub use harness::{channel_specs, ApplicationHarness};
pub use negotiation::CredentialNegotiator;
pub use relation::{KafkaRequirer, Relation, RelationRegistry, TopicCreatedEvent};
pub use storage::{FilePeerStore, MemoryPeerStore, PeerStore, SharedCredentials};
pub use types::{ChannelSpec, ChannelState, Role, UnitStatus};
