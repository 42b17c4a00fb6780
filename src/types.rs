use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level a channel requests from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Consumer,
    Producer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Consumer, Role::Producer, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consumer => "consumer",
            Role::Producer => "producer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::error::HarnessError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "consumer" => Ok(Role::Consumer),
            "producer" => Ok(Role::Producer),
            "admin" => Ok(Role::Admin),
            other => Err(crate::error::HarnessError::UnknownChannel(other.to_string())),
        }
    }
}

/// Declaration of one channel to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub relation_name: String,
    pub topic: String,
    pub role: Role,
    /// Only sent on the consumer channel
    pub consumer_group_prefix: Option<String>,
}

/// Negotiation state of a channel. `Granted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChannelState {
    #[default]
    Requesting,
    Granted,
}

/// Databag keys exchanged with the provider
pub mod keys {
    pub const TOPIC: &str = "topic";
    pub const EXTRA_USER_ROLES: &str = "extra-user-roles";
    pub const CONSUMER_GROUP_PREFIX: &str = "consumer-group-prefix";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const ENDPOINTS: &str = "endpoints";
    pub const TLS: &str = "tls";
    pub const TLS_CA: &str = "tls-ca";
    pub const ZOOKEEPER_URIS: &str = "zookeeper-uris";
}

/// Lifecycle status of the harness unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UnitStatus {
    #[default]
    Maintenance,
    Active,
}
