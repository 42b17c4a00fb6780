use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// String key/value store shared by every unit of the application.
///
/// Writes are unconditional overwrites. Implementations must serialize
/// concurrent access to a single key.
#[async_trait]
pub trait PeerStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Write every pair or none of them
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn snapshot(&self) -> Result<BTreeMap<String, String>>;
}
