use crate::{storage::traits::PeerStore, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemoryPeerStore {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryPeerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PeerStore for MemoryPeerStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut data = self.data.write();
        for (key, value) in entries {
            data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.data.read().clone())
    }
}
