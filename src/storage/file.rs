use crate::{error::HarnessError, storage::traits::PeerStore, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Peer store persisted as a JSON object; survives process restarts.
///
/// Every mutation rewrites the file through a temporary sibling and a rename,
/// so readers never observe a half-written document. The in-memory map only
/// changes after the write succeeded.
#[derive(Debug)]
pub struct FilePeerStore {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FilePeerStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                HarnessError::Storage(format!("corrupt peer store {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Opened peer store {} with {} keys", path.display(), data.len());
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PeerStore for FilePeerStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)]).await
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        if !data.contains_key(key) {
            return Ok(());
        }
        let mut next = data.clone();
        next.remove(key);
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.data.lock().await.clone())
    }
}
