//! Relation channels to the provider and the registry that tracks them.

pub mod requirer;

pub use requirer::{KafkaRequirer, TopicCreatedEvent};

use crate::{error::HarnessError, types::ChannelState, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub type Databag = BTreeMap<String, String>;

/// One established relation instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: u32,
    pub name: String,
    /// `None` until the remote application has bound to the relation
    pub remote_app: Option<String>,
    pub local_app_data: Databag,
    pub remote_app_data: Databag,
    #[serde(default)]
    pub state: ChannelState,
}

impl Relation {
    pub fn is_bound(&self) -> bool {
        self.remote_app.is_some()
    }

    pub fn remote(&self, key: &str) -> Option<&str> {
        self.remote_app_data.get(key).map(String::as_str)
    }
}

/// Every relation currently established, in establishment order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRegistry {
    next_id: u32,
    relations: Vec<Relation>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry written with [`RelationRegistry::save`]; a missing
    /// file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write through a temporary sibling and rename it into place
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn establish(&mut self, name: &str, remote_app: Option<String>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.relations.push(Relation {
            id,
            name: name.to_string(),
            remote_app,
            local_app_data: Databag::new(),
            remote_app_data: Databag::new(),
            state: ChannelState::default(),
        });
        id
    }

    pub fn bind_remote_app(&mut self, id: u32, app: &str) -> Result<()> {
        self.get_mut(id)?.remote_app = Some(app.to_string());
        Ok(())
    }

    /// Apply provider-side changes; a `None` value deletes the key
    pub fn update_remote_data<I>(&mut self, id: u32, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let relation = self.get_mut(id)?;
        for (key, value) in updates {
            match value {
                Some(value) => relation.remote_app_data.insert(key, value),
                None => relation.remote_app_data.remove(&key),
            };
        }
        Ok(())
    }

    pub fn break_relation(&mut self, id: u32) -> Result<Relation> {
        let index = self
            .relations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| HarnessError::RelationNotFound(id.to_string()))?;
        Ok(self.relations.remove(index))
    }

    pub fn relations<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |r| r.name == name)
    }

    pub fn get(&self, id: u32) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Result<&mut Relation> {
        self.relations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| HarnessError::RelationNotFound(id.to_string()))
    }

    pub fn all(&self) -> &[Relation] {
        &self.relations
    }
}
