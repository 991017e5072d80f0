use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read/write capability of a single relay endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayUsage {
    pub read: bool,
    pub write: bool,
}

/// Relay endpoints declared by an identity, mapped to their capabilities.
///
/// Only used to select which endpoints the fetch collaborator should query;
/// this is configuration data, not a cache entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayList {
    entries: BTreeMap<String, RelayUsage>,
}

impl RelayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, usage: RelayUsage) {
        self.entries.insert(url.into(), usage);
    }

    pub fn get(&self, url: &str) -> Option<RelayUsage> {
        self.entries.get(url).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Endpoints the client should read events from.
    pub fn read_relays(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, usage)| usage.read)
            .map(|(url, _)| url.clone())
            .collect()
    }
}

impl FromIterator<(String, RelayUsage)> for RelayList {
    fn from_iter<I: IntoIterator<Item = (String, RelayUsage)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
