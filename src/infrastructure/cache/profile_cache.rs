use crate::domain::entities::ProfileRecord;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Session-scoped profile cache keyed by pubkey.
///
/// Merges are monotonic on the record's `created_at`: profile events arrive
/// unordered and duplicated across relays, so last-writer-wins is decided by
/// event freshness, never by arrival order.
#[derive(Clone, Default)]
pub struct ProfileCacheService {
    cache: Arc<RwLock<HashMap<String, ProfileRecord>>>,
}

impl ProfileCacheService {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Stores a record unless an equally fresh or fresher one is present.
    pub async fn put(&self, record: ProfileRecord) {
        let mut cache = self.cache.write().await;
        if let Some(existing) = cache.get(&record.pubkey) {
            if record.created_at <= existing.created_at {
                debug!(
                    pubkey = %record.pubkey,
                    incoming = record.created_at,
                    stored = existing.created_at,
                    "dropping stale profile record"
                );
                return;
            }
        }
        cache.insert(record.pubkey.clone(), record);
    }

    pub async fn get(&self, pubkey: &str) -> Option<ProfileRecord> {
        let cache = self.cache.read().await;
        cache.get(pubkey).cloned()
    }

    pub async fn get_all(&self) -> HashMap<String, ProfileRecord> {
        let cache = self.cache.read().await;
        cache.clone()
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
