use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Relays queried before any relay list is known for the session.
    pub bootstrap_relays: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                bootstrap_relays: vec![
                    "wss://relay-jp.nostr.wirednet.jp".to_string(),
                    "wss://relay.damus.io".to_string(),
                ],
            },
            storage: StorageConfig {
                data_dir: default_data_dir(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("WAYBACK_BOOTSTRAP_RELAYS") {
            let relays: Vec<String> = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !relays.is_empty() {
                cfg.network.bootstrap_relays = relays;
            }
        }
        if let Ok(v) = std::env::var("WAYBACK_DATA_DIR") {
            let v = v.trim();
            if !v.is_empty() {
                cfg.storage.data_dir = v.to_string();
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.network.bootstrap_relays.is_empty() {
            return Err("Network bootstrap_relays must not be empty".to_string());
        }
        if self.storage.data_dir.is_empty() {
            return Err("Storage data_dir must not be empty".to_string());
        }
        Ok(())
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("nostr-wayback").to_string_lossy().into_owned())
        .unwrap_or_else(|| "./data".to_string())
}
