use crate::shared::error::AppError;
use async_trait::async_trait;

/// Persistence boundary for the current identity.
///
/// The identity key is the only cache state that survives process restarts;
/// everything else is rebuilt from relays on each session start.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Loads the persisted pubkey, `None` when nobody is logged in.
    async fn load(&self) -> Result<Option<String>, AppError>;

    async fn save(&self, pubkey: &str) -> Result<(), AppError>;

    async fn clear(&self) -> Result<(), AppError>;
}
