//! Reactive session core for a wayback-style Nostr timeline reader.
//!
//! The crate resolves an identity into its profile, follow and relay lists,
//! keeps session-scoped profile and post caches, and turns "show me an hour
//! starting last Tuesday noon" style inputs into concrete fetch windows.
//! Relay transport sits behind the [`application::ports::EventFetcher`]
//! boundary; everything here is transport-agnostic.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{EventFetcher, FollowAndRelayLists, IdentityStore, SessionLifecycle};
pub use application::services::{SessionService, TimelineService, UserData};
pub use domain::entities::{Post, Profile, ProfileRecord, RelayList, RelayUsage};
pub use domain::value_objects::{TimeUnit, WaybackQuery, WaybackQueryInputs};
pub use infrastructure::cache::{PostCacheService, PostOrder, ProfileCacheService};
pub use infrastructure::storage::FileIdentityStore;
pub use shared::{AppConfig, AppError};

/// Initializes tracing for binaries and integration harnesses.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nostr_wayback=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
