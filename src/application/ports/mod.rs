pub mod event_fetcher;
pub mod identity_store;
pub mod session_lifecycle;

pub use event_fetcher::{EventFetcher, FollowAndRelayLists};
pub use identity_store::IdentityStore;
pub use session_lifecycle::SessionLifecycle;
