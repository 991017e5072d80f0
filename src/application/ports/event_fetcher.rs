use crate::domain::entities::{Post, ProfileRecord, RelayList};
use crate::domain::value_objects::WaybackQuery;
use crate::shared::error::AppError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Follow and relay lists resolved for one identity.
#[derive(Debug, Clone, Default)]
pub struct FollowAndRelayLists {
    pub follow_list: Vec<String>,
    pub relay_list: RelayList,
}

/// Boundary to the relay-facing fetch collaborator.
///
/// Implementations own transport, retries and relay health; the core only
/// distinguishes "produced a value/stream" from a fatal `Err`. Streams are
/// finite, unordered and may contain duplicates; per-record parse failures
/// are the implementation's to skip, they never abort a stream.
#[async_trait]
pub trait EventFetcher: Send + Sync {
    /// Newest profile record for `pubkey`, or `None` when no relay has one.
    async fn fetch_latest_profile(
        &self,
        pubkey: &str,
        relay_urls: &[String],
    ) -> Result<Option<ProfileRecord>, AppError>;

    /// Streams profile records for all of `pubkeys`.
    async fn stream_profiles(
        &self,
        pubkeys: &[String],
        relay_urls: &[String],
    ) -> Result<mpsc::Receiver<ProfileRecord>, AppError>;

    /// Newest follow and relay lists for `pubkey`. A missing list surfaces
    /// as an empty one, not an error.
    async fn fetch_follow_and_relay_lists(
        &self,
        pubkey: &str,
        relay_urls: &[String],
    ) -> Result<FollowAndRelayLists, AppError>;

    /// Streams text notes authored by `authors` within `range`.
    async fn stream_posts(
        &self,
        authors: &[String],
        range: &WaybackQuery,
        relay_urls: &[String],
    ) -> Result<mpsc::Receiver<Post>, AppError>;
}
