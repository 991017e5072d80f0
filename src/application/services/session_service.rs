use crate::application::ports::{EventFetcher, FollowAndRelayLists, IdentityStore, SessionLifecycle};
use crate::domain::entities::{ProfileRecord, RelayList};
use crate::infrastructure::cache::{PostCacheService, ProfileCacheService};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Everything resolved for the current identity.
///
/// `pubkey` is empty while logged out; the optional fields are absent until
/// resolution completes (or when the relays simply have no such record).
#[derive(Debug, Clone, Default)]
pub struct UserData {
    pub pubkey: String,
    pub profile: Option<ProfileRecord>,
    pub follow_list: Option<Vec<String>>,
    pub relay_list: Option<RelayList>,
}

impl UserData {
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Whether downstream fetches may run against this bundle.
    pub fn is_ready(&self) -> bool {
        !self.pubkey.is_empty() && self.follow_list.is_some() && self.relay_list.is_some()
    }

    pub fn read_relays(&self) -> Vec<String> {
        self.relay_list
            .as_ref()
            .map(RelayList::read_relays)
            .unwrap_or_default()
    }
}

/// Resolves the dependent bundle for the current identity and owns the
/// session lifecycle of both caches.
///
/// All session-scoped state hangs off one identity: changing it invalidates
/// every derived value. Each resolution bumps a generation counter;
/// background work captures the generation it was spawned under and stops as
/// soon as the counter moves on, so writes from a superseded session never
/// land in a fresh cache.
pub struct SessionService {
    fetcher: Arc<dyn EventFetcher>,
    identity_store: Arc<dyn IdentityStore>,
    profile_cache: ProfileCacheService,
    post_cache: PostCacheService,
    config: AppConfig,
    current: RwLock<Option<UserData>>,
    generation: Arc<AtomicU64>,
    lifecycle: RwLock<Vec<Arc<dyn SessionLifecycle>>>,
}

impl SessionService {
    pub fn new(
        fetcher: Arc<dyn EventFetcher>,
        identity_store: Arc<dyn IdentityStore>,
        profile_cache: ProfileCacheService,
        post_cache: PostCacheService,
        config: AppConfig,
    ) -> Self {
        Self {
            fetcher,
            identity_store,
            profile_cache,
            post_cache,
            config,
            current: RwLock::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            lifecycle: RwLock::new(Vec::new()),
        }
    }

    /// Registers a component whose session-scoped state must drop together
    /// with the caches when the identity is cleared.
    pub async fn register_lifecycle(&self, observer: Arc<dyn SessionLifecycle>) {
        self.lifecycle.write().await.push(observer);
    }

    /// Persists the identity and resolves its bundle.
    pub async fn login(&self, pubkey: &str) -> Result<UserData, AppError> {
        self.identity_store.save(pubkey).await?;
        self.resolve(pubkey).await
    }

    /// Clears the persisted identity and resets all session state.
    pub async fn logout(&self) -> Result<(), AppError> {
        self.identity_store.clear().await?;
        self.resolve("").await?;
        Ok(())
    }

    /// Resolves whatever identity the store holds, if any.
    pub async fn restore(&self) -> Result<UserData, AppError> {
        let pubkey = self.identity_store.load().await?.unwrap_or_default();
        self.resolve(&pubkey).await
    }

    /// Resolves the bundle for `pubkey`.
    ///
    /// The empty pubkey means "logged out": both caches, the selection and
    /// every registered lifecycle observer are reset synchronously,
    /// regardless of in-flight work for the previous identity. Otherwise the newest profile and the follow/relay
    /// lists are fetched concurrently, the self profile seeds the profile
    /// cache, and a background task starts merging followed profiles.
    /// Collaborator faults propagate to the caller.
    pub async fn resolve(&self, pubkey: &str) -> Result<UserData, AppError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if pubkey.is_empty() {
            self.profile_cache.clear().await;
            self.post_cache.clear_selection().await;
            self.post_cache.clear().await;
            *self.current.write().await = None;
            let observers: Vec<_> = self.lifecycle.read().await.clone();
            for observer in &observers {
                observer.on_session_reset().await;
            }
            info!("identity cleared; session caches reset");
            return Ok(UserData::logged_out());
        }

        let bootstrap = &self.config.network.bootstrap_relays;
        let (profile, lists) = tokio::join!(
            self.fetcher.fetch_latest_profile(pubkey, bootstrap),
            self.fetcher.fetch_follow_and_relay_lists(pubkey, bootstrap),
        );
        let profile = profile?;
        let FollowAndRelayLists {
            follow_list,
            relay_list,
        } = lists?;

        let data = UserData {
            pubkey: pubkey.to_string(),
            profile: profile.clone(),
            follow_list: Some(follow_list),
            relay_list: Some(relay_list),
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(%pubkey, "identity resolution superseded; discarding");
            return Ok(data);
        }

        if let Some(record) = profile {
            self.profile_cache.put(record).await;
        }
        *self.current.write().await = Some(data.clone());
        info!(
            %pubkey,
            follows = data.follow_list.as_ref().map_or(0, Vec::len),
            relays = data.relay_list.as_ref().map_or(0, RelayList::len),
            "identity resolved"
        );

        self.spawn_profile_sync(&data, generation);
        Ok(data)
    }

    pub async fn current(&self) -> Option<UserData> {
        self.current.read().await.clone()
    }

    /// Current session generation; work tagged with an older value is stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Streams profiles for the follow list into the profile cache.
    ///
    /// Runs until the stream ends or the session generation moves on. A
    /// failure to open the stream only logs: profiles showing up late (or
    /// not at all) is "no data yet", not an error.
    fn spawn_profile_sync(&self, data: &UserData, generation: u64) {
        let follow_list = data.follow_list.clone().unwrap_or_default();
        if follow_list.is_empty() {
            return;
        }
        let relay_urls = data.read_relays();
        let fetcher = Arc::clone(&self.fetcher);
        let profile_cache = self.profile_cache.clone();
        let current_generation = Arc::clone(&self.generation);

        tokio::spawn(async move {
            let mut rx = match fetcher.stream_profiles(&follow_list, &relay_urls).await {
                Ok(rx) => rx,
                Err(err) => {
                    warn!("profile sync failed to start: {err}");
                    return;
                }
            };
            let mut merged = 0usize;
            while let Some(record) = rx.recv().await {
                if current_generation.load(Ordering::SeqCst) != generation {
                    debug!("profile sync superseded; stopping");
                    return;
                }
                profile_cache.put(record).await;
                merged += 1;
            }
            debug!(merged, "profile sync finished");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::event_fetcher::FollowAndRelayLists;
    use crate::domain::entities::{Post, Profile, RelayUsage};
    use crate::domain::value_objects::WaybackQuery;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};
    use tokio::time::sleep;

    fn record(pubkey: &str, name: &str, created_at: i64) -> ProfileRecord {
        let mut profile = Profile::default();
        profile.name = Some(name.to_string());
        ProfileRecord::new(profile, pubkey, created_at)
    }

    struct TestFetcher {
        self_profile: Option<ProfileRecord>,
        follow_list: Vec<String>,
        relay_list: RelayList,
        streamed_profiles: Vec<ProfileRecord>,
        /// When set, `stream_profiles` hands the sender to the test instead
        /// of pre-filling the channel.
        profile_tx_slot: Mutex<Option<mpsc::Sender<ProfileRecord>>>,
        hold_profile_stream: bool,
    }

    impl TestFetcher {
        fn new() -> Self {
            let mut relay_list = RelayList::new();
            relay_list.insert(
                "wss://read.example",
                RelayUsage {
                    read: true,
                    write: false,
                },
            );
            Self {
                self_profile: Some(record("self", "me", 100)),
                follow_list: vec!["friend1".to_string(), "friend2".to_string()],
                relay_list,
                streamed_profiles: vec![record("friend1", "f1", 50), record("friend2", "f2", 60)],
                profile_tx_slot: Mutex::new(None),
                hold_profile_stream: false,
            }
        }

        async fn take_profile_sender(&self) -> mpsc::Sender<ProfileRecord> {
            for _ in 0..100 {
                if let Some(tx) = self.profile_tx_slot.lock().await.take() {
                    return tx;
                }
                sleep(Duration::from_millis(5)).await;
            }
            panic!("profile stream never opened");
        }
    }

    #[async_trait]
    impl EventFetcher for TestFetcher {
        async fn fetch_latest_profile(
            &self,
            _pubkey: &str,
            _relay_urls: &[String],
        ) -> Result<Option<ProfileRecord>, AppError> {
            Ok(self.self_profile.clone())
        }

        async fn stream_profiles(
            &self,
            _pubkeys: &[String],
            _relay_urls: &[String],
        ) -> Result<mpsc::Receiver<ProfileRecord>, AppError> {
            let (tx, rx) = mpsc::channel(16);
            if self.hold_profile_stream {
                *self.profile_tx_slot.lock().await = Some(tx);
            } else {
                for profile in &self.streamed_profiles {
                    tx.send(profile.clone()).await.expect("channel open");
                }
            }
            Ok(rx)
        }

        async fn fetch_follow_and_relay_lists(
            &self,
            _pubkey: &str,
            _relay_urls: &[String],
        ) -> Result<FollowAndRelayLists, AppError> {
            Ok(FollowAndRelayLists {
                follow_list: self.follow_list.clone(),
                relay_list: self.relay_list.clone(),
            })
        }

        async fn stream_posts(
            &self,
            _authors: &[String],
            _range: &WaybackQuery,
            _relay_urls: &[String],
        ) -> Result<mpsc::Receiver<Post>, AppError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }
    }

    struct MemoryIdentityStore {
        pubkey: Mutex<Option<String>>,
    }

    impl MemoryIdentityStore {
        fn new() -> Self {
            Self {
                pubkey: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl IdentityStore for MemoryIdentityStore {
        async fn load(&self) -> Result<Option<String>, AppError> {
            Ok(self.pubkey.lock().await.clone())
        }

        async fn save(&self, pubkey: &str) -> Result<(), AppError> {
            *self.pubkey.lock().await = Some(pubkey.to_string());
            Ok(())
        }

        async fn clear(&self) -> Result<(), AppError> {
            *self.pubkey.lock().await = None;
            Ok(())
        }
    }

    fn setup(fetcher: Arc<TestFetcher>) -> (SessionService, ProfileCacheService, PostCacheService) {
        let profile_cache = ProfileCacheService::new();
        let post_cache = PostCacheService::new();
        let service = SessionService::new(
            fetcher,
            Arc::new(MemoryIdentityStore::new()),
            profile_cache.clone(),
            post_cache.clone(),
            AppConfig::default(),
        );
        (service, profile_cache, post_cache)
    }

    async fn wait_for_profiles(cache: &ProfileCacheService, expected: usize) {
        for _ in 0..100 {
            if cache.len().await >= expected {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("profile cache never reached {expected} entries");
    }

    #[tokio::test]
    async fn resolve_seeds_self_profile_and_lists() {
        let (service, profile_cache, _post_cache) = setup(Arc::new(TestFetcher::new()));

        let data = service.resolve("self").await.expect("resolution succeeds");
        assert!(data.is_ready());
        assert_eq!(data.pubkey, "self");
        assert_eq!(data.follow_list.as_deref(), Some(&["friend1".to_string(), "friend2".to_string()][..]));
        assert_eq!(data.read_relays(), vec!["wss://read.example"]);

        let seeded = profile_cache.get("self").await.expect("self profile seeded");
        assert_eq!(seeded.profile.name.as_deref(), Some("me"));
    }

    #[tokio::test]
    async fn background_sync_merges_followed_profiles() {
        let (service, profile_cache, _post_cache) = setup(Arc::new(TestFetcher::new()));

        service.resolve("self").await.expect("resolution succeeds");
        // Self profile plus the two streamed follow profiles.
        wait_for_profiles(&profile_cache, 3).await;

        assert!(profile_cache.get("friend1").await.is_some());
        assert!(profile_cache.get("friend2").await.is_some());
    }

    #[tokio::test]
    async fn resolving_empty_identity_resets_everything() {
        let (service, profile_cache, post_cache) = setup(Arc::new(TestFetcher::new()));

        service.resolve("abc").await.expect("resolution succeeds");
        post_cache.insert(Post::text_note("n1", "abc", "hi", 10)).await;
        post_cache.toggle_selected("n1").await;

        let data = service.resolve("").await.expect("reset succeeds");
        assert!(!data.is_ready());
        assert!(data.pubkey.is_empty());

        assert!(profile_cache.is_empty().await);
        assert!(post_cache.is_empty().await);
        assert!(!post_cache.is_selected("n1").await);
        assert!(service.current().await.is_none());
    }

    #[tokio::test]
    async fn stale_profile_stream_writes_are_suppressed_after_logout() {
        let mut fetcher = TestFetcher::new();
        fetcher.hold_profile_stream = true;
        let fetcher = Arc::new(fetcher);
        let (service, profile_cache, _post_cache) = setup(Arc::clone(&fetcher));

        service.resolve("abc").await.expect("resolution succeeds");
        sleep(Duration::from_millis(10)).await;
        let tx = fetcher.take_profile_sender().await;

        service.resolve("").await.expect("reset succeeds");
        assert!(profile_cache.is_empty().await);

        // A record from the superseded stream arrives late.
        tx.send(record("friend1", "late", 999))
            .await
            .expect("channel still open");
        sleep(Duration::from_millis(20)).await;

        assert!(
            profile_cache.is_empty().await,
            "stale generation write must not land"
        );
    }

    #[tokio::test]
    async fn login_persists_and_restore_resolves() {
        let fetcher = Arc::new(TestFetcher::new());
        let identity_store = Arc::new(MemoryIdentityStore::new());
        let service = SessionService::new(
            Arc::clone(&fetcher) as Arc<dyn EventFetcher>,
            Arc::clone(&identity_store) as Arc<dyn IdentityStore>,
            ProfileCacheService::new(),
            PostCacheService::new(),
            AppConfig::default(),
        );

        service.login("self").await.expect("login succeeds");
        assert_eq!(identity_store.load().await.expect("load"), Some("self".to_string()));

        let restored = service.restore().await.expect("restore succeeds");
        assert_eq!(restored.pubkey, "self");

        service.logout().await.expect("logout succeeds");
        assert_eq!(identity_store.load().await.expect("load"), None);
        assert!(service.current().await.is_none());
    }

    struct RecordingLifecycle {
        resets: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SessionLifecycle for RecordingLifecycle {
        async fn on_session_reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn lifecycle_observers_reset_only_on_empty_identity() {
        let (service, _profile_cache, _post_cache) = setup(Arc::new(TestFetcher::new()));
        let observer = Arc::new(RecordingLifecycle {
            resets: std::sync::atomic::AtomicUsize::new(0),
        });
        service
            .register_lifecycle(Arc::clone(&observer) as Arc<dyn SessionLifecycle>)
            .await;

        service.resolve("abc").await.expect("resolution succeeds");
        assert_eq!(observer.resets.load(Ordering::SeqCst), 0);

        service.logout().await.expect("logout succeeds");
        assert_eq!(observer.resets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generation_advances_on_every_resolution() {
        let (service, _profile_cache, _post_cache) = setup(Arc::new(TestFetcher::new()));
        let g0 = service.generation();
        service.resolve("abc").await.expect("resolve");
        let g1 = service.generation();
        service.resolve("").await.expect("reset");
        let g2 = service.generation();
        assert!(g0 < g1 && g1 < g2);
    }
}
