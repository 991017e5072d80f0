use crate::application::ports::{EventFetcher, SessionLifecycle};
use crate::application::services::session_service::SessionService;
use crate::domain::value_objects::{WaybackQuery, WaybackQueryInputs};
use crate::infrastructure::cache::PostCacheService;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Drives wayback queries: holds the pending inputs, resolves them into a
/// concrete window and streams matching posts into the post cache.
///
/// A new fetch always supersedes the previous one. Each run takes a fetch
/// sequence number and records the session generation it started under;
/// records arriving after either has moved on are dropped, so a fresh cache
/// is never polluted by a superseded stream.
///
/// Register the service with [`SessionService::register_lifecycle`] so that
/// clearing the identity also drops the pending inputs and ongoing query.
pub struct TimelineService {
    fetcher: Arc<dyn EventFetcher>,
    session: Arc<SessionService>,
    post_cache: PostCacheService,
    inputs: RwLock<Option<WaybackQueryInputs>>,
    ongoing: RwLock<Option<WaybackQuery>>,
    fetch_seq: AtomicU64,
    run_lock: Mutex<()>,
}

impl TimelineService {
    pub fn new(
        fetcher: Arc<dyn EventFetcher>,
        session: Arc<SessionService>,
        post_cache: PostCacheService,
    ) -> Self {
        Self {
            fetcher,
            session,
            post_cache,
            inputs: RwLock::new(None),
            ongoing: RwLock::new(None),
            fetch_seq: AtomicU64::new(0),
            run_lock: Mutex::new(()),
        }
    }

    pub async fn set_inputs(&self, inputs: WaybackQueryInputs) {
        *self.inputs.write().await = Some(inputs);
    }

    pub async fn inputs(&self) -> Option<WaybackQueryInputs> {
        self.inputs.read().await.clone()
    }

    /// Drops the pending inputs and the record of the ongoing query.
    pub async fn clear(&self) {
        *self.inputs.write().await = None;
        *self.ongoing.write().await = None;
    }

    /// Resolves the pending inputs against the wall clock. Relative inputs
    /// yield a different window on every call; resolution happens on read,
    /// never ahead of time.
    pub async fn current_query(&self) -> Option<WaybackQuery> {
        let inputs = self.inputs.read().await.clone()?;
        WaybackQuery::from_inputs(&inputs)
    }

    /// The window the latest fetch ran with, if any.
    pub async fn ongoing_query(&self) -> Option<WaybackQuery> {
        *self.ongoing.read().await
    }

    /// Resolves the pending inputs and runs the fetch.
    ///
    /// Returns the resolved window when a fetch actually ran, `Ok(None)`
    /// when inputs are absent or unresolvable, or when the session is not
    /// ready for fetching.
    pub async fn run_wayback_query(&self) -> Result<Option<WaybackQuery>, AppError> {
        let Some(query) = self.current_query().await else {
            debug!("no resolvable wayback inputs; fetch skipped");
            return Ok(None);
        };
        let ran = self.run_query(query).await?;
        Ok(ran.then_some(query))
    }

    /// Runs a fetch for an already resolved window.
    ///
    /// Silently does nothing unless a logged-in identity with a non-empty
    /// follow list and at least one read relay is present. When it does run,
    /// the post cache and selection are reset first, then posts stream in;
    /// records outside the window or of the wrong kind are skipped.
    pub async fn run_query(&self, query: WaybackQuery) -> Result<bool, AppError> {
        let Some(user) = self.session.current().await else {
            debug!("no identity; fetch skipped");
            return Ok(false);
        };
        let follow_list = user.follow_list.clone().unwrap_or_default();
        let read_relays = user.read_relays();
        if user.pubkey.is_empty() || follow_list.is_empty() || read_relays.is_empty() {
            debug!("identity not ready for fetching; fetch skipped");
            return Ok(false);
        }

        let generation = self.session.generation();
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;

        // Setup runs under a lock with a staleness re-check, so a superseded
        // run cannot wipe the cache a newer run has already rebuilt.
        {
            let _setup = self.run_lock.lock().await;
            if self.session.generation() != generation
                || self.fetch_seq.load(Ordering::SeqCst) != seq
            {
                debug!("wayback fetch superseded before streaming");
                return Ok(true);
            }
            *self.ongoing.write().await = Some(query);
            self.post_cache.clear_selection().await;
            self.post_cache.clear().await;
        }

        let authors = dedup_authors(&follow_list, &user.pubkey);
        info!(
            authors = authors.len(),
            since = query.since,
            until = query.until,
            "starting wayback fetch"
        );

        let mut rx = self
            .fetcher
            .stream_posts(&authors, &query, &read_relays)
            .await?;
        let mut inserted = 0usize;
        while let Some(post) = rx.recv().await {
            if self.session.generation() != generation
                || self.fetch_seq.load(Ordering::SeqCst) != seq
            {
                debug!("wayback fetch superseded; stopping");
                return Ok(true);
            }
            if !post.is_text_note() {
                debug!(id = %post.id, kind = post.kind, "skipping non text note");
                continue;
            }
            if !query.contains(post.created_at) {
                debug!(id = %post.id, created_at = post.created_at, "skipping post outside window");
                continue;
            }
            self.post_cache.insert(post).await;
            inserted += 1;
        }
        info!(inserted, "wayback fetch finished");
        Ok(true)
    }
}

#[async_trait]
impl SessionLifecycle for TimelineService {
    async fn on_session_reset(&self) {
        self.clear().await;
    }
}

/// Followed authors plus the identity itself, first occurrence wins.
fn dedup_authors(follow_list: &[String], own_pubkey: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    follow_list
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(own_pubkey))
        .filter(|pubkey| seen.insert(pubkey.to_string()))
        .map(str::to_string)
        .collect()
}
