use async_trait::async_trait;

/// Observer for session boundary events.
///
/// Components holding session-scoped state outside the caches register with
/// the session service and drop that state when the identity is cleared.
#[async_trait]
pub trait SessionLifecycle: Send + Sync {
    async fn on_session_reset(&self);
}
