use crate::domain::entities::Post;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Sort order for derived post id views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    CreatedAtAsc,
    CreatedAtDesc,
}

#[derive(Default)]
struct PostCacheInner {
    posts: HashMap<String, Post>,
    selected: HashSet<String>,
}

/// Session-scoped post cache with insert-once semantics, derived sort views
/// and an independent selection subset.
///
/// Posts and selection share one lock so a selection view never observes a
/// half-updated cache. Ordered views are recomputed from the current
/// contents on each call; working sets are small enough that incremental
/// resorting is not worth its bookkeeping.
#[derive(Clone, Default)]
pub struct PostCacheService {
    inner: Arc<RwLock<PostCacheInner>>,
}

impl PostCacheService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PostCacheInner::default())),
        }
    }

    /// Adds a post; re-insertion of an already cached id is a no-op.
    pub async fn insert(&self, post: Post) {
        let mut inner = self.inner.write().await;
        inner.posts.entry(post.id.clone()).or_insert(post);
    }

    /// Removes a post; absent ids are a no-op.
    pub async fn remove(&self, id: &str) {
        let mut inner = self.inner.write().await;
        inner.posts.remove(id);
    }

    pub async fn get(&self, id: &str) -> Option<Post> {
        let inner = self.inner.read().await;
        inner.posts.get(id).cloned()
    }

    /// Drops all cached posts. Selection is cleared separately; a selected
    /// id without a cached post simply stops appearing in selection views.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.posts.clear();
    }

    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.posts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All cached post ids in a deterministic total order on
    /// `(created_at, id)`. Descending is the exact reverse of ascending.
    pub async fn ordered_ids(&self, order: PostOrder) -> Vec<String> {
        let inner = self.inner.read().await;
        sorted_ids(inner.posts.values(), order)
    }

    /// Flips selection membership of an id. The id does not have to resolve
    /// to a cached post; selection is tracked independently.
    pub async fn toggle_selected(&self, id: &str) {
        let mut inner = self.inner.write().await;
        if !inner.selected.remove(id) {
            inner.selected.insert(id.to_string());
        }
    }

    pub async fn is_selected(&self, id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.selected.contains(id)
    }

    /// Selected ids that still resolve to cached posts, ordered like
    /// [`Self::ordered_ids`].
    pub async fn selected_ids(&self, order: PostOrder) -> Vec<String> {
        let inner = self.inner.read().await;
        sorted_ids(
            inner
                .posts
                .values()
                .filter(|post| inner.selected.contains(&post.id)),
            order,
        )
    }

    pub async fn clear_selection(&self) {
        let mut inner = self.inner.write().await;
        inner.selected.clear();
    }
}

fn sorted_ids<'a>(posts: impl Iterator<Item = &'a Post>, order: PostOrder) -> Vec<String> {
    let mut posts: Vec<&Post> = posts.collect();
    posts.sort_by(|a, b| {
        let ordering = a
            .created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id));
        match order {
            PostOrder::CreatedAtAsc => ordering,
            PostOrder::CreatedAtDesc => ordering.reverse(),
        }
    });
    posts.into_iter().map(|post| post.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, created_at: i64) -> Post {
        Post::text_note(id, "author", format!("content of {id}"), created_at)
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let cache = PostCacheService::new();
        let original = post("id1", 100);
        cache.insert(original.clone()).await;

        let mut duplicate = post("id1", 100);
        duplicate.content = "replayed with different content".to_string();
        cache.insert(duplicate).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("id1").await, Some(original));
    }

    #[tokio::test]
    async fn remove_absent_id_is_a_noop() {
        let cache = PostCacheService::new();
        cache.insert(post("id1", 100)).await;
        cache.remove("missing").await;
        cache.remove("id1").await;
        cache.remove("id1").await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn ordered_ids_sorts_by_created_at_then_id() {
        let cache = PostCacheService::new();
        cache.insert(post("b", 200)).await;
        cache.insert(post("c", 100)).await;
        cache.insert(post("a", 200)).await;

        let asc = cache.ordered_ids(PostOrder::CreatedAtAsc).await;
        assert_eq!(asc, vec!["c", "a", "b"]);

        let desc = cache.ordered_ids(PostOrder::CreatedAtDesc).await;
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
    }

    #[tokio::test]
    async fn selection_surfaces_only_cached_posts() {
        let cache = PostCacheService::new();
        cache.insert(post("id1", 100)).await;
        cache.insert(post("id2", 200)).await;

        cache.toggle_selected("id2").await;
        cache.toggle_selected("ghost").await;

        assert_eq!(
            cache.selected_ids(PostOrder::CreatedAtAsc).await,
            vec!["id2"]
        );
    }

    #[tokio::test]
    async fn removing_a_post_drops_it_from_selection_views() {
        let cache = PostCacheService::new();
        cache.insert(post("id1", 100)).await;
        cache.toggle_selected("id1").await;
        assert_eq!(
            cache.selected_ids(PostOrder::CreatedAtAsc).await,
            vec!["id1"]
        );

        cache.remove("id1").await;
        assert!(cache.selected_ids(PostOrder::CreatedAtAsc).await.is_empty());
        // Membership survives; only the view hides the id.
        assert!(cache.is_selected("id1").await);
    }

    #[tokio::test]
    async fn toggle_twice_deselects() {
        let cache = PostCacheService::new();
        cache.insert(post("id1", 100)).await;
        cache.toggle_selected("id1").await;
        cache.toggle_selected("id1").await;
        assert!(!cache.is_selected("id1").await);
        assert!(cache.selected_ids(PostOrder::CreatedAtDesc).await.is_empty());
    }

    #[tokio::test]
    async fn selection_ordering_matches_post_ordering() {
        let cache = PostCacheService::new();
        for (id, ts) in [("a", 300), ("b", 100), ("c", 200)] {
            cache.insert(post(id, ts)).await;
            cache.toggle_selected(id).await;
        }

        assert_eq!(
            cache.selected_ids(PostOrder::CreatedAtAsc).await,
            vec!["b", "c", "a"]
        );
        assert_eq!(
            cache.selected_ids(PostOrder::CreatedAtDesc).await,
            vec!["a", "c", "b"]
        );
    }

    #[tokio::test]
    async fn clear_and_clear_selection_are_independent() {
        let cache = PostCacheService::new();
        cache.insert(post("id1", 100)).await;
        cache.toggle_selected("id1").await;

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert!(cache.is_selected("id1").await);

        cache.clear_selection().await;
        assert!(!cache.is_selected("id1").await);
    }
}
