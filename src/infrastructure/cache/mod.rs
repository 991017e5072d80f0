pub mod post_cache;
pub mod profile_cache;

pub use post_cache::{PostCacheService, PostOrder};
pub use profile_cache::ProfileCacheService;
