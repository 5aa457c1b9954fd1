//! Cache key definitions.

use uuid::Uuid;

/// A family of cached queries invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    /// Post pages, posts by category and single posts.
    Posts,
    Categories,
    Episodes,
}

/// One cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Categories,
    Episodes,
    /// A page of the published feed, keyed by the raw cursor and page size.
    PostPage { cursor: Option<String>, limit: u32 },
    /// Posts filed under a category storage key (`unknown` for the sentinel).
    PostsInCategory(String),
    Post(Uuid),
}

impl QueryKey {
    pub fn scope(&self) -> CacheScope {
        match self {
            QueryKey::Categories => CacheScope::Categories,
            QueryKey::Episodes => CacheScope::Episodes,
            QueryKey::PostPage { .. } | QueryKey::PostsInCategory(_) | QueryKey::Post(_) => {
                CacheScope::Posts
            }
        }
    }

    /// Metric label naming the kind of query.
    pub fn label(&self) -> &'static str {
        match self {
            QueryKey::Categories => "categories",
            QueryKey::Episodes => "episodes",
            QueryKey::PostPage { .. } => "post_page",
            QueryKey::PostsInCategory(_) => "posts_in_category",
            QueryKey::Post(_) => "post",
        }
    }
}
