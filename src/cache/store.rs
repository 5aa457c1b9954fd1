//! TTL-bounded LRU storage for query results.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use lru::LruCache;
use metrics::counter;
use uuid::Uuid;

use crate::application::pagination::CursorPage;
use crate::domain::entities::{CategoryRecord, EpisodeRecord, PublishedPostRecord};

use super::config::CacheConfig;
use super::keys::{CacheScope, QueryKey};
use super::lock::rw_write;

const SOURCE: &str = "cache::store";

#[derive(Debug, Clone)]
enum CachedValue {
    Categories(Vec<CategoryRecord>),
    Episodes(Vec<EpisodeRecord>),
    PostPage(CursorPage<PublishedPostRecord>),
    Posts(Vec<PublishedPostRecord>),
    Post(PublishedPostRecord),
}

#[derive(Debug, Clone)]
struct Entry {
    filled_at: Instant,
    value: CachedValue,
}

/// Taken before reading the store. A fill is discarded when its scope was
/// invalidated after the ticket was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket {
    scope: CacheScope,
    generation: u64,
}

struct Slots {
    entries: LruCache<QueryKey, Entry>,
    generations: HashMap<CacheScope, u64>,
}

impl Slots {
    fn generation(&self, scope: CacheScope) -> u64 {
        self.generations.get(&scope).copied().unwrap_or(0)
    }
}

pub struct QueryCache {
    config: CacheConfig,
    slots: RwLock<Slots>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let slots = RwLock::new(Slots {
            entries: LruCache::new(config.capacity),
            generations: HashMap::new(),
        });
        Self { config, slots }
    }

    pub fn ticket(&self, scope: CacheScope) -> FillTicket {
        let generation = rw_write(&self.slots, SOURCE, "ticket").generation(scope);
        FillTicket { scope, generation }
    }

    pub fn categories(&self) -> Option<Vec<CategoryRecord>> {
        match self.lookup(&QueryKey::Categories)? {
            CachedValue::Categories(value) => Some(value),
            _ => None,
        }
    }

    pub fn store_categories(&self, ticket: FillTicket, value: Vec<CategoryRecord>) {
        self.fill(ticket, QueryKey::Categories, CachedValue::Categories(value));
    }

    pub fn episodes(&self) -> Option<Vec<EpisodeRecord>> {
        match self.lookup(&QueryKey::Episodes)? {
            CachedValue::Episodes(value) => Some(value),
            _ => None,
        }
    }

    pub fn store_episodes(&self, ticket: FillTicket, value: Vec<EpisodeRecord>) {
        self.fill(ticket, QueryKey::Episodes, CachedValue::Episodes(value));
    }

    pub fn post_page(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Option<CursorPage<PublishedPostRecord>> {
        let key = QueryKey::PostPage {
            cursor: cursor.map(str::to_string),
            limit,
        };
        match self.lookup(&key)? {
            CachedValue::PostPage(value) => Some(value),
            _ => None,
        }
    }

    pub fn store_post_page(
        &self,
        ticket: FillTicket,
        cursor: Option<&str>,
        limit: u32,
        page: CursorPage<PublishedPostRecord>,
    ) {
        let key = QueryKey::PostPage {
            cursor: cursor.map(str::to_string),
            limit,
        };
        self.fill(ticket, key, CachedValue::PostPage(page));
    }

    pub fn posts_in_category(&self, category_key: &str) -> Option<Vec<PublishedPostRecord>> {
        match self.lookup(&QueryKey::PostsInCategory(category_key.to_string()))? {
            CachedValue::Posts(value) => Some(value),
            _ => None,
        }
    }

    pub fn store_posts_in_category(
        &self,
        ticket: FillTicket,
        category_key: &str,
        posts: Vec<PublishedPostRecord>,
    ) {
        self.fill(
            ticket,
            QueryKey::PostsInCategory(category_key.to_string()),
            CachedValue::Posts(posts),
        );
    }

    pub fn post(&self, id: Uuid) -> Option<PublishedPostRecord> {
        match self.lookup(&QueryKey::Post(id))? {
            CachedValue::Post(value) => Some(value),
            _ => None,
        }
    }

    pub fn store_post(&self, ticket: FillTicket, post: PublishedPostRecord) {
        self.fill(ticket, QueryKey::Post(post.id), CachedValue::Post(post));
    }

    /// Drops every entry belonging to `scope` and voids outstanding tickets for it.
    pub fn invalidate(&self, scope: CacheScope) {
        if !self.config.enabled {
            return;
        }
        let mut slots = rw_write(&self.slots, SOURCE, "invalidate");
        *slots.generations.entry(scope).or_default() += 1;
        let stale: Vec<QueryKey> = slots
            .entries
            .iter()
            .filter(|(key, _)| key.scope() == scope)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            slots.entries.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        rw_write(&self.slots, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &QueryKey) -> Option<CachedValue> {
        if !self.config.enabled {
            return None;
        }

        let mut slots = rw_write(&self.slots, SOURCE, "lookup");
        let fresh = match slots.entries.get(key) {
            Some(entry) if entry.filled_at.elapsed() < self.config.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                slots.entries.pop(key);
                None
            }
            None => None,
        };
        drop(slots);

        match fresh {
            Some(value) => {
                counter!("peaklife_cache_hit_total", "query" => key.label()).increment(1);
                Some(value)
            }
            None => {
                counter!("peaklife_cache_miss_total", "query" => key.label()).increment(1);
                None
            }
        }
    }

    fn fill(&self, ticket: FillTicket, key: QueryKey, value: CachedValue) {
        if !self.config.enabled || ticket.scope != key.scope() {
            return;
        }
        let mut slots = rw_write(&self.slots, SOURCE, "fill");
        if slots.generation(ticket.scope) != ticket.generation {
            return;
        }
        let entry = Entry {
            filled_at: Instant::now(),
            value,
        };
        let displaced = slots.entries.push(key.clone(), entry);
        drop(slots);
        if let Some((evicted_key, _)) = displaced
            && evicted_key != key
        {
            counter!("peaklife_cache_evict_total", "query" => evicted_key.label()).increment(1);
        }
    }
}
