use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::search::{SearchHit, SearchOptions};
use kgraph_common::config::DEFAULT_SEARCH_CACHE_SIZE;

/// Cache key covering every parameter that affects a result set.
/// Thresholds are stored as raw bits so the key can derive `Hash`/`Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    query: String,
    limit: usize,
    threshold_bits: u64,
    types: Option<Vec<String>>,
    fuzzy: bool,
}

impl CacheKey {
    pub(crate) fn new(query: &str, options: &SearchOptions) -> Self {
        Self {
            query: query.to_lowercase(),
            limit: options.limit,
            threshold_bits: options.threshold.to_bits(),
            types: options.types.clone(),
            fuzzy: options.fuzzy,
        }
    }
}

/// FIFO cache for search results. Any graph mutation clears the whole
/// cache rather than trying to invalidate individual entries.
pub(crate) struct ResultCache {
    entries: HashMap<CacheKey, Vec<SearchHit>>,
    order: VecDeque<CacheKey>,
    capacity: usize,
}

impl ResultCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<Vec<SearchHit>> {
        match self.entries.get(key) {
            Some(hits) => {
                debug!("Search cache HIT for '{}'", key.query);
                Some(hits.clone())
            }
            None => {
                debug!("Search cache MISS for '{}'", key.query);
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, key: CacheKey, hits: Vec<SearchHit>) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, hits);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, hits);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_CACHE_SIZE)
    }
}
