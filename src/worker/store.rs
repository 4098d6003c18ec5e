use super::{CacheKey, CacheStore, Response};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory [`CacheStore`].
///
/// Uses a Mutex so concurrent lookups and inserts from parallel requests are
/// safe. A poisoned lock is recovered: entries are plain data and stay valid.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, Response>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored URLs, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.lock().keys().map(|k| k.url.clone()).collect();
        urls.sort();
        urls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Response>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn lookup(&self, key: &CacheKey) -> Option<Response> {
        self.lock().get(key).cloned()
    }

    fn store(&self, key: CacheKey, response: Response) {
        self.lock().insert(key, response);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
