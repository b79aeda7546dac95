//! # Identity Cache
//!
//! Maps canonical (prefix-stripped) resource URIs to the one [`Item`] instance
//! representing each resource. Decoding consults it so that every decode of
//! the same URI yields the same `Arc`.
//!
//! [`MemoryCache`] is the unbounded default. [`BoundedCache`] evicts the least
//! recently used entry once it reaches capacity. Anything implementing
//! [`ItemCache`] can be plugged in with
//! [`PotionClient::with_cache`](crate::client::PotionClient::with_cache).
//!
//! [`Item`]: crate::item::Item

use crate::item::ItemRef;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Storage contract for the identity cache.
pub trait ItemCache: Send + Sync {
    fn get(&self, uri: &str) -> Option<ItemRef>;

    /// Stores `item` under `uri` and returns it.
    fn put(&self, uri: &str, item: ItemRef) -> ItemRef;

    fn remove(&self, uri: &str);
}

/// Unbounded in-memory cache.
#[derive(Default)]
pub struct MemoryCache {
    items: Mutex<HashMap<String, ItemRef>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl ItemCache for MemoryCache {
    fn get(&self, uri: &str) -> Option<ItemRef> {
        self.items.lock().get(uri).cloned()
    }

    fn put(&self, uri: &str, item: ItemRef) -> ItemRef {
        self.items.lock().insert(uri.to_string(), item.clone());
        item
    }

    fn remove(&self, uri: &str) {
        self.items.lock().remove(uri);
    }
}

struct BoundedState {
    items: HashMap<String, ItemRef>,
    // front = least recently used
    order: VecDeque<String>,
}

impl BoundedState {
    fn touch(&mut self, uri: &str) {
        if let Some(pos) = self.order.iter().position(|u| u == uri) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }
}

/// Least-recently-used cache holding at most `capacity` items.
pub struct BoundedCache {
    capacity: usize,
    state: Mutex<BoundedState>,
}

impl BoundedCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(BoundedState {
                items: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl ItemCache for BoundedCache {
    fn get(&self, uri: &str) -> Option<ItemRef> {
        let mut state = self.state.lock();
        let item = state.items.get(uri).cloned();
        if item.is_some() {
            state.touch(uri);
        }
        item
    }

    fn put(&self, uri: &str, item: ItemRef) -> ItemRef {
        let mut state = self.state.lock();
        if state.items.insert(uri.to_string(), item.clone()).is_some() {
            state.touch(uri);
        } else {
            state.order.push_back(uri.to_string());
        }
        while state.items.len() > self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.items.remove(&oldest);
                    tracing::debug!(uri = %oldest, "Evicted");
                }
                None => break,
            }
        }
        item
    }

    fn remove(&self, uri: &str) {
        let mut state = self.state.lock();
        if state.items.remove(uri).is_some() {
            state.order.retain(|u| u != uri);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use crate::registry::{ResourceOptions, ResourceType};
    use std::sync::Arc;

    fn item(uri: &str) -> ItemRef {
        let resource = ResourceType::detached("Widget", "/widget", ResourceOptions::new());
        Item::placeholder(resource, uri.to_string(), None)
    }

    #[test]
    fn test_memory_cache_identity() {
        let cache = MemoryCache::new();
        let a = item("/widget/1");
        let stored = cache.put("/widget/1", a.clone());
        assert!(Arc::ptr_eq(&a, &stored));
        assert!(Arc::ptr_eq(&a, &cache.get("/widget/1").unwrap()));
        assert_eq!(cache.len(), 1);

        cache.remove("/widget/1");
        assert!(cache.get("/widget/1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bounded_cache_evicts_least_recent() {
        let cache = BoundedCache::new(2);
        cache.put("/widget/1", item("/widget/1"));
        cache.put("/widget/2", item("/widget/2"));

        // refresh 1 so 2 becomes the oldest
        assert!(cache.get("/widget/1").is_some());
        cache.put("/widget/3", item("/widget/3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("/widget/2").is_none());
        assert!(cache.get("/widget/1").is_some());
        assert!(cache.get("/widget/3").is_some());
    }

    #[test]
    fn test_bounded_cache_replace_and_remove() {
        let cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);

        let first = item("/widget/1");
        let second = item("/widget/1");
        cache.put("/widget/1", first);
        cache.put("/widget/1", second.clone());
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&second, &cache.get("/widget/1").unwrap()));

        cache.remove("/widget/1");
        assert!(cache.is_empty());
    }
}
