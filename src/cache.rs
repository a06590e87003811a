//! Bounded LRU cache shared by the prediction stages.
//!
//! Fixed capacity, recency eviction, interior mutual exclusion so the
//! predictor and the task-queue worker can share one instance. The recency
//! list lives in a slot arena addressed by plain indices, so promoting an
//! entry is two unlinks and a relink with no allocation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
}

struct Inner<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// `capacity` must be nonzero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LruCache capacity must be nonzero");
        Self {
            inner: Mutex::new(Inner {
                capacity,
                map: HashMap::with_capacity(capacity),
                slots: Vec::new(),
                free: Vec::new(),
                head: None,
                tail: None,
            }),
        }
    }

    /// Fetch a value, promoting the entry to most-recent on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        let idx = *inner.map.get(key)?;
        inner.detach(idx);
        inner.attach_front(idx);
        Some(inner.slots[idx].value.clone())
    }

    /// Insert or replace, evicting the least-recently-used entry past capacity.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&idx) = inner.map.get(&key) {
            inner.slots[idx].value = value;
            inner.detach(idx);
            inner.attach_front(idx);
            return;
        }

        if inner.map.len() == inner.capacity {
            if let Some(tail) = inner.tail {
                inner.detach(tail);
                let old_key = inner.slots[tail].key.clone();
                inner.map.remove(&old_key);
                inner.free.push(tail);
            }
        }

        let idx = match inner.free.pop() {
            Some(idx) => {
                inner.slots[idx].key = key.clone();
                inner.slots[idx].value = value;
                idx
            }
            None => {
                inner.slots.push(Slot {
                    key: key.clone(),
                    value,
                    prev: None,
                    next: None,
                });
                inner.slots.len() - 1
            }
        };
        inner.attach_front(idx);
        inner.map.insert(key, idx);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.map.clear();
        inner.slots.clear();
        inner.free.clear();
        inner.head = None;
        inner.tail = None;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Inner<K, V> {
    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn attach_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let cache: LruCache<String, u32> = LruCache::new(4);
        assert_eq!(cache.get(&"a".to_string()), None);
        cache.put("a".into(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn capacity_obeyed_exactly() {
        let cache: LruCache<u32, u32> = LruCache::new(3);
        for i in 0..10 {
            cache.put(i, i);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&9), Some(9));
        assert_eq!(cache.get(&0), None);
    }

    #[test]
    fn evicts_least_recently_promoted() {
        let cache: LruCache<u32, u32> = LruCache::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.get(&1); // 2 is now the LRU
        cache.put(3, 3);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn replace_promotes() {
        let cache: LruCache<u32, u32> = LruCache::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(1, 10); // replaces and promotes; 2 is the LRU
        cache.put(3, 3);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn clear_empties() {
        let cache: LruCache<u32, u32> = LruCache::new(2);
        cache.put(1, 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn reuses_slots_after_eviction() {
        let cache: LruCache<u32, u32> = LruCache::new(2);
        for i in 0..100 {
            cache.put(i, i);
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&99), Some(99));
        assert_eq!(cache.get(&98), Some(98));
    }
}
