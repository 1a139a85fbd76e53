//! Canonical entity collections with lazily populated secondary indices.
//!
//! An [`IndexedCache`] keeps one ordered canonical list of an entity family,
//! an optional "current" selection, and buckets of the same entities keyed by
//! a parent value (genre, movie, theater, screening). Buckets only exist once
//! they have been populated by [`IndexedCache::replace_index`]; mutations keep
//! the populated buckets in step with the canonical list but never create new
//! ones.

use std::{collections::HashMap, fmt::Debug, hash::Hash};

/// An entity that can live in an [`IndexedCache`].
pub trait CacheEntity: Clone {
    type Id: Copy + Eq + Hash + Debug;
    type IndexKey: Clone + Eq + Hash + Debug;

    /// When true, an update whose key moved is taken out of buckets for keys
    /// it no longer has and, if it is in the canonical list, appended to
    /// populated buckets for its new keys. Otherwise stale buckets keep the
    /// old copy.
    const RECONCILE_ON_KEY_CHANGE: bool = false;

    fn id(&self) -> Self::Id;

    /// Bucket keys this entity currently belongs to, one per index dimension
    /// that has a value.
    fn index_keys(&self) -> Vec<Self::IndexKey>;
}

#[derive(Debug, Clone)]
pub struct IndexedCache<T: CacheEntity> {
    items: Vec<T>,
    current: Option<T>,
    buckets: HashMap<T::IndexKey, Vec<T>>,
}

impl<T: CacheEntity> Default for IndexedCache<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current: None,
            buckets: HashMap::new(),
        }
    }
}

impl<T: CacheEntity> IndexedCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Entities under `key`, empty when the bucket was never populated.
    pub fn bucket(&self, key: &T::IndexKey) -> &[T] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_bucket(&self, key: &T::IndexKey) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&T::IndexKey, &[T])> {
        self.buckets
            .iter()
            .map(|(key, items)| (key, items.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn replace_current(&mut self, item: Option<T>) {
        self.current = item;
    }

    pub fn replace_index(&mut self, key: T::IndexKey, items: Vec<T>) {
        self.buckets.insert(key, items);
    }

    /// Appends a newly created entity to the canonical list and to every
    /// already populated bucket it belongs to.
    pub fn insert(&mut self, item: T) {
        for key in item.index_keys() {
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.push(item.clone());
            }
        }
        self.items.push(item);
    }

    /// Swaps in an updated entity wherever its id already appears, keeping
    /// positions. Returns whether the canonical list held the entity.
    pub fn replace(&mut self, item: T) -> bool {
        let id = item.id();
        let found = replace_in(&mut self.items, &item);

        if self.current.as_ref().is_some_and(|current| current.id() == id) {
            self.current = Some(item.clone());
        }

        let keys = item.index_keys();
        if T::RECONCILE_ON_KEY_CHANGE && !keys.is_empty() {
            for (key, bucket) in self.buckets.iter_mut() {
                if keys.contains(key) {
                    replace_in(bucket, &item);
                } else {
                    bucket.retain(|existing| existing.id() != id);
                }
            }
            // Only canonical members may join a bucket they were not in.
            if found {
                for key in &keys {
                    if let Some(bucket) = self.buckets.get_mut(key) {
                        if !bucket.iter().any(|existing| existing.id() == id) {
                            bucket.push(item.clone());
                        }
                    }
                }
            }
        } else {
            for key in &keys {
                if let Some(bucket) = self.buckets.get_mut(key) {
                    replace_in(bucket, &item);
                }
            }
        }

        found
    }

    /// Drops the entity from the canonical list, the current slot and every
    /// bucket. Returns the canonical copy if there was one.
    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        let removed = self
            .items
            .iter()
            .position(|item| item.id() == id)
            .map(|index| self.items.remove(index));

        if self.current.as_ref().is_some_and(|current| current.id() == id) {
            self.current = None;
        }

        for bucket in self.buckets.values_mut() {
            bucket.retain(|item| item.id() != id);
        }

        removed
    }
}

fn replace_in<T: CacheEntity>(items: &mut [T], item: &T) -> bool {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(slot) => {
            *slot = item.clone();
            true
        }
        None => false,
    }
}

/// Per-parent data owned by an entity (seat maps, tickets, payments) that is
/// dropped together with that entity.
#[derive(Debug, Clone)]
pub struct DependentMap<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for DependentMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> DependentMap<K, V> {
    pub fn replace(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
