//! A hash map safe under concurrent readers and writers.
//!
//! Unlike sharded designs, the whole container sits behind a single
//! reader/writer lock: mutators take the exclusive side, read-only
//! operations the shared side. That makes cross-entry operations
//! (`pair_begin`, `range`, `swap`, `merge`) atomic with respect to every
//! other access, which the instance pool relies on.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hash;
use std::ptr;

use parking_lot::RwLock;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::{MapError, Result};

/// A thread-safe mapping with whole-container lock semantics.
///
/// All methods take `&self`; the lock lives inside. Values are cloned out
/// on read so no reference into the protected storage ever escapes.
pub struct ConcurrentMap<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty map with room for at least `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Insert a key-value pair only if the key is absent.
    ///
    /// Returns whether the pair was inserted. Never overwrites.
    pub fn insert(&self, key: K, value: V) -> bool {
        match self.inner.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Insert a key-value pair, overwriting any existing value.
    pub fn store(&self, key: K, value: V) {
        self.inner.write().insert(key, value);
    }

    /// Look up a key, cloning the value out.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotFound`] if the key is absent.
    pub fn at(&self, key: &K) -> Result<V> {
        self.inner.read().get(key).cloned().ok_or(MapError::NotFound)
    }

    /// Look up a key, returning the default value if absent.
    ///
    /// Purely a read; never inserts the default into the map.
    #[must_use]
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.inner.read().get(key).cloned().unwrap_or_default()
    }

    /// Remove a key. No-op if the key is absent.
    pub fn erase(&self, key: &K) {
        self.inner.write().remove(key);
    }

    /// Atomically remove a key, returning its value if it was present.
    pub fn take(&self, key: &K) -> Option<V> {
        self.inner.write().remove(key)
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Number of entries with the given key (0 or 1).
    #[must_use]
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains(key))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Reserve room for at least `additional` more entries.
    pub fn reserve(&self, additional: usize) {
        self.inner.write().reserve(additional);
    }

    /// Snapshot of all keys. Independent of the live map.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys().cloned().collect()
    }

    /// Snapshot of all values. Independent of the live map.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.inner.read().values().cloned().collect()
    }

    /// Consistent copy of the whole map.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.inner.read().clone()
    }

    /// Atomically remove and return an arbitrary entry, or `None` when the
    /// map is empty.
    ///
    /// Which entry comes out is the first in iteration order and otherwise
    /// unspecified. Looping on `pair_begin` drains the map, which is how
    /// the instance pool consumes its available set.
    pub fn pair_begin(&self) -> Option<(K, V)> {
        let mut map = self.inner.write();
        let key = map.keys().next().cloned()?;
        let value = map.remove(&key)?;
        Some((key, value))
    }

    /// Apply `f` to every pair with data-parallel fan-out.
    ///
    /// The exclusive lock is held for the whole call, so `f` observes a
    /// frozen map and never races with outside mutation. `f` itself runs
    /// from multiple worker threads concurrently.
    pub fn range<F>(&self, f: F)
    where
        K: Send + Sync,
        V: Send + Sync,
        F: Fn(&K, &V) + Send + Sync,
    {
        let map = self.inner.write();
        map.par_iter().for_each(|(k, v)| f(k, v));
    }

    /// Apply `f` to every pair strictly sequentially under one lock.
    pub fn range_s<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        let map = self.inner.write();
        for (k, v) in map.iter() {
            f(k, v);
        }
    }

    /// Replace this map's contents with a copy of `other`'s.
    pub fn copy_from(&self, other: &Self) {
        if ptr::eq(self, other) {
            return;
        }
        // Lock order by allocation address; see lock_order_note below.
        if Self::locks_first(self, other) {
            let mut dst = self.inner.write();
            let src = other.inner.read();
            *dst = src.clone();
        } else {
            let src = other.inner.read();
            let mut dst = self.inner.write();
            *dst = src.clone();
        }
    }

    /// Replace this map's contents with `other`.
    pub fn copy_from_map(&self, other: HashMap<K, V>) {
        *self.inner.write() = other;
    }

    /// Exchange the contents of the two maps.
    pub fn swap(&self, other: &Self) {
        if ptr::eq(self, other) {
            return;
        }
        let (first, second) = Self::ordered(self, other);
        let mut a = first.inner.write();
        let mut b = second.inner.write();
        std::mem::swap(&mut *a, &mut *b);
    }

    /// Move `other`'s entries into this map.
    ///
    /// Insert semantics on key collision: the existing entry wins and the
    /// colliding entry stays behind in `other`.
    pub fn merge(&self, other: &Self) {
        if ptr::eq(self, other) {
            return;
        }
        let (first, second) = Self::ordered(self, other);
        let mut a = first.inner.write();
        let mut b = second.inner.write();
        let (dst, src) = if ptr::eq(first, self) {
            (&mut *a, &mut *b)
        } else {
            (&mut *b, &mut *a)
        };
        let keys: Vec<K> = src.keys().cloned().collect();
        for key in keys {
            if !dst.contains_key(&key) {
                if let Some(value) = src.remove(&key) {
                    dst.insert(key, value);
                }
            }
        }
    }

    // lock_order_note: every operation touching two maps takes both locks
    // in ascending allocation-address order. Any fixed global order
    // prevents deadlock; address order additionally keeps concurrent
    // a.copy_from(b) / b.copy_from(a) pairs safe. Self-operations are
    // short-circuited before any lock is taken twice.
    fn locks_first(a: &Self, b: &Self) -> bool {
        (a as *const Self as usize) < (b as *const Self as usize)
    }

    fn ordered<'a>(a: &'a Self, b: &'a Self) -> (&'a Self, &'a Self) {
        if Self::locks_first(a, b) { (a, b) } else { (b, a) }
    }
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Deep copy from a consistent snapshot of the source.
    fn clone(&self) -> Self {
        Self {
            inner: RwLock::new(self.inner.read().clone()),
        }
    }
}

impl<K, V> PartialEq for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    /// Deep value equality, not identity.
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        let (first, second) = Self::ordered(self, other);
        let a = first.inner.read();
        let b = second.inner.read();
        *a == *b
    }
}

impl<K, V> Eq for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Eq,
{
}

impl<K, V> fmt::Debug for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.read().iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: RwLock::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_never_overwrites() {
        let map = ConcurrentMap::new();
        assert!(map.insert("k", 1));
        assert!(!map.insert("k", 2));
        assert_eq!(map.at(&"k"), Ok(1));
    }

    #[test]
    fn store_always_overwrites() {
        let map = ConcurrentMap::new();
        map.store("k", 1);
        map.store("k", 2);
        assert_eq!(map.at(&"k"), Ok(2));
    }

    #[test]
    fn at_reports_missing_keys() {
        let map: ConcurrentMap<&str, i32> = ConcurrentMap::new();
        assert_eq!(map.at(&"missing"), Err(MapError::NotFound));
    }

    #[test]
    fn get_or_default_does_not_insert() {
        let map: ConcurrentMap<&str, i32> = ConcurrentMap::new();
        assert_eq!(map.get_or_default(&"k"), 0);
        assert!(map.is_empty());
    }

    #[test]
    fn erase_is_idempotent() {
        let map = ConcurrentMap::new();
        map.store("k", 1);
        map.erase(&"k");
        map.erase(&"k");
        assert!(!map.contains(&"k"));
    }

    #[test]
    fn take_returns_the_value_exactly_once() {
        let map = ConcurrentMap::new();
        map.store("k", 1);
        assert_eq!(map.take(&"k"), Some(1));
        assert_eq!(map.take(&"k"), None);
    }

    #[test]
    fn pair_begin_drains_the_map() {
        let map = ConcurrentMap::new();
        for i in 0..8 {
            map.store(i, i * 10);
        }
        let mut seen = Vec::new();
        while let Some((k, v)) = map.pair_begin() {
            assert_eq!(v, k * 10);
            seen.push(k);
        }
        assert_eq!(seen.len(), 8);
        assert!(map.is_empty());
        assert_eq!(map.pair_begin(), None);
    }

    #[test]
    fn merge_keeps_existing_on_collision() {
        let a = ConcurrentMap::new();
        let b = ConcurrentMap::new();
        a.store("shared", 1);
        b.store("shared", 99);
        b.store("only_b", 2);
        a.merge(&b);
        assert_eq!(a.at(&"shared"), Ok(1));
        assert_eq!(a.at(&"only_b"), Ok(2));
        // Colliding entry stays behind in the source.
        assert_eq!(b.at(&"shared"), Ok(99));
        assert!(!b.contains(&"only_b"));
    }

    #[test]
    fn swap_exchanges_contents() {
        let a = ConcurrentMap::new();
        let b = ConcurrentMap::new();
        a.store("a", 1);
        b.store("b", 2);
        a.swap(&b);
        assert_eq!(a.at(&"b"), Ok(2));
        assert_eq!(b.at(&"a"), Ok(1));
        assert!(!a.contains(&"a"));
    }

    #[test]
    fn self_operations_short_circuit() {
        let map = ConcurrentMap::new();
        map.store("k", 1);
        map.swap(&map);
        map.merge(&map);
        map.copy_from(&map);
        assert_eq!(map.at(&"k"), Ok(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn equality_is_by_value() {
        let a = ConcurrentMap::new();
        let b = ConcurrentMap::new();
        a.store("k", 1);
        b.store("k", 1);
        assert_eq!(a, b);
        b.store("k", 2);
        assert_ne!(a, b);
    }

    #[test]
    fn snapshots_do_not_alias() {
        let map = ConcurrentMap::new();
        map.store("k", 1);
        let keys = map.keys();
        let snap = map.snapshot();
        map.store("k2", 2);
        assert_eq!(keys.len(), 1);
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn range_s_sees_every_pair() {
        let map = ConcurrentMap::new();
        for i in 0..16 {
            map.store(i, 1u64);
        }
        let mut total = 0u64;
        map.range_s(|_, v| total += v);
        assert_eq!(total, 16);
    }
}
