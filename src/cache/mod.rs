//! Identity-keyed cache.
//!
//! Associates a value with the *runtime identity* of an object (the address
//! of its allocation, see [`Identity`]) instead of its contents. This lets
//! request-scoped data hang off a request without changing the request type
//! or threading a context value through every call.
//!
//! Entries are never expired. Whoever knows an object's lifetime has ended
//! must call [`IdentityCache::delete`]; otherwise the entry outlives the
//! object and a later allocation at the same address would hit it.

mod identity;

pub use identity::Identity;

use dashmap::DashMap;

/// A concurrent map from object identity to a lazily computed value.
pub struct IdentityCache<V> {
    entries: DashMap<usize, V>,
}

impl<V: Clone> IdentityCache<V> {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Returns the value cached for `obj`'s identity, computing and storing
    /// it on first access.
    ///
    /// `compute` runs outside any shard lock, so two first accesses racing on
    /// the same identity may both compute; the later insert wins and each
    /// caller gets its own freshly computed value. When `obj` has no identity
    /// the value is computed every time and never stored.
    pub fn get_or_compute<K, F>(&self, obj: &K, compute: F) -> V
    where
        K: Identity + ?Sized,
        F: FnOnce(&K) -> V,
    {
        let Some(key) = obj.identity() else {
            return compute(obj);
        };

        if let Some(hit) = self.entries.get(&key) {
            return hit.value().clone();
        }

        let value = compute(obj);
        self.entries.insert(key, value.clone());
        value
    }

    /// Drops the entry for `obj`'s identity, if any.
    pub fn delete<K: Identity + ?Sized>(&self, obj: &K) {
        if let Some(key) = obj.identity() {
            self.entries.remove(&key);
        }
    }

    pub fn contains<K: Identity + ?Sized>(&self, obj: &K) -> bool {
        obj.identity().is_some_and(|key| self.entries.contains_key(&key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for IdentityCache<V> {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn computes_once_per_identity() {
        let cache = IdentityCache::new();
        let calls = AtomicUsize::new(0);
        let obj = Arc::new("request");

        let compute = |_: &Arc<&str>| calls.fetch_add(1, Ordering::SeqCst);
        let first = cache.get_or_compute(&obj, compute);
        let second = cache.get_or_compute(&obj, |_| calls.fetch_add(1, Ordering::SeqCst));

        assert_eq!(first, 0);
        assert_eq!(second, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&obj));
    }

    #[test]
    fn delete_forces_recompute() {
        let cache = IdentityCache::new();
        let obj = Arc::new(1_u8);

        assert_eq!(cache.get_or_compute(&obj, |_| "old"), "old");
        cache.delete(&obj);
        assert!(!cache.contains(&obj));
        assert_eq!(cache.get_or_compute(&obj, |_| "new"), "new");
    }

    #[test]
    fn delete_of_unknown_or_value_is_noop() {
        let cache: IdentityCache<u32> = IdentityCache::new();
        cache.delete(&Arc::new(5_u8));
        cache.delete(&5_u8);
        assert!(cache.is_empty());
    }

    #[test]
    fn value_types_always_compute_and_never_store() {
        let cache = IdentityCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache.get_or_compute(&10_u32, |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                n * 2
            });
            assert_eq!(value, 20);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn distinct_objects_with_equal_contents_get_distinct_slots() {
        let cache = IdentityCache::new();
        let a = Arc::new(String::from("GET /"));
        let b = Arc::new(String::from("GET /"));

        cache.get_or_compute(&a, |_| 'a');
        assert_eq!(cache.get_or_compute(&b, |_| 'b'), 'b');
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_first_access_converges() {
        const THREADS: usize = 8;

        let cache = IdentityCache::new();
        let calls = AtomicUsize::new(0);
        let obj = Arc::new(());

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    cache.get_or_compute(&obj, |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        "trace"
                    })
                });
            }
        });

        let computed = calls.load(Ordering::SeqCst);
        assert!((1..=THREADS).contains(&computed));

        // Settled: no further computation until the entry is deleted.
        assert_eq!(cache.get_or_compute(&obj, |_| "other"), "trace");
        assert_eq!(calls.load(Ordering::SeqCst), computed);
        assert_eq!(cache.len(), 1);
    }
}
