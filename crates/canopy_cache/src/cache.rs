//! The per-object attribute cache.
//!
//! Three stores live under each object: plain attributes (named values,
//! including concept role links), memoized call results bucketed by provider
//! name and argument hash, and a tag set. They are separate fields of the
//! per-object record, so an attribute can never collide with the result
//! bucket of a provider that happens to share its name.

use std::collections::{HashMap, HashSet};

use canopy_common::{ObjectHandle, Value};

use crate::store::WeakIdentityStore;

/// Everything cached for one object.
#[derive(Default)]
pub(crate) struct ObjectData {
    /// Plain named attributes, set directly or recorded by concept linking.
    attributes: HashMap<String, Value>,
    /// Memoized call results: provider name, then argument hash.
    results: HashMap<String, HashMap<u64, Value>>,
    /// Arbitrary labels attached to the object.
    tags: HashSet<String>,
}

/// Identity-keyed attribute cache with weak lifetime ties.
///
/// All operations take the per-object lock briefly and release it before
/// returning; values are cloned out. Concurrent writers for the same
/// object/attribute/arguments triple are idempotent (they would store the
/// same value), so recomputation happens outside the lock and duplicate work
/// under a race is accepted, never corruption.
pub struct AttributeCache {
    store: WeakIdentityStore<ObjectData>,
}

impl AttributeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            store: WeakIdentityStore::new(),
        }
    }

    /// Returns the cached attribute `name` of `object`, if present.
    pub fn get_attribute(&self, object: &ObjectHandle, name: &str) -> Option<Value> {
        let data = self.store.get(object)?;
        let data = data.lock().unwrap();
        data.attributes.get(name).cloned()
    }

    /// Stores attribute `name` of `object`.
    pub fn set_attribute(&self, object: &ObjectHandle, name: &str, value: Value) {
        let data = self.store.get_or_create(object);
        let mut data = data.lock().unwrap();
        data.attributes.insert(name.to_string(), value);
    }

    /// Lists the cached attribute names of `object`, sorted.
    pub fn list_attributes(&self, object: &ObjectHandle) -> Vec<String> {
        let Some(data) = self.store.get(object) else {
            return Vec::new();
        };
        let data = data.lock().unwrap();
        let mut names: Vec<String> = data.attributes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Clears one attribute of `object`, along with the result bucket of the
    /// same name.
    pub fn clear_attribute(&self, object: &ObjectHandle, name: &str) {
        if let Some(data) = self.store.get(object) {
            let mut data = data.lock().unwrap();
            data.attributes.remove(name);
            data.results.remove(name);
        }
    }

    /// Evicts everything cached for `object`.
    pub fn clear_attributes(&self, object: &ObjectHandle) {
        self.store.remove(object);
    }

    /// Evicts everything for every object.
    pub fn clear_all(&self) {
        self.store.clear_all();
    }

    /// Returns the number of objects with a live cache entry.
    pub fn object_count(&self) -> usize {
        self.store.len()
    }

    /// Returns the memoized result of `attribute` on `object` for the given
    /// argument hash.
    pub fn cached_result(&self, object: &ObjectHandle, attribute: &str, hash: u64) -> Option<Value> {
        let data = self.store.get(object)?;
        let data = data.lock().unwrap();
        data.results.get(attribute)?.get(&hash).cloned()
    }

    /// Memoizes the result of `attribute` on `object` under the given
    /// argument hash, overwriting any previous value.
    pub fn store_result(&self, object: &ObjectHandle, attribute: &str, hash: u64, value: Value) {
        let data = self.store.get_or_create(object);
        let mut data = data.lock().unwrap();
        data.results
            .entry(attribute.to_string())
            .or_default()
            .insert(hash, value);
    }

    /// Returns a snapshot of the tags attached to `object`.
    pub fn tags(&self, object: &ObjectHandle) -> HashSet<String> {
        match self.store.get(object) {
            Some(data) => data.lock().unwrap().tags.clone(),
            None => HashSet::new(),
        }
    }

    /// Attaches a tag to `object`.
    pub fn add_tag(&self, object: &ObjectHandle, tag: &str) {
        let data = self.store.get_or_create(object);
        let mut data = data.lock().unwrap();
        data.tags.insert(tag.to_string());
    }

    /// Removes a tag from `object`. Returns `true` if it was present.
    pub fn remove_tag(&self, object: &ObjectHandle, tag: &str) -> bool {
        match self.store.get(object) {
            Some(data) => data.lock().unwrap().tags.remove(tag),
            None => false,
        }
    }

    /// Returns `true` if `object` carries the tag.
    pub fn has_tag(&self, object: &ObjectHandle, tag: &str) -> bool {
        match self.store.get(object) {
            Some(data) => data.lock().unwrap().tags.contains(tag),
            None => false,
        }
    }
}

impl Default for AttributeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_attribute() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());

        assert!(cache.get_attribute(&obj, "area").is_none());
        cache.set_attribute(&obj, "area", Value::Float(2.5));
        assert_eq!(cache.get_attribute(&obj, "area"), Some(Value::Float(2.5)));
    }

    #[test]
    fn attributes_are_per_object() {
        let cache = AttributeCache::new();
        let a = ObjectHandle::new(());
        let b = ObjectHandle::new(());

        cache.set_attribute(&a, "area", Value::Int(1));
        assert!(cache.get_attribute(&b, "area").is_none());
    }

    #[test]
    fn list_attributes_sorted() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());
        cache.set_attribute(&obj, "volume", Value::Int(1));
        cache.set_attribute(&obj, "area", Value::Int(2));

        assert_eq!(cache.list_attributes(&obj), vec!["area", "volume"]);
        assert!(cache.list_attributes(&ObjectHandle::new(())).is_empty());
    }

    #[test]
    fn clear_attribute_drops_value_and_result_bucket() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());
        cache.set_attribute(&obj, "area", Value::Int(1));
        cache.store_result(&obj, "area", 42, Value::Int(1));
        cache.set_attribute(&obj, "volume", Value::Int(3));

        cache.clear_attribute(&obj, "area");
        assert!(cache.get_attribute(&obj, "area").is_none());
        assert!(cache.cached_result(&obj, "area", 42).is_none());
        assert_eq!(cache.get_attribute(&obj, "volume"), Some(Value::Int(3)));
    }

    #[test]
    fn clear_attributes_evicts_the_object() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());
        cache.set_attribute(&obj, "area", Value::Int(1));
        cache.add_tag(&obj, "dirty");

        cache.clear_attributes(&obj);
        assert!(cache.get_attribute(&obj, "area").is_none());
        assert!(!cache.has_tag(&obj, "dirty"));
        assert_eq!(cache.object_count(), 0);
    }

    #[test]
    fn result_buckets_keyed_by_hash() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());

        cache.store_result(&obj, "area", 1, Value::Int(10));
        cache.store_result(&obj, "area", 2, Value::Int(20));

        assert_eq!(cache.cached_result(&obj, "area", 1), Some(Value::Int(10)));
        assert_eq!(cache.cached_result(&obj, "area", 2), Some(Value::Int(20)));
        assert!(cache.cached_result(&obj, "area", 3).is_none());
        assert!(cache.cached_result(&obj, "volume", 1).is_none());
    }

    #[test]
    fn store_result_overwrites() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());
        cache.store_result(&obj, "area", 1, Value::Int(10));
        cache.store_result(&obj, "area", 1, Value::Int(11));
        assert_eq!(cache.cached_result(&obj, "area", 1), Some(Value::Int(11)));
    }

    #[test]
    fn attribute_and_result_namespaces_do_not_collide() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());

        cache.set_attribute(&obj, "area", Value::Int(1));
        cache.store_result(&obj, "area", 7, Value::Int(2));

        assert_eq!(cache.get_attribute(&obj, "area"), Some(Value::Int(1)));
        assert_eq!(cache.cached_result(&obj, "area", 7), Some(Value::Int(2)));
    }

    #[test]
    fn tag_lifecycle() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());

        assert!(!cache.has_tag(&obj, "validated"));
        cache.add_tag(&obj, "validated");
        cache.add_tag(&obj, "partial");
        assert!(cache.has_tag(&obj, "validated"));
        assert_eq!(cache.tags(&obj).len(), 2);

        assert!(cache.remove_tag(&obj, "partial"));
        assert!(!cache.remove_tag(&obj, "partial"));
        assert!(!cache.has_tag(&obj, "partial"));
    }

    #[test]
    fn entries_die_with_their_object() {
        let cache = AttributeCache::new();
        let keep = ObjectHandle::new(());
        cache.set_attribute(&keep, "area", Value::Int(1));

        {
            let short_lived = ObjectHandle::new(());
            cache.set_attribute(&short_lived, "area", Value::Int(2));
            assert_eq!(cache.object_count(), 2);
        }

        assert_eq!(cache.object_count(), 1);
        assert_eq!(cache.get_attribute(&keep, "area"), Some(Value::Int(1)));
    }

    #[test]
    fn clear_all() {
        let cache = AttributeCache::new();
        let obj = ObjectHandle::new(());
        cache.set_attribute(&obj, "area", Value::Int(1));
        cache.clear_all();
        assert_eq!(cache.object_count(), 0);
        assert!(cache.get_attribute(&obj, "area").is_none());
    }
}
