//! The engine context: shared cache, registry, and caching flag.
//!
//! Instead of module-level singletons, all process-wide state lives in one
//! explicit [`Context`] constructed at startup and passed by reference to
//! every entry point. Tests build their own contexts (or call
//! [`Context::reset`]) for isolation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use canopy_cache::AttributeCache;
use canopy_common::{ObjectHandle, Value};

use crate::call::CallArgs;
use crate::function::AttributeFn;
use crate::provider::{Provider, ProviderRegistry};

/// Shared engine state: the attribute cache, the provider registry, and the
/// global caching flag.
///
/// The flag bypasses caching entirely without clearing anything, so caching
/// can be switched off and back on around a measurement or a test.
pub struct Context {
    cache: Arc<AttributeCache>,
    providers: ProviderRegistry,
    caching_enabled: AtomicBool,
}

impl Context {
    /// Creates a fresh context with caching enabled.
    pub fn new() -> Self {
        Self {
            cache: Arc::new(AttributeCache::new()),
            providers: ProviderRegistry::new(),
            caching_enabled: AtomicBool::new(true),
        }
    }

    /// The shared attribute cache.
    pub fn cache(&self) -> &Arc<AttributeCache> {
        &self.cache
    }

    /// The provider registry.
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Returns `true` while result caching is globally enabled.
    pub fn is_caching_enabled(&self) -> bool {
        self.caching_enabled.load(Ordering::Relaxed)
    }

    /// Globally enables or disables result caching.
    ///
    /// Disabling does not clear the cache; previously stored values become
    /// visible again when caching is re-enabled.
    pub fn set_caching_enabled(&self, enabled: bool) {
        self.caching_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Restores the context to its initial state: empty cache, empty
    /// registry, caching enabled. Intended for test isolation.
    pub fn reset(&self) {
        self.cache.clear_all();
        self.providers.clear();
        self.set_caching_enabled(true);
    }

    /// Registers a provider under `name`. Duplicate names warn and
    /// overwrite.
    pub fn register_provider(
        &self,
        name: &str,
        description: &str,
        func: impl Fn(&Context, &ObjectHandle) -> Result<Value, crate::error::EngineError>
            + Send
            + Sync
            + 'static,
    ) {
        self.providers.register(name, description, func);
    }

    /// Registers a wrapped attribute function as the provider for its own
    /// name.
    ///
    /// The provider invokes the function with the object as its only
    /// argument; remaining parameters come from defaults or the function's
    /// own dependency resolution.
    pub fn register_function(&self, function: Arc<dyn AttributeFn>, description: &str) {
        let name = function.name().to_string();
        self.providers.register(&name, description, move |ctx, object| {
            function.call(ctx, CallArgs::new().arg(object))
        });
    }

    /// Looks up a provider by name.
    pub fn provider(&self, name: &str) -> Option<Provider> {
        self.providers.lookup(name)
    }

    // Delegating accessors so consumer code can go through the context
    // without reaching into the cache.

    /// Returns the cached attribute `name` of `object`, if present.
    pub fn get_attribute(&self, object: &ObjectHandle, name: &str) -> Option<Value> {
        self.cache.get_attribute(object, name)
    }

    /// Stores attribute `name` of `object`.
    pub fn set_attribute(&self, object: &ObjectHandle, name: &str, value: Value) {
        self.cache.set_attribute(object, name, value);
    }

    /// Lists the cached attribute names of `object`, sorted.
    pub fn list_attributes(&self, object: &ObjectHandle) -> Vec<String> {
        self.cache.list_attributes(object)
    }

    /// Clears one attribute of `object`.
    pub fn clear_attribute(&self, object: &ObjectHandle, name: &str) {
        self.cache.clear_attribute(object, name);
    }

    /// Evicts everything cached for `object`.
    pub fn clear_attributes(&self, object: &ObjectHandle) {
        self.cache.clear_attributes(object);
    }

    /// Evicts everything for every object.
    pub fn clear_all_attributes(&self) {
        self.cache.clear_all();
    }

    /// Attaches a tag to `object`.
    pub fn add_tag(&self, object: &ObjectHandle, tag: &str) {
        self.cache.add_tag(object, tag);
    }

    /// Removes a tag from `object`. Returns `true` if it was present.
    pub fn remove_tag(&self, object: &ObjectHandle, tag: &str) -> bool {
        self.cache.remove_tag(object, tag)
    }

    /// Returns `true` if `object` carries the tag.
    pub fn has_tag(&self, object: &ObjectHandle, tag: &str) -> bool {
        self.cache.has_tag(object, tag)
    }

    /// Returns a snapshot of the tags attached to `object`.
    pub fn tags(&self, object: &ObjectHandle) -> HashSet<String> {
        self.cache.tags(object)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
