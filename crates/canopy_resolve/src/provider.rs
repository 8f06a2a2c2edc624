//! The process-wide registry of named attribute providers.
//!
//! A provider computes a named attribute from an object. Registration is
//! read-mostly: lookups take a read lock, registration a write lock.
//! Re-registering a name is diagnosable but non-fatal — a warning is logged
//! and the latest definition wins, which is what lets tests and interactive
//! sessions redefine attributes freely.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use canopy_common::{ObjectHandle, Value};

use crate::context::Context;
use crate::error::EngineError;

/// The callable type behind a registered provider.
pub type ProviderFn =
    Arc<dyn Fn(&Context, &ObjectHandle) -> Result<Value, EngineError> + Send + Sync>;

/// A named, registered attribute producer.
#[derive(Clone)]
pub struct Provider {
    name: String,
    description: String,
    func: ProviderFn,
}

impl Provider {
    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The human-readable description, possibly empty.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Computes the attribute for `object`.
    pub fn call(&self, ctx: &Context, object: &ObjectHandle) -> Result<Value, EngineError> {
        (self.func)(ctx, object)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.description)
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider({})", self.name)
    }
}

/// Mapping from attribute name to the function that computes it.
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Provider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a provider under `name`.
    ///
    /// A duplicate name logs a warning and overwrites the previous entry.
    pub fn register(
        &self,
        name: &str,
        description: &str,
        func: impl Fn(&Context, &ObjectHandle) -> Result<Value, EngineError> + Send + Sync + 'static,
    ) {
        let mut providers = self.providers.write().unwrap();
        if providers.contains_key(name) {
            log::warn!("a provider named '{name}' was already registered; keeping the latest definition");
        }
        providers.insert(
            name.to_string(),
            Provider {
                name: name.to_string(),
                description: description.to_string(),
                func: Arc::new(func),
            },
        );
    }

    /// Looks up a provider by name.
    pub fn lookup(&self, name: &str) -> Option<Provider> {
        let providers = self.providers.read().unwrap();
        providers.get(name).cloned()
    }

    /// Returns `true` if a provider is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap();
        providers.contains_key(name)
    }

    /// Lists registered providers as `(name, description)` pairs, sorted by
    /// name.
    pub fn list(&self) -> Vec<(String, String)> {
        let providers = self.providers.read().unwrap();
        let mut entries: Vec<(String, String)> = providers
            .values()
            .map(|p| (p.name.clone(), p.description.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Removes every registered provider.
    pub fn clear(&self) {
        let mut providers = self.providers.write().unwrap();
        providers.clear();
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().unwrap().len()
    }

    /// Returns `true` if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
