//! The memoizing wrapper ("auto cache").
//!
//! Wraps an attribute function so that repeated calls with equal arguments
//! on the same owning object return the stored result. The owning object is
//! the value of the first declared parameter; the cache key is the
//! structural hash of the canonicalized argument set.

use std::fmt;
use std::sync::Arc;

use canopy_common::{hash_call, Value};

use crate::call::{canonicalize, CallArgs};
use crate::context::Context;
use crate::error::{EngineError, ShapeError};
use crate::function::AttributeFn;
use crate::signature::Signature;

/// Memoizing wrapper around an [`AttributeFn`].
///
/// Reserved control parameters honored per call: `attribute_name` (cache
/// bucket override), `force_recompute`, `no_cache`, and an alternate cache
/// instance. When the owning object is not a cacheable object — a scalar
/// passed where a graph usually goes — the wrapper degrades to a direct
/// call instead of failing.
pub struct Cached {
    inner: Arc<dyn AttributeFn>,
}

impl Cached {
    /// Wraps a function with memoization.
    ///
    /// Refuses to wrap a dependency-resolving function: resolution changes
    /// the effective argument set and therefore the cache key, so it must
    /// run outside the cache, never inside.
    pub fn wrap(inner: Arc<dyn AttributeFn>) -> Result<Arc<Self>, ShapeError> {
        if inner.resolves_dependencies() {
            return Err(ShapeError::CachingInsideResolution {
                function: inner.name().to_string(),
            });
        }
        Ok(Arc::new(Self { inner }))
    }
}

impl fmt::Debug for Cached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cached({})", self.inner.name())
    }
}

impl AttributeFn for Cached {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn signature(&self) -> &Signature {
        self.inner.signature()
    }

    fn call(&self, ctx: &Context, mut args: CallArgs) -> Result<Value, EngineError> {
        args.extract_reserved(self.inner.name())?;
        if args.options().no_cache || !ctx.is_caching_enabled() {
            return self.inner.call(ctx, args);
        }

        let (positional, named, options, cache_override) = args.into_parts();
        let cache = cache_override
            .clone()
            .unwrap_or_else(|| ctx.cache().clone());
        let named = canonicalize(
            self.inner.name(),
            self.inner.signature(),
            positional,
            named,
            true,
        )?;

        let owner = match named.get(self.inner.signature().first_param()) {
            Some(Value::Object(obj)) => obj.clone(),
            // Missing or uncacheable owner: degrade to an uncached call.
            _ => {
                return self
                    .inner
                    .call(ctx, CallArgs::from_parts(named, options, cache_override))
            }
        };

        let attribute = options
            .attribute_name
            .clone()
            .unwrap_or_else(|| self.inner.name().to_string());
        let hash = hash_call(&[], &named);

        if !options.force_recompute {
            if let Some(value) = cache.cached_result(&owner, &attribute, hash) {
                return Ok(value);
            }
        }

        // Computed outside the per-object lock; racing callers may duplicate
        // the work but store the same value.
        let value = self
            .inner
            .call(ctx, CallArgs::from_parts(named, options, cache_override))?;
        cache.store_result(&owner, &attribute, hash, value.clone());
        Ok(value)
    }
}
