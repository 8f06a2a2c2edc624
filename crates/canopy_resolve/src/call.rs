//! Call-site argument handling and canonicalization.
//!
//! Arguments arrive positionally or by name, together with reserved control
//! parameters that the wrappers consume and never pass through. Before
//! hashing or invoking the wrapped function, a call is canonicalized to a
//! fully named form using the declared parameter order, so equal argument
//! sets are indistinguishable no matter how they were supplied.

use std::collections::BTreeMap;
use std::sync::Arc;

use canopy_cache::AttributeCache;
use canopy_common::{ObjectHandle, Value};

use crate::error::EngineError;
use crate::signature::Signature;

/// Reserved control parameter: cache bucket override.
pub const ATTRIBUTE_NAME: &str = "attribute_name";
/// Reserved control parameter: bypass and overwrite the cache.
pub const FORCE_RECOMPUTE: &str = "force_recompute";
/// Reserved control parameter: neither read nor write the cache.
pub const NO_CACHE: &str = "no_cache";
/// Reserved control parameter: preserve resolution error chains.
pub const DATA_DEBUG: &str = "data_debug";

/// All reserved call-site parameter names consumed by the wrappers.
pub const RESERVED_PARAMETERS: [&str; 4] = [ATTRIBUTE_NAME, FORCE_RECOMPUTE, NO_CACHE, DATA_DEBUG];

/// Control options stripped from a call before canonicalization.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Cache bucket to use instead of the function's own name. Lets several
    /// distinct cached computations share one implementation.
    pub attribute_name: Option<String>,
    /// Recompute and overwrite even when a cached value exists.
    pub force_recompute: bool,
    /// Bypass the cache entirely for this call.
    pub no_cache: bool,
    /// Keep the full causal chain in resolution errors.
    pub debug: bool,
}

/// The arguments of one invocation of a wrapped function.
///
/// Built fluently at the call site. Reserved control names supplied through
/// [`named`](Self::named) are recognized and stripped into [`CallOptions`]
/// before the remaining arguments are canonicalized; an alternate cache
/// instance travels as a typed field, since a cache is not a [`Value`].
#[derive(Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
    options: CallOptions,
    cache_override: Option<Arc<AttributeCache>>,
}

impl CallArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Supplies an argument by name.
    ///
    /// Reserved control names are accepted here and extracted into the
    /// options by the wrappers before canonicalization.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Overrides the cache bucket name for this call.
    pub fn attribute_name(mut self, name: impl Into<String>) -> Self {
        self.options.attribute_name = Some(name.into());
        self
    }

    /// Recomputes and overwrites even when a cached value exists.
    pub fn force_recompute(mut self, yes: bool) -> Self {
        self.options.force_recompute = yes;
        self
    }

    /// Bypasses the cache entirely for this call.
    pub fn no_cache(mut self, yes: bool) -> Self {
        self.options.no_cache = yes;
        self
    }

    /// Keeps the full causal chain in resolution errors.
    pub fn debug(mut self, yes: bool) -> Self {
        self.options.debug = yes;
        self
    }

    /// Uses an alternate cache instance for this call.
    pub fn with_cache(mut self, cache: Arc<AttributeCache>) -> Self {
        self.cache_override = Some(cache);
        self
    }

    /// The control options accumulated so far.
    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    /// The alternate cache instance, if one was supplied.
    pub fn cache_override(&self) -> Option<&Arc<AttributeCache>> {
        self.cache_override.as_ref()
    }

    /// Moves reserved control names out of the named arguments into the
    /// options. Idempotent; flags combine with builder-set values.
    pub(crate) fn extract_reserved(&mut self, function: &str) -> Result<(), EngineError> {
        if let Some(value) = self.named.remove(ATTRIBUTE_NAME) {
            match value {
                Value::Str(name) => self.options.attribute_name = Some(name),
                _ => {
                    return Err(EngineError::MalformedReservedParameter {
                        function: function.to_string(),
                        parameter: ATTRIBUTE_NAME.to_string(),
                    })
                }
            }
        }
        for (name, flag) in [
            (FORCE_RECOMPUTE, &mut self.options.force_recompute),
            (NO_CACHE, &mut self.options.no_cache),
            (DATA_DEBUG, &mut self.options.debug),
        ] {
            if let Some(value) = self.named.remove(name) {
                match value {
                    Value::Bool(b) => *flag = *flag || b,
                    _ => {
                        return Err(EngineError::MalformedReservedParameter {
                            function: function.to_string(),
                            parameter: name.to_string(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Decomposes the call for canonicalization.
    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<Value>,
        BTreeMap<String, Value>,
        CallOptions,
        Option<Arc<AttributeCache>>,
    ) {
        (self.positional, self.named, self.options, self.cache_override)
    }

    /// Rebuilds a call from already-canonicalized named arguments.
    pub(crate) fn from_parts(
        named: BTreeMap<String, Value>,
        options: CallOptions,
        cache_override: Option<Arc<AttributeCache>>,
    ) -> Self {
        Self {
            positional: Vec::new(),
            named,
            options,
            cache_override,
        }
    }
}

/// Canonicalizes a call to fully named form.
///
/// Positional arguments bind to declared parameters in order; declared
/// defaults fill remaining parameters when `fill_defaults` is set (the
/// resolver canonicalizes without defaults so it can tell which parameters
/// still need resolution).
pub(crate) fn canonicalize(
    function: &str,
    signature: &Signature,
    positional: Vec<Value>,
    mut named: BTreeMap<String, Value>,
    fill_defaults: bool,
) -> Result<BTreeMap<String, Value>, EngineError> {
    let params = signature.params();
    if positional.len() > params.len() {
        return Err(EngineError::TooManyPositional {
            function: function.to_string(),
            expected: params.len(),
            supplied: positional.len(),
        });
    }
    for name in named.keys() {
        if !signature.contains(name) {
            return Err(EngineError::UnknownParameter {
                function: function.to_string(),
                parameter: name.clone(),
            });
        }
    }
    for (value, param) in positional.into_iter().zip(params) {
        if named.contains_key(&param.name) {
            return Err(EngineError::DuplicateArgument {
                function: function.to_string(),
                parameter: param.name.clone(),
            });
        }
        named.insert(param.name.clone(), value);
    }
    if fill_defaults {
        for param in params {
            if let Some(default) = &param.default {
                named
                    .entry(param.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
    }
    Ok(named)
}

/// The fully materialized argument set handed to a computation function.
pub struct ResolvedArgs {
    function: String,
    named: BTreeMap<String, Value>,
}

impl ResolvedArgs {
    pub(crate) fn new(function: &str, named: BTreeMap<String, Value>) -> Self {
        Self {
            function: function.to_string(),
            named,
        }
    }

    /// Returns the argument `name`, if supplied or resolved.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Returns the argument `name` or a missing-argument error.
    pub fn require(&self, name: &str) -> Result<&Value, EngineError> {
        self.named.get(name).ok_or_else(|| EngineError::MissingArgument {
            function: self.function.clone(),
            parameter: name.to_string(),
        })
    }

    /// Returns the argument `name` as an object handle.
    ///
    /// Fails with a computation error if the value is not an object.
    pub fn require_object(&self, name: &str) -> Result<&ObjectHandle, EngineError> {
        let value = self.require(name)?;
        value.as_object().ok_or_else(|| {
            EngineError::computation(format!(
                "argument '{name}' of '{}' is not an object: {value}",
                self.function
            ))
        })
    }
}
