//! The attribute-function abstraction and its plain implementation.
//!
//! Both wrappers and plain functions implement [`AttributeFn`], so wrapping
//! composes: a raw function is wrapped by [`Cached`](crate::cached::Cached)
//! and the result by [`Resolver`](crate::resolver::Resolver). The trait
//! carries the declared signature through the wrapper stack, so every layer
//! sees the innermost function's parameters.

use std::sync::Arc;

use canopy_common::Value;

use crate::call::{canonicalize, CallArgs, ResolvedArgs};
use crate::context::Context;
use crate::error::EngineError;
use crate::signature::Signature;

/// A callable attribute computation with a declared signature.
pub trait AttributeFn: Send + Sync {
    /// The function's name, used as the default cache bucket.
    fn name(&self) -> &str;

    /// The declared parameter list.
    fn signature(&self) -> &Signature;

    /// Invokes the function with the given call arguments.
    fn call(&self, ctx: &Context, args: CallArgs) -> Result<Value, EngineError>;

    /// `true` for wrappers that fill in missing arguments.
    ///
    /// The caching wrapper refuses to wrap such a function: resolution
    /// changes the effective argument set and must run outside the cache.
    fn resolves_dependencies(&self) -> bool {
        false
    }
}

/// A plain computation function with a declared signature.
///
/// The closure receives the canonicalized, fully named argument set. Its own
/// errors propagate unchanged through the wrapper stack.
pub struct RawFn {
    name: String,
    signature: Signature,
    #[allow(clippy::type_complexity)]
    func: Box<dyn Fn(&Context, &ResolvedArgs) -> Result<Value, EngineError> + Send + Sync>,
}

impl RawFn {
    /// Declares a computation function.
    ///
    /// The signature must already be validated by [`Signature::new`].
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(&Context, &ResolvedArgs) -> Result<Value, EngineError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            func: Box::new(func),
        }
    }

    /// Declares a computation function behind a shared pointer, ready for
    /// wrapping.
    pub fn shared(
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(&Context, &ResolvedArgs) -> Result<Value, EngineError> + Send + Sync + 'static,
    ) -> Arc<dyn AttributeFn> {
        Arc::new(Self::new(name, signature, func))
    }
}

impl AttributeFn for RawFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, ctx: &Context, mut args: CallArgs) -> Result<Value, EngineError> {
        args.extract_reserved(&self.name)?;
        let (positional, named, _options, _cache) = args.into_parts();
        let named = canonicalize(&self.name, &self.signature, positional, named, true)?;
        (self.func)(ctx, &ResolvedArgs::new(&self.name, named))
    }
}
