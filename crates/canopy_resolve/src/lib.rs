//! Dependency resolution and memoization wrappers for attribute functions.
//!
//! This crate is the calling half of the engine: declared signatures with
//! call canonicalization, the provider registry, the concept abstraction for
//! structural object relationships, the caching and dependency-resolving
//! wrappers, and the [`Context`] object that ties the shared state together.
//!
//! An attribute function is wrapped at definition time, caching first and
//! resolution outside, so that the cache key reflects fully resolved
//! arguments:
//!
//! ```
//! use std::sync::Arc;
//! use canopy_common::Value;
//! use canopy_resolve::{
//!     AttributeFn, Cached, CallArgs, Context, Param, RawFn, Resolver, Signature,
//! };
//!
//! let ctx = Context::new();
//! let sig = Signature::new(vec![Param::required("graph")]).unwrap();
//! let raw = Arc::new(RawFn::new("edge_count", sig, |_ctx, args| {
//!     let _graph = args.require_object("graph")?;
//!     Ok(Value::Int(12))
//! }));
//! let edge_count = Resolver::wrap(Cached::wrap(raw).unwrap(), vec![]).unwrap();
//!
//! let g = canopy_common::ObjectHandle::new(());
//! let n = edge_count.call(&ctx, CallArgs::new().arg(&g)).unwrap();
//! assert_eq!(n, Value::Int(12));
//! ```

#![warn(missing_docs)]

pub mod cached;
pub mod call;
pub mod concept;
pub mod context;
pub mod error;
pub mod function;
pub mod provider;
pub mod resolver;
pub mod signature;

pub use cached::Cached;
pub use call::{CallArgs, CallOptions, ResolvedArgs, RESERVED_PARAMETERS};
pub use concept::{Concept, RoleConcept};
pub use context::Context;
pub use error::{EngineError, LookupError, ResolveError, ShapeError};
pub use function::{AttributeFn, RawFn};
pub use provider::{Provider, ProviderRegistry};
pub use resolver::{Dependency, Resolver};
pub use signature::{Param, Signature};
