//! Per-object attribute caching keyed by identity with weak lifetime ties.
//!
//! This crate provides the storage half of the engine: a weak identity-keyed
//! store whose entries disappear with the objects they describe, and the
//! attribute cache built on top of it (plain attributes, memoized call
//! results, and tag sets).

#![warn(missing_docs)]

pub mod cache;
pub mod store;

pub use cache::AttributeCache;
pub use store::WeakIdentityStore;
