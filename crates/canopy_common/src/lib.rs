//! Shared foundational types for the canopy attribute engine.
//!
//! This crate provides the opaque object handles the engine caches against,
//! the dynamic value model carried through calls and caches, and the
//! deterministic structural hashing used to build cache keys.

#![warn(missing_docs)]

pub mod hash;
pub mod object;
pub mod value;

pub use hash::{combine, hash_call, hash_value, EMPTY_FOLD_HASH, MIX_CONSTANT};
pub use object::{ObjectHandle, ObjectId, WeakObject};
pub use value::Value;
