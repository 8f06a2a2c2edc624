//! Deterministic structural hashing for cache-key construction.
//!
//! Cached results are disambiguated by a hash of the fully resolved call
//! arguments. The rules are chosen so that equal argument sets hash equally
//! regardless of how they were supplied, while remaining cheap to compute:
//!
//! - sequences and sets fold element hashes left to right (order-sensitive;
//!   for sets this is a known limitation kept deliberately);
//! - mappings sum key hashes and value hashes separately before combining,
//!   making them independent of iteration order;
//! - integers hash through their decimal-string form so that the hash of a
//!   small integer is not the integer itself;
//! - floats hash by bit pattern, so the equal values `0.0` and `-0.0` occupy
//!   distinct cache slots (spurious miss, never a wrong hit);
//! - opaque objects hash by identity, making keys reference-sensitive for
//!   such inputs (documented limitation).
//!
//! Collisions are treated as hits, never as misses. The mixing function is
//! believed collision-resistant for real workloads, not cryptographically so.

use std::collections::BTreeMap;

use xxhash_rust::xxh3::xxh3_64;

use crate::value::Value;

/// Golden-ratio-derived odd constant used by the mixing function.
pub const MIX_CONSTANT: u64 = 0x9e37_79b9;

/// Sentinel hash of an empty sequence or set.
pub const EMPTY_FOLD_HASH: u64 = 0x9e37_75b2;

/// Combines two hash values into one.
///
/// `h1 XOR (h2 + K + (h1 << 6) + (h2 >> 2))` with wrapping arithmetic,
/// applied left to right when folding a sequence of hashes.
pub fn combine(h1: u64, h2: u64) -> u64 {
    h1 ^ h2
        .wrapping_add(MIX_CONSTANT)
        .wrapping_add(h1 << 6)
        .wrapping_add(h2 >> 2)
}

/// Computes the structural hash of a single value.
pub fn hash_value(value: &Value) -> u64 {
    match value {
        Value::Unit => xxh3_64(b"()"),
        Value::Bool(b) => xxh3_64(if *b { &[1u8] } else { &[0u8] }),
        // Decimal-string form: for an integer x the natural hash would be x
        // itself, which degenerates badly when mixed.
        Value::Int(i) => xxh3_64(i.to_string().as_bytes()),
        // Bit-pattern hash: 0.0 and -0.0 compare equal but hash apart, a
        // spurious miss, never a wrong hit.
        Value::Float(f) => xxh3_64(&f.to_bits().to_le_bytes()),
        Value::Str(s) => xxh3_64(s.as_bytes()),
        Value::Seq(items) | Value::Set(items) => fold(items),
        Value::Map(pairs) => {
            let keys = pairs
                .iter()
                .fold(0u64, |acc, (k, _)| acc.wrapping_add(hash_value(k)));
            let values = pairs
                .iter()
                .fold(0u64, |acc, (_, v)| acc.wrapping_add(hash_value(v)));
            combine(keys, values)
        }
        Value::Object(obj) => xxh3_64(&obj.id().as_raw().to_le_bytes()),
    }
}

/// Folds element hashes left to right; empty input yields the sentinel.
fn fold(items: &[Value]) -> u64 {
    let mut hashes = items.iter().map(hash_value);
    match hashes.next() {
        Some(first) => hashes.fold(first, combine),
        None => EMPTY_FOLD_HASH,
    }
}

/// Computes the hash of a full call from its canonicalized arguments.
///
/// The positional tuple hashes as an ordered sequence, the named arguments
/// as a mapping (string keys), and the two are combined with [`combine`].
/// After canonicalization the positional part is normally empty.
pub fn hash_call(positional: &[Value], named: &BTreeMap<String, Value>) -> u64 {
    let hp = fold(positional);
    let keys = named
        .keys()
        .fold(0u64, |acc, k| acc.wrapping_add(xxh3_64(k.as_bytes())));
    let values = named
        .values()
        .fold(0u64, |acc, v| acc.wrapping_add(hash_value(v)));
    combine(hp, combine(keys, values))
}
