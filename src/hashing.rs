//! This module provides a deterministic hasher and `HashMap`, `IndexMap` and `IndexSet`
//! variants that use it. The hashing data structures in the standard library are not
//! deterministic:
//!
//! > By default, HashMap uses a hashing algorithm selected to provide
//! > resistance against HashDoS attacks. The algorithm is randomly seeded, and a
//! > reasonable best-effort is made to generate this seed from a high quality,
//! > secure source of randomness provided by the host without blocking the program.
//!
//! A simulation that is replayed from the same random seed must visit vertices in the same
//! order, so everything in this crate that is iterated while drawing random numbers is either
//! an `IndexMap`/`IndexSet` (insertion ordered) or is sorted before use.
//!
//! `HashMap<K, V, S>` does not have a `new` method for a custom hasher. Use
//! `HashMap::default()`, or bring the `HashMapExt` trait into scope to keep the
//! familiar `new` / `with_capacity` API.

use std::hash::Hasher;

use rustc_hash::{FxBuildHasher, FxHasher};

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;
pub type IndexSet<T> = indexmap::IndexSet<T, FxBuildHasher>;

/// Provides `new` and `with_capacity` for [`HashMap`] with the deterministic hasher.
pub trait HashMapExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        HashMap::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

/// A convenience method to compute the hash of a `&str`. Used to derive per-stream seed
/// offsets in [`crate::random::SeededRandom`].
pub fn hash_str(data: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_str_is_stable() {
        assert_eq!(hash_str("SpreadRng"), hash_str("SpreadRng"));
        assert_ne!(hash_str("SpreadRng"), hash_str("DeathRng"));
    }

    #[test]
    fn index_set_keeps_insertion_order() {
        let mut set = IndexSet::default();
        for name in ["Thor", "Loki", "Odin", "Loki"] {
            set.insert(name);
        }
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec!["Thor", "Loki", "Odin"]);
    }

    #[test]
    fn map_ext_constructors() {
        let mut map: HashMap<&str, u32> = HashMap::with_capacity(4);
        map.insert("a", 1);
        assert_eq!(map.get("a"), Some(&1));
        let empty: HashMap<u32, u32> = HashMap::new();
        assert!(empty.is_empty());
    }
}
