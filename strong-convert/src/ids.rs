//! Surface identifier allocation
//!
//! Identifiers are 8 symbols from `[a-z0-9A-Z]`. The default strategy draws
//! them uniformly at random and never checks for collisions: 62^8 ≈ 2.18e14
//! values is ample for one batch conversion, but not for adversarial or very
//! high volume use. `Sequential` and `ContentHash` are available when strict
//! or reproducible identifiers are needed.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use strong_common::config::IdStrategy;

/// Identifier length in symbols
pub const ID_LEN: usize = 8;

/// Identifier alphabet: lowercase, digits, uppercase
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 62^8, the size of the identifier space
const ID_SPACE: u64 = 218_340_105_584_896;

/// Issues identifiers for one conversion run
#[derive(Debug)]
pub struct IdAllocator {
    strategy: IdStrategy,
    rng: StdRng,
    issued: u64,
}

impl IdAllocator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            rng: StdRng::from_entropy(),
            issued: 0,
        }
    }

    /// Allocator with a fixed random seed (reproducible `Random` output)
    pub fn seeded(strategy: IdStrategy, seed: u64) -> Self {
        Self {
            strategy,
            rng: StdRng::seed_from_u64(seed),
            issued: 0,
        }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Number of identifiers handed out so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Fresh identifier for an entity with no natural content key
    pub fn new_id(&mut self) -> String {
        let content = format!("#{}", self.issued);
        self.new_id_for(&content)
    }

    /// Fresh identifier for an entity described by `content`
    ///
    /// Only `ContentHash` looks at `content`; callers must pass a key that is
    /// unique per entity for hashed identifiers to stay distinct.
    pub fn new_id_for(&mut self, content: &str) -> String {
        let seq = self.issued;
        self.issued += 1;
        match self.strategy {
            IdStrategy::Random => (0..ID_LEN)
                .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())] as char)
                .collect(),
            IdStrategy::Sequential => encode_base62(seq),
            IdStrategy::ContentHash => {
                let digest = Sha256::digest(content.as_bytes());
                let mut head = [0u8; 8];
                head.copy_from_slice(&digest[..8]);
                encode_base62(u64::from_be_bytes(head))
            }
        }
    }

    /// Identifier of the exercise called `name`
    ///
    /// The first call for a name allocates and records an identifier; every
    /// later call returns that same identifier.
    pub fn exercise_id(&mut self, registry: &mut ExerciseRegistry, name: &str) -> String {
        if let Some(id) = registry.get(name) {
            return id.to_string();
        }
        let id = self.new_id_for(&format!("exercise:{}", name));
        registry.insert(name, id.clone());
        id
    }
}

/// Fixed-width base-62 rendering of `value mod 62^8`
pub fn encode_base62(value: u64) -> String {
    let mut value = value % ID_SPACE;
    let mut out = [ALPHABET[0]; ID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(value % 62) as usize];
        value /= 62;
    }
    out.iter().map(|b| *b as char).collect()
}

/// Exercise name → identifier mapping for one run
///
/// Built empty at the start of a run and filled lazily; an entry is never
/// changed once written. Iteration follows first-seen order.
#[derive(Debug, Default, Clone)]
pub struct ExerciseRegistry {
    ids: IndexMap<String, String>,
}

impl ExerciseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    fn insert(&mut self, name: &str, id: String) {
        self.ids.entry(name.to_string()).or_insert(id);
    }

    /// (name, id) pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids.iter().map(|(name, id)| (name.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_well_formed(id: &str) {
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)), "bad id {}", id);
    }

    #[test]
    fn test_random_ids_are_well_formed() {
        let mut ids = IdAllocator::new(IdStrategy::Random);
        for _ in 0..100 {
            assert_well_formed(&ids.new_id());
        }
        assert_eq!(ids.issued(), 100);
    }

    #[test]
    fn test_random_ids_do_not_repeat_in_practice() {
        let mut ids = IdAllocator::seeded(IdStrategy::Random, 7);
        let issued: HashSet<String> = (0..50_000).map(|_| ids.new_id()).collect();
        assert_eq!(issued.len(), 50_000);
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = IdAllocator::seeded(IdStrategy::Random, 42);
        let mut b = IdAllocator::seeded(IdStrategy::Random, 42);
        assert_eq!(a.new_id(), b.new_id());
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = IdAllocator::new(IdStrategy::Sequential);
        assert_eq!(ids.new_id(), "aaaaaaaa");
        assert_eq!(ids.new_id(), "aaaaaaab");
        assert_eq!(ids.new_id_for("ignored"), "aaaaaaac");
    }

    #[test]
    fn test_encode_base62() {
        assert_eq!(encode_base62(0), "aaaaaaaa");
        assert_eq!(encode_base62(61), "aaaaaaaZ");
        assert_eq!(encode_base62(62), "aaaaaaba");
        assert_eq!(encode_base62(ID_SPACE - 1), "ZZZZZZZZ");
        assert_eq!(encode_base62(ID_SPACE), "aaaaaaaa");
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let mut a = IdAllocator::new(IdStrategy::ContentHash);
        let mut b = IdAllocator::new(IdStrategy::ContentHash);
        let first = a.new_id_for("workout:1673771400");
        assert_eq!(first, b.new_id_for("workout:1673771400"));
        assert_ne!(first, a.new_id_for("workout:1673771401"));
        assert_well_formed(&first);
    }

    #[test]
    fn test_exercise_id_is_stable_per_name() {
        let mut ids = IdAllocator::new(IdStrategy::Random);
        let mut registry = ExerciseRegistry::new();

        let squat = ids.exercise_id(&mut registry, "Squat");
        let bench = ids.exercise_id(&mut registry, "Bench Press");
        assert_eq!(ids.exercise_id(&mut registry, "Squat"), squat);
        assert_ne!(squat, bench);

        // Exact, case-sensitive match only
        let lower = ids.exercise_id(&mut registry, "squat");
        assert_ne!(lower, squat);

        let order: Vec<&str> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["Squat", "Bench Press", "squat"]);
        assert_eq!(registry.len(), 3);
    }
}
