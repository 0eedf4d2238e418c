//! A small hash map built on `MappedTrieArray`, hashed with `FxHasher`.

use std::hash::{Hash, Hasher};

use rstest::rstest;
use rustc_hash::FxHasher;
use trie_array::{MappedTrieArray, MappingStrategy, Removal};

/// Chains colliding keys in a vector.
#[derive(Clone, Copy, Default)]
struct Chained;

impl MappingStrategy<String, usize> for Chained {
    type Mapping = Vec<(String, usize)>;

    fn assign(&self, current: Option<&Self::Mapping>, key: String, value: usize) -> Self::Mapping {
        self.update(current, key, |_| value)
    }

    fn update<G>(&self, current: Option<&Self::Mapping>, key: String, generator: G) -> Self::Mapping
    where
        G: FnOnce(Option<&usize>) -> usize,
    {
        let mut entries = current.cloned().unwrap_or_default();
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = generator(Some(&entry.1)),
            None => entries.push((key, generator(None))),
        }
        entries
    }

    fn delete(&self, current: &Self::Mapping, key: &String) -> Removal<Self::Mapping> {
        match current.iter().position(|(existing, _)| existing == key) {
            None => Removal::Unchanged,
            Some(_) if current.len() == 1 => Removal::Removed,
            Some(position) => {
                let mut entries = current.clone();
                entries.remove(position);
                Removal::Updated(entries)
            }
        }
    }

    fn size(&self, mapping: &Self::Mapping) -> usize {
        mapping.len()
    }

    fn find<'a>(&self, mapping: &'a Self::Mapping, key: &String) -> Option<&'a usize> {
        mapping
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }
}

type Map = MappedTrieArray<String, usize, Chained>;

fn fx_hash(key: &str) -> i32 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() as u32).cast_signed()
}

/// Keeps only four bits of the hash so that collisions are frequent.
fn weak_hash(key: &str) -> i32 {
    fx_hash(key) & 0xF
}

fn word(index: usize) -> String {
    format!("word-{index}")
}

#[rstest]
#[case::fx(fx_hash as fn(&str) -> i32)]
#[case::colliding(weak_hash as fn(&str) -> i32)]
fn test_insert_lookup_remove(#[case] hash: fn(&str) -> i32) {
    let map = (0..300).fold(Map::default(), |map, index| {
        let key = word(index);
        map.assign(hash(&key), key, index)
    });
    assert_eq!(map.len(), 300);
    assert_eq!(map.check_invariants(), Ok(()));

    for index in 0..300 {
        let key = word(index);
        assert_eq!(map.find(hash(&key), &key), Some(&index));
    }
    assert!(!map.contains(hash("missing"), &"missing".to_string()));

    let halved = (0..300).step_by(2).fold(map.clone(), |map, index| {
        let key = word(index);
        map.delete(hash(&key), &key)
    });
    assert_eq!(halved.len(), 150);
    assert_eq!(halved.check_invariants(), Ok(()));
    assert_eq!(map.len(), 300);
}

#[rstest]
fn test_collisions_count_entries_not_mappings() {
    let map = (0..100).fold(Map::default(), |map, index| {
        let key = word(index);
        map.assign(weak_hash(&key), key, index)
    });
    assert_eq!(map.len(), 100);
    assert!(map.mapping_count() <= 16);
    assert_eq!(
        map.mappings().map(|(_, mapping)| mapping.len()).sum::<usize>(),
        100
    );
}

#[rstest]
fn test_update_counts_words() {
    let text = "the quick fox and the lazy dog and the cat";
    let counts = text.split(' ').fold(Map::default(), |map, token| {
        map.update(weak_hash(token), token.to_string(), |old| old.map_or(1, |count| count + 1))
    });
    assert_eq!(counts.find(weak_hash("the"), &"the".to_string()), Some(&3));
    assert_eq!(counts.find(weak_hash("and"), &"and".to_string()), Some(&2));
    assert_eq!(counts.len(), 7);
}

#[rstest]
fn test_mappings_ascend_by_hash() {
    let map = (0..50).fold(Map::default(), |map, index| {
        let key = word(index);
        map.assign(fx_hash(&key), key, index)
    });
    let hashes: Vec<i32> = map.mappings().map(|(hash, _)| hash).collect();
    let mut sorted = hashes.clone();
    sorted.sort_unstable();
    assert_eq!(hashes, sorted);
}
