//! Integration tests for `TrieBuilder`.

use rstest::rstest;
use trie_array::{Trie, TrieBuilder};

fn assigned(count: i32) -> Trie<i32> {
    (0..count).fold(Trie::new(), |trie, index| trie.assign(index, index * 2))
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(31)]
#[case(32)]
#[case(33)]
#[case(1024)]
#[case(1025)]
#[case(32 * 32 * 32 + 7)]
fn test_build_matches_repeated_assign(#[case] count: i32) {
    let mut builder = TrieBuilder::new();
    builder.extend((0..count).map(|index| index * 2));
    let built = builder.build();

    assert_eq!(built.check_invariants(), Ok(()));
    assert_eq!(built, assigned(count));
    assert!(built.iter().eq(assigned(count).iter()));
}

#[rstest]
fn test_builder_keeps_going_after_build() {
    let mut builder = TrieBuilder::new();
    builder.extend(0..40);
    let early = builder.build();
    builder.extend(40..100);
    let late = builder.build();

    assert_eq!(early.len(), 40);
    assert_eq!(late.len(), 100);
    assert_eq!(late.find(99), Some(&99));
    assert_eq!(early.find(99), None);
}

#[rstest]
fn test_built_trie_accepts_edits() {
    let trie: Trie<i32> = (0..100).collect();
    let edited = trie.assign(-1, -1).delete(50);
    assert_eq!(edited.len(), 100);
    assert_eq!(edited.keys().next(), Some(-1));
    assert_eq!(edited.check_invariants(), Ok(()));
}

#[cfg(feature = "arc")]
mod shared {
    use rstest::rstest;
    use trie_array::SharedTrieBuilder;

    #[rstest]
    fn test_shared_builder_across_threads() {
        let builder = SharedTrieBuilder::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for value in 0..250 {
                        builder.add(value);
                    }
                });
            }
        });
        let trie = builder.build();
        assert_eq!(trie.len(), 1000);
        assert_eq!(trie.values().sum::<i32>(), 4 * (0..250).sum::<i32>());
    }
}
