//! Delta round-trip properties
//!
//! Applying the computed operations against the source must rebuild the target
//! exactly, whatever the sizes involved.

use dsvn_delta::{apply_delta, compute_delta, target_len, DeltaOp, DeltaStats, MATCH_BLOCKSIZE};
use proptest::prelude::*;

fn roundtrip(source: &[u8], target: &[u8]) {
    let ops = compute_delta(source, target);
    assert_eq!(target_len(&ops), target.len());
    assert_eq!(apply_delta(source, &ops).unwrap(), target);
}

#[test]
fn test_boundary_sizes() {
    let source: Vec<u8> = (0..500u32).map(|i| (i % 251) as u8).collect();
    for size in [0, 1, 63, 64, 65, 127, 128, 129, 499, 500, 501] {
        let target: Vec<u8> = (0..size as u32).map(|i| (i % 251) as u8).collect();
        roundtrip(&source, &target);
    }
}

#[test]
fn test_no_adjacent_inserts() {
    let source: Vec<u8> = (0..4096u32).map(|i| (i * 17 % 253) as u8).collect();
    let mut target = source.clone();
    for pos in [100, 900, 2000, 3500] {
        target[pos] = target[pos].wrapping_add(1);
    }

    let ops = compute_delta(&source, &target);
    for pair in ops.windows(2) {
        assert!(!(pair[0].is_insert() && pair[1].is_insert()), "{:?}", pair);
    }
    assert_eq!(apply_delta(&source, &ops).unwrap(), target);
}

#[test]
fn test_appended_tail_copies_prefix() {
    let source: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 241) as u8).collect();
    let mut target = source.clone();
    target.extend_from_slice(b"appended log line\n");

    let ops = compute_delta(&source, &target);
    assert_eq!(ops[0], DeltaOp::Copy { offset: 0, len: source.len() });
    let stats = DeltaStats::from_ops(&ops);
    assert_eq!(stats.bytes_inserted, 18);
}

#[test]
fn test_truncated_target() {
    let source: Vec<u8> = (0..1000u32).map(|i| (i * 3 % 256) as u8).collect();
    let target = &source[..MATCH_BLOCKSIZE * 3 + 5];
    let ops = compute_delta(&source, target);
    assert_eq!(ops, vec![DeltaOp::Copy { offset: 0, len: target.len() }]);
}

proptest! {
    #[test]
    fn prop_roundtrip_unrelated(
        source in prop::collection::vec(any::<u8>(), 0..2048),
        target in prop::collection::vec(any::<u8>(), 0..2048),
    ) {
        let ops = compute_delta(&source, &target);
        prop_assert_eq!(apply_delta(&source, &ops).unwrap(), target);
    }

    #[test]
    fn prop_roundtrip_edited(
        source in prop::collection::vec(0u8..4, 1..3000),
        edits in prop::collection::vec(
            (any::<prop::sample::Index>(), prop::collection::vec(any::<u8>(), 0..40)),
            0..6,
        ),
        cut in any::<prop::sample::Index>(),
    ) {
        let mut target = source.clone();
        for (at, bytes) in &edits {
            let pos = at.index(target.len() + 1);
            target.splice(pos..pos, bytes.iter().copied());
        }
        let keep = cut.index(target.len() + 1);
        target.truncate(keep.max(target.len() / 2));

        let ops = compute_delta(&source, &target);
        prop_assert_eq!(apply_delta(&source, &ops).unwrap(), target);
    }

    #[test]
    fn prop_identical_is_one_copy(
        source in prop::collection::vec(any::<u8>(), MATCH_BLOCKSIZE..4096)
    ) {
        let ops = compute_delta(&source, &source);
        prop_assert_eq!(ops, vec![DeltaOp::Copy { offset: 0, len: source.len() }]);
    }
}
