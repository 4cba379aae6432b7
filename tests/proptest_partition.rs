use std::collections::HashSet;

use proptest::prelude::*;
use shardlabel::group::group_by_image;
use shardlabel::partition::{chunk_ranges, partition};

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn grouping_is_a_partition_of_the_input(anns in proptest_helpers::arb_annotations(12, 60)) {
        let groups = group_by_image(anns.clone());

        let total: usize = groups.iter().map(|g| g.len()).sum();
        prop_assert_eq!(total, anns.len());

        let mut seen = HashSet::new();
        for group in &groups {
            prop_assert!(!group.is_empty());
            prop_assert!(seen.insert(group.image_ref().to_string()), "image appears in two groups");
            for ann in group.annotations() {
                prop_assert_eq!(&ann.image_ref, group.image_ref());
            }
        }
    }

    #[test]
    fn grouping_preserves_first_seen_and_member_order(anns in proptest_helpers::arb_annotations(12, 60)) {
        let groups = group_by_image(anns.clone());

        let mut first_seen: Vec<&str> = Vec::new();
        for ann in &anns {
            if !first_seen.contains(&ann.image_ref.as_str()) {
                first_seen.push(&ann.image_ref);
            }
        }
        let group_order: Vec<&str> = groups.iter().map(|g| g.image_ref()).collect();
        prop_assert_eq!(group_order, first_seen);

        for group in &groups {
            let expected: Vec<_> = anns
                .iter()
                .filter(|a| a.image_ref == group.image_ref())
                .cloned()
                .collect();
            prop_assert_eq!(group.annotations(), expected.as_slice());
        }
    }

    #[test]
    fn grouping_is_deterministic(anns in proptest_helpers::arb_annotations(12, 60)) {
        prop_assert_eq!(group_by_image(anns.clone()), group_by_image(anns));
    }

    #[test]
    fn chunks_tile_the_input(len in 0usize..2_000, shard_count in 1usize..128) {
        let ranges = chunk_ranges(len, shard_count);
        prop_assert_eq!(ranges.len(), shard_count);

        let mut next = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, next);
            next = range.end;
        }
        prop_assert_eq!(next, len);

        let base = len / shard_count;
        for range in &ranges[..shard_count - 1] {
            prop_assert_eq!(range.len(), base);
        }
        prop_assert_eq!(ranges[shard_count - 1].len(), base + len % shard_count);
    }

    #[test]
    fn partition_keeps_item_order(len in 0usize..500, shard_count in 1usize..40) {
        let items: Vec<usize> = (0..len).collect();
        let flattened: Vec<usize> = partition(&items, shard_count)
            .into_iter()
            .flat_map(|chunk| chunk.iter().copied())
            .collect();
        prop_assert_eq!(flattened, items);
    }
}
