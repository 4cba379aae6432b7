//! Splits the ordered group list into contiguous shard chunks.
//!
//! With `L` items and `N` shards, the first `N - 1` chunks each get `L / N`
//! items and the last chunk takes the rest. When `L < N` the leading chunks
//! are empty; every chunk still maps to a shard file, so a split always
//! produces exactly `N` files.

use std::ops::Range;

/// Index ranges of each chunk. Always returns exactly `shard_count` ranges
/// that tile `0..len` in order.
///
/// # Panics
/// If `shard_count` is zero. Configuration validation rejects that earlier.
pub fn chunk_ranges(len: usize, shard_count: usize) -> Vec<Range<usize>> {
    assert!(shard_count >= 1, "shard_count must be at least 1");
    let base = len / shard_count;
    let mut ranges = Vec::with_capacity(shard_count);
    let mut start = 0;
    for _ in 0..shard_count - 1 {
        ranges.push(start..start + base);
        start += base;
    }
    ranges.push(start..len);
    ranges
}

/// Borrows `items` as `shard_count` contiguous chunks.
pub fn partition<T>(items: &[T], shard_count: usize) -> Vec<&[T]> {
    chunk_ranges(items.len(), shard_count)
        .into_iter()
        .map(|range| &items[range])
        .collect()
}
