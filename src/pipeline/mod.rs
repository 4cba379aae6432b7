//! Split orchestration: load, group, partition, then write shards in parallel.
//!
//! Loading and grouping finish before any shard starts, because partition
//! boundaries depend on the complete group list. Shards are then handed to a
//! dedicated rayon pool. Workers share nothing mutable except a cancellation
//! flag: the first real failure raises it, shards that have not started yet
//! return without creating a file, and running shards stop at their next
//! record boundary. The run is reported as failed whenever any shard failed.

mod report;

pub use report::SplitReport;

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{error, info};

use crate::config::ConvertConfig;
use crate::error::ShardlabelError;
use crate::group::group_by_image;
use crate::ir::{AnnotationGroup, Split};
use crate::partition::partition;
use crate::shard::{write_shard, ShardSpec, ShardSummary};
use crate::source::{AnnotationSource, ImageSource};

/// Converts one split end to end.
///
/// # Errors
/// Configuration problems and missing inputs are reported before any shard
/// is written. Shard failures come back as [`ShardlabelError::SplitFailed`]
/// naming the lowest failing shard index. Output of a failed run must be
/// discarded by the caller; partial files are left in place.
pub fn run_split<A, I>(
    split: Split,
    config: &ConvertConfig,
    annotations: &A,
    images: &I,
) -> Result<SplitReport, ShardlabelError>
where
    A: AnnotationSource + ?Sized,
    I: ImageSource + ?Sized,
{
    config.validate()?;
    let output_dir = config.output_dir()?;

    let raw = annotations.load(split)?;
    let annotation_count = raw.len();
    let groups = group_by_image(raw);
    info!(
        %split,
        annotations = annotation_count,
        images = groups.len(),
        shards = config.shard_count(split),
        "grouped annotations"
    );

    write_groups(
        split,
        &groups,
        config.shard_count(split),
        config.worker_pool_size,
        output_dir,
        images,
    )
}

/// Converts every split in [`Split::ALL`] order, stopping at the first failure.
pub fn run_all<A, I>(
    config: &ConvertConfig,
    annotations: &A,
    images: &I,
) -> Result<Vec<SplitReport>, ShardlabelError>
where
    A: AnnotationSource + ?Sized,
    I: ImageSource + ?Sized,
{
    Split::ALL
        .into_iter()
        .map(|split| run_split(split, config, annotations, images))
        .collect()
}

/// Partitions already-grouped data into `shard_count` shards and writes them
/// on a pool of `worker_pool_size` threads.
///
/// Exactly `shard_count` files are produced on success. When there are fewer
/// groups than shards the leading shards are empty files.
pub fn write_groups<I>(
    split: Split,
    groups: &[AnnotationGroup],
    shard_count: usize,
    worker_pool_size: usize,
    output_dir: &Path,
    images: &I,
) -> Result<SplitReport, ShardlabelError>
where
    I: ImageSource + ?Sized,
{
    if shard_count < 1 {
        return Err(ShardlabelError::InvalidConfig(
            "shard count must be at least 1".to_string(),
        ));
    }
    if worker_pool_size < 1 {
        return Err(ShardlabelError::InvalidConfig(
            "worker_pool_size must be at least 1".to_string(),
        ));
    }
    fs::create_dir_all(output_dir).map_err(|source| ShardlabelError::ShardWrite {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_pool_size)
        .thread_name(|i| format!("shard-worker-{i}"))
        .build()
        .map_err(|e| ShardlabelError::InvalidConfig(format!("cannot start worker pool: {e}")))?;

    let chunks = partition(groups, shard_count);
    let cancel = AtomicBool::new(false);

    let results: Vec<Result<ShardSummary, ShardlabelError>> = pool.install(|| {
        chunks
            .par_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let spec = ShardSpec::new(output_dir, split, index, shard_count);
                let result = write_shard(&spec, chunk, images, &cancel);
                if let Err(err) = &result {
                    if !matches!(err, ShardlabelError::Cancelled) {
                        error!(%split, shard = index, error = %err, "shard failed, cancelling split");
                        cancel.store(true, Ordering::Release);
                    }
                }
                result
            })
            .collect()
    });

    let annotations = groups.iter().map(AnnotationGroup::len).sum();
    collect_results(split, annotations, results)
}

/// Turns per-shard results into a report, or into the failure of the lowest
/// shard that failed for a reason other than cancellation.
fn collect_results(
    split: Split,
    annotations: usize,
    results: Vec<Result<ShardSummary, ShardlabelError>>,
) -> Result<SplitReport, ShardlabelError> {
    let mut shards = Vec::with_capacity(results.len());
    let mut failures: Vec<(usize, ShardlabelError)> = Vec::new();
    let mut cancelled: Option<usize> = None;

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(summary) => shards.push(summary),
            Err(ShardlabelError::Cancelled) => {
                cancelled.get_or_insert(index);
            }
            Err(err) => failures.push((index, err)),
        }
    }

    let failed_shards: Vec<usize> = failures.iter().map(|(index, _)| *index).collect();
    let first = match failures.into_iter().next() {
        Some(first) => Some(first),
        None => cancelled.map(|index| (index, ShardlabelError::Cancelled)),
    };
    if let Some((shard_index, source)) = first {
        return Err(ShardlabelError::SplitFailed {
            split,
            shard_index,
            failed_shards,
            source: Box::new(source),
        });
    }

    Ok(SplitReport {
        split,
        annotations,
        shards,
    })
}
