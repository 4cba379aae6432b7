//! Writing one shard: a contiguous run of groups into one TFRecord file.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::ShardlabelError;
use crate::ir::{AnnotationGroup, Split};
use crate::record::{encode_group, EncodeOutcome};
use crate::source::ImageSource;
use crate::tfrecord::TfRecordWriter;

/// File name of shard `index` out of `count`, e.g. `train-00003-of-00064.tfrecord`.
pub fn shard_file_name(split: Split, index: usize, count: usize) -> String {
    format!("{split}-{index:05}-of-{count:05}.tfrecord")
}

/// Full path of a shard inside `output_dir`.
pub fn shard_path(output_dir: &Path, split: Split, index: usize, count: usize) -> PathBuf {
    output_dir.join(shard_file_name(split, index, count))
}

/// Identity of one shard within its split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardSpec {
    pub split: Split,
    pub index: usize,
    pub count: usize,
    pub path: PathBuf,
}

impl ShardSpec {
    pub fn new(output_dir: &Path, split: Split, index: usize, count: usize) -> Self {
        Self {
            split,
            index,
            count,
            path: shard_path(output_dir, split, index, count),
        }
    }
}

/// Outcome of a completed shard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardSummary {
    pub index: usize,
    pub path: PathBuf,
    /// Groups assigned to the shard.
    pub groups: usize,
    /// Records written.
    pub records: u64,
    /// Groups skipped as non-images.
    pub skipped: u64,
}

/// Encodes `groups` in order and appends each record to the shard file.
///
/// The file is created (or truncated) only after `cancel` has been checked,
/// so a shard cancelled before it starts leaves nothing behind. `cancel` is
/// checked again before every record; a running shard stops at a record
/// boundary. Any error stops the shard immediately and leaves a partial file,
/// which callers must treat as invalid.
pub fn write_shard<S>(
    spec: &ShardSpec,
    groups: &[AnnotationGroup],
    images: &S,
    cancel: &AtomicBool,
) -> Result<ShardSummary, ShardlabelError>
where
    S: ImageSource + ?Sized,
{
    if cancel.load(Ordering::Acquire) {
        return Err(ShardlabelError::Cancelled);
    }

    info!(
        split = %spec.split,
        shard = spec.index,
        groups = groups.len(),
        path = %spec.path.display(),
        "writing shard"
    );

    let write_err = |source: std::io::Error| ShardlabelError::ShardWrite {
        path: spec.path.clone(),
        source,
    };
    let file = File::create(&spec.path).map_err(write_err)?;
    let mut writer = TfRecordWriter::new(BufWriter::new(file));
    let mut skipped = 0u64;

    for group in groups {
        if cancel.load(Ordering::Acquire) {
            writer.flush().map_err(write_err)?;
            debug!(shard = spec.index, "stopping at record boundary");
            return Err(ShardlabelError::Cancelled);
        }

        match encode_group(group, images)? {
            EncodeOutcome::Record(record) => {
                writer.write_record(&record.encode_to_vec()).map_err(write_err)?;
            }
            EncodeOutcome::Skipped => skipped += 1,
        }
    }

    let records = writer.records_written();
    writer.into_inner().map_err(write_err)?;

    info!(
        split = %spec.split,
        shard = spec.index,
        records,
        skipped,
        "shard complete"
    );
    Ok(ShardSummary {
        index: spec.index,
        path: spec.path.clone(),
        groups: groups.len(),
        records,
        skipped,
    })
}
