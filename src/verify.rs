//! Read-back integrity check of a split's shard files.
//!
//! Every shard of the split must be present, every record must pass both
//! TFRecord checksums, decode as a `tf.train.Example` and satisfy the record
//! schema (depth 3, equal-length per-object lists).

use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use prost::Message;

use crate::error::ShardlabelError;
use crate::ir::Split;
use crate::record::example::Example;
use crate::record::Record;
use crate::shard::shard_path;
use crate::tfrecord::TfRecordReader;

/// Counts for one verified shard file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedShard {
    pub path: PathBuf,
    pub records: u64,
    pub objects: u64,
}

/// Result of verifying a split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyReport {
    pub split: Split,
    pub shards: Vec<VerifiedShard>,
}

impl VerifyReport {
    pub fn total_records(&self) -> u64 {
        self.shards.iter().map(|s| s.records).sum()
    }

    pub fn total_objects(&self) -> u64 {
        self.shards.iter().map(|s| s.objects).sum()
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Split '{}': {} shard(s), {} record(s), {} object(s) verified",
            self.split,
            self.shards.len(),
            self.total_records(),
            self.total_objects()
        )
    }
}

/// Finds the shard count of `split` from the file names in `output_dir`.
///
/// Looks for `<split>-NNNNN-of-MMMMM.tfrecord` and returns `MMMMM`. Files
/// from runs with different shard counts are an error.
pub fn discover_shard_count(output_dir: &Path, split: Split) -> Result<usize, ShardlabelError> {
    let prefix = format!("{split}-");
    let mut counts = BTreeSet::new();
    for entry in fs::read_dir(output_dir).map_err(ShardlabelError::Io)? {
        let name = entry.map_err(ShardlabelError::Io)?.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(rest) = name
            .strip_prefix(&prefix)
            .and_then(|r| r.strip_suffix(".tfrecord"))
        else {
            continue;
        };
        let Some((_, count)) = rest.split_once("-of-") else {
            continue;
        };
        if let Ok(count) = count.parse::<usize>() {
            counts.insert(count);
        }
    }

    let mut counts = counts.into_iter();
    match (counts.next(), counts.len()) {
        (Some(count), 0) => Ok(count),
        (Some(first), _) => Err(ShardlabelError::MixedShardCounts {
            dir: output_dir.to_path_buf(),
            split,
            counts: std::iter::once(first).chain(counts).collect(),
        }),
        (None, _) => Err(ShardlabelError::MissingInput {
            path: output_dir.join(format!("{split}-*.tfrecord")),
        }),
    }
}

/// Verifies all shards of `split` in `output_dir`.
pub fn verify_split(output_dir: &Path, split: Split) -> Result<VerifyReport, ShardlabelError> {
    let count = discover_shard_count(output_dir, split)?;
    let shards = (0..count)
        .map(|index| verify_shard(&shard_path(output_dir, split, index, count)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VerifyReport { split, shards })
}

/// Verifies a single shard file.
pub fn verify_shard(path: &Path) -> Result<VerifiedShard, ShardlabelError> {
    if !path.exists() {
        return Err(ShardlabelError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(ShardlabelError::Io)?;
    let corrupt = |index: u64, message: String| ShardlabelError::CorruptRecord {
        path: path.to_path_buf(),
        index,
        message,
    };

    let mut records = 0u64;
    let mut objects = 0u64;
    for item in TfRecordReader::new(BufReader::new(file)) {
        let bytes = item.map_err(|e| corrupt(records, e.to_string()))?;
        let example =
            Example::decode(bytes.as_slice()).map_err(|e| corrupt(records, e.to_string()))?;
        let record = Record::from_example(&example).map_err(|message| corrupt(records, message))?;
        objects += record.object_count() as u64;
        records += 1;
    }

    Ok(VerifiedShard {
        path: path.to_path_buf(),
        records,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tfrecord::TfRecordWriter;

    #[test]
    fn test_discover_uses_of_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("train-00000-of-00003.tfrecord"), b"").expect("write");
        fs::write(dir.path().join("val-00000-of-00002.tfrecord"), b"").expect("write");
        fs::write(dir.path().join("notes.txt"), b"").expect("write");

        assert_eq!(discover_shard_count(dir.path(), Split::Train).expect("count"), 3);
        assert_eq!(discover_shard_count(dir.path(), Split::Val).expect("count"), 2);
    }

    #[test]
    fn test_leftover_shards_from_another_run_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("train-00000-of-00002.tfrecord"), b"").expect("write");
        fs::write(dir.path().join("train-00001-of-00002.tfrecord"), b"").expect("write");
        fs::write(dir.path().join("train-00000-of-00004.tfrecord"), b"").expect("write");

        let err = verify_split(dir.path(), Split::Train).unwrap_err();
        match err {
            ShardlabelError::MixedShardCounts { split, counts, .. } => {
                assert_eq!(split, Split::Train);
                assert_eq!(counts, vec![2, 4]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_shard_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("train-00000-of-00002.tfrecord"), b"").expect("write");

        let err = verify_split(dir.path(), Split::Train).unwrap_err();
        assert!(matches!(err, ShardlabelError::MissingInput { .. }));
    }

    #[test]
    fn test_non_example_payload_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("val-00000-of-00001.tfrecord");
        let mut writer = TfRecordWriter::new(File::create(&path).expect("create"));
        writer.write_record(&[0xff, 0xff, 0xff]).expect("write");
        writer.into_inner().expect("flush");

        let err = verify_split(dir.path(), Split::Val).unwrap_err();
        assert!(matches!(err, ShardlabelError::CorruptRecord { index: 0, .. }));
    }
}
