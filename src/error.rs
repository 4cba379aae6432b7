use std::path::PathBuf;
use thiserror::Error;

use crate::ir::Split;

/// The main error type for shardlabel operations.
#[derive(Debug, Error)]
pub enum ShardlabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing input: {path} does not exist")]
    MissingInput { path: PathBuf },

    #[error("Image {image_ref}: annotation {index} has normalized {coord}={value} outside [0, 1]")]
    CoordinateOutOfRange {
        image_ref: String,
        index: usize,
        coord: &'static str,
        value: f64,
    },

    #[error("Image {image_ref}: annotation {index} has a malformed bbox: {message}")]
    MalformedBBox {
        image_ref: String,
        index: usize,
        message: String,
    },

    #[error("Image {image_ref}: annotation {index} has category_id {category_id}, which does not fit in an int64 label")]
    InvalidCategory {
        image_ref: String,
        index: usize,
        category_id: u64,
    },

    #[error("Image not found: {path}")]
    ImageNotFound { path: PathBuf },

    #[error("Failed to read image {path}: {message}")]
    ImageUnreadable { path: PathBuf, message: String },

    #[error("Failed to encode image {path} as JPEG: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write shard {path}: {source}")]
    ShardWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record {index} in {path}: {message}")]
    CorruptRecord {
        path: PathBuf,
        index: u64,
        message: String,
    },

    #[error("{dir} holds '{split}' shards from runs with different shard counts: {counts:?}")]
    MixedShardCounts {
        dir: PathBuf,
        split: Split,
        counts: Vec<usize>,
    },

    #[error("Shard task cancelled after another shard failed")]
    Cancelled,

    #[error(
        "Split '{split}' shard {shard_index} failed: {source} ({} shard(s) failed: {:?})",
        .failed_shards.len(),
        .failed_shards
    )]
    SplitFailed {
        split: Split,
        shard_index: usize,
        failed_shards: Vec<usize>,
        #[source]
        source: Box<ShardlabelError>,
    },
}

/// Coarse classification of a failure, used to decide how it is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed annotation data; an upstream data bug.
    Validation,
    /// An image or output file could not be read or written.
    Resource,
    /// Bad options or missing inputs, detected before any shard starts.
    Config,
    /// The task stopped because a sibling shard failed.
    Cancelled,
}

impl ShardlabelError {
    /// Classifies this error. A split failure takes the kind of its first cause.
    pub fn kind(&self) -> FailureKind {
        match self {
            ShardlabelError::CoordinateOutOfRange { .. }
            | ShardlabelError::MalformedBBox { .. }
            | ShardlabelError::InvalidCategory { .. } => FailureKind::Validation,
            ShardlabelError::Io(_)
            | ShardlabelError::ImageNotFound { .. }
            | ShardlabelError::ImageUnreadable { .. }
            | ShardlabelError::ImageEncode { .. }
            | ShardlabelError::ShardWrite { .. }
            | ShardlabelError::CorruptRecord { .. }
            | ShardlabelError::MixedShardCounts { .. } => FailureKind::Resource,
            ShardlabelError::CocoJsonParse { .. }
            | ShardlabelError::ConfigParse { .. }
            | ShardlabelError::InvalidConfig(_)
            | ShardlabelError::MissingInput { .. } => FailureKind::Config,
            ShardlabelError::Cancelled => FailureKind::Cancelled,
            ShardlabelError::SplitFailed { source, .. } => source.kind(),
        }
    }
}
