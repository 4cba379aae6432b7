//! Conversion settings.
//!
//! Settings can come from a JSON or YAML file (chosen by extension) and are
//! then overridden by command-line flags. Every field has a default except
//! the output directory, which must be set before a run starts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ShardlabelError;
use crate::images::{ImageCodec, DEFAULT_JPEG_QUALITY};
use crate::ir::Split;

pub const DEFAULT_TRAIN_SHARD_COUNT: usize = 64;
pub const DEFAULT_VAL_SHARD_COUNT: usize = 8;

/// Number of worker threads used when none is configured.
pub fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Options for converting annotation splits into shards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Shards written for the train split.
    pub train_shard_count: usize,

    /// Shards written for the validation split.
    pub val_shard_count: usize,

    /// Worker threads writing shards concurrently.
    pub worker_pool_size: usize,

    /// Directory receiving the shard files. Created if missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,

    /// How image bytes are stored in records.
    pub image_codec: ImageCodec,

    /// Quality used when re-encoding to JPEG (1..=100).
    pub jpeg_quality: u8,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            train_shard_count: DEFAULT_TRAIN_SHARD_COUNT,
            val_shard_count: DEFAULT_VAL_SHARD_COUNT,
            worker_pool_size: default_worker_pool_size(),
            output_directory: None,
            image_codec: ImageCodec::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ConvertConfig {
    /// Shard count configured for `split`.
    pub fn shard_count(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train_shard_count,
            Split::Val => self.val_shard_count,
        }
    }

    /// Overrides the shard count of one split.
    pub fn set_shard_count(&mut self, split: Split, count: usize) {
        match split {
            Split::Train => self.train_shard_count = count,
            Split::Val => self.val_shard_count = count,
        }
    }

    /// Returns the output directory or a configuration error if unset.
    pub fn output_dir(&self) -> Result<&Path, ShardlabelError> {
        self.output_directory
            .as_deref()
            .ok_or_else(|| ShardlabelError::InvalidConfig("output_directory is not set".to_string()))
    }

    /// Checks every setting before any work is dispatched.
    pub fn validate(&self) -> Result<(), ShardlabelError> {
        for split in Split::ALL {
            if self.shard_count(split) < 1 {
                return Err(ShardlabelError::InvalidConfig(format!(
                    "{split}_shard_count must be at least 1"
                )));
            }
        }
        if self.worker_pool_size < 1 {
            return Err(ShardlabelError::InvalidConfig(
                "worker_pool_size must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ShardlabelError::InvalidConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        self.output_dir()?;
        Ok(())
    }
}

/// Reads a config file. `.json` is parsed as JSON, `.yaml`/`.yml` as YAML.
pub fn load_config(path: &Path) -> Result<ConvertConfig, ShardlabelError> {
    if !path.exists() {
        return Err(ShardlabelError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(ShardlabelError::Io)?;
    let parse_err = |message: String| ShardlabelError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => serde_json::from_str(&text).map_err(|e| parse_err(e.to_string())),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text).map_err(|e| parse_err(e.to_string())),
        _ => Err(parse_err(
            "unsupported config extension (expected .json, .yaml or .yml)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConvertConfig::default();
        assert_eq!(config.train_shard_count, 64);
        assert_eq!(config.val_shard_count, 8);
        assert!(config.worker_pool_size >= 1);
        assert_eq!(config.image_codec, ImageCodec::Jpeg);
        assert_eq!(config.shard_count(Split::Val), 8);
    }

    #[test]
    fn test_validate_rejects_zero_shards() {
        let mut config = ConvertConfig {
            output_directory: Some("out".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.set_shard_count(Split::Val, 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("val_shard_count"));
    }

    #[test]
    fn test_validate_requires_output_directory() {
        let err = ConvertConfig::default().validate().unwrap_err();
        assert!(matches!(err, ShardlabelError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = ConvertConfig {
            worker_pool_size: 0,
            output_directory: Some("out".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");

        let yaml = dir.path().join("shards.yaml");
        fs::write(&yaml, "train_shard_count: 16\nimage_codec: passthrough\n").expect("write");
        let config = load_config(&yaml).expect("yaml config");
        assert_eq!(config.train_shard_count, 16);
        assert_eq!(config.val_shard_count, 8);
        assert_eq!(config.image_codec, ImageCodec::Passthrough);

        let json = dir.path().join("shards.json");
        fs::write(&json, r#"{"val_shard_count": 2, "output_directory": "out"}"#).expect("write");
        let config = load_config(&json).expect("json config");
        assert_eq!(config.val_shard_count, 2);
        assert_eq!(config.output_directory, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"num_shards": 2}"#).expect("write");
        assert!(matches!(
            load_config(&path),
            Err(ShardlabelError::ConfigParse { .. })
        ));
    }
}
