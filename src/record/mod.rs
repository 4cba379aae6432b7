//! Record encoding: one [`AnnotationGroup`] in, one serialized record out.
//!
//! A record carries the image dimensions, a fixed depth of 3, one normalized
//! box and class label per annotation (as parallel lists in annotation order),
//! the encoded image and its base file name. On the wire it is a
//! `tf.train.Example` with these keys:
//!
//! | key                          | type        |
//! |------------------------------|-------------|
//! | `image/height`               | int64       |
//! | `image/width`                | int64       |
//! | `image/depth`                | int64 (= 3) |
//! | `image/object/bbox/xmin`     | float[]     |
//! | `image/object/bbox/ymin`     | float[]     |
//! | `image/object/bbox/xmax`     | float[]     |
//! | `image/object/bbox/ymax`     | float[]     |
//! | `image/object/class/label`   | int64[]     |
//! | `image/encoded`              | bytes       |
//! | `image/filename`             | bytes       |

pub mod example;

use std::collections::BTreeMap;

use prost::Message;
use tracing::{debug, warn};

use crate::error::ShardlabelError;
use crate::ir::{AnnotationGroup, NormalizedBox};
use crate::source::ImageSource;
use example::{Example, Feature, Features};

/// Channel depth written for every image.
pub const IMAGE_DEPTH: u32 = 3;

/// Feature keys of the record schema.
pub mod keys {
    pub const HEIGHT: &str = "image/height";
    pub const WIDTH: &str = "image/width";
    pub const DEPTH: &str = "image/depth";
    pub const BBOX_XMIN: &str = "image/object/bbox/xmin";
    pub const BBOX_YMIN: &str = "image/object/bbox/ymin";
    pub const BBOX_XMAX: &str = "image/object/bbox/xmax";
    pub const BBOX_YMAX: &str = "image/object/bbox/ymax";
    pub const CLASS_LABEL: &str = "image/object/class/label";
    pub const ENCODED: &str = "image/encoded";
    pub const FILENAME: &str = "image/filename";
}

/// A fully assembled record, ready to be appended to a shard.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub labels: Vec<i64>,
    pub xmin: Vec<f32>,
    pub ymin: Vec<f32>,
    pub xmax: Vec<f32>,
    pub ymax: Vec<f32>,
    pub encoded: Vec<u8>,
    pub filename: String,
}

/// What the encoder made of one group.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeOutcome {
    Record(Record),
    /// The group's image reference is not an image; nothing is written.
    Skipped,
}

impl Record {
    /// Number of objects in the record.
    pub fn object_count(&self) -> usize {
        self.labels.len()
    }

    /// Converts the record to its `tf.train.Example` form.
    pub fn to_example(&self) -> Example {
        let mut feature = BTreeMap::new();
        feature.insert(keys::HEIGHT.to_string(), Feature::int64(i64::from(self.height)));
        feature.insert(keys::WIDTH.to_string(), Feature::int64(i64::from(self.width)));
        feature.insert(keys::DEPTH.to_string(), Feature::int64(i64::from(self.depth)));
        feature.insert(keys::BBOX_XMIN.to_string(), Feature::floats(self.xmin.clone()));
        feature.insert(keys::BBOX_YMIN.to_string(), Feature::floats(self.ymin.clone()));
        feature.insert(keys::BBOX_XMAX.to_string(), Feature::floats(self.xmax.clone()));
        feature.insert(keys::BBOX_YMAX.to_string(), Feature::floats(self.ymax.clone()));
        feature.insert(keys::CLASS_LABEL.to_string(), Feature::int64s(self.labels.clone()));
        feature.insert(keys::ENCODED.to_string(), Feature::bytes(self.encoded.clone()));
        feature.insert(
            keys::FILENAME.to_string(),
            Feature::bytes(self.filename.as_bytes().to_vec()),
        );
        Example {
            features: Some(Features { feature }),
        }
    }

    /// Serializes the record to protobuf bytes.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.to_example().encode_to_vec()
    }

    /// Rebuilds a record from an `Example`, checking the schema.
    ///
    /// Fails if a key is missing or has the wrong type, if the per-object
    /// lists differ in length, or if the depth is not 3.
    pub fn from_example(example: &Example) -> Result<Record, String> {
        let single_int = |key: &str| -> Result<i64, String> {
            match example.feature(key).and_then(Feature::as_int64_list) {
                Some([value]) => Ok(*value),
                Some(other) => Err(format!("'{key}' holds {} values, expected 1", other.len())),
                None => Err(format!("missing int64 feature '{key}'")),
            }
        };
        let floats = |key: &str| -> Result<Vec<f32>, String> {
            example
                .feature(key)
                .and_then(Feature::as_float_list)
                .map(<[f32]>::to_vec)
                .ok_or_else(|| format!("missing float feature '{key}'"))
        };
        let single_bytes = |key: &str| -> Result<Vec<u8>, String> {
            match example.feature(key).and_then(Feature::as_bytes_list) {
                Some([value]) => Ok(value.clone()),
                Some(other) => Err(format!("'{key}' holds {} values, expected 1", other.len())),
                None => Err(format!("missing bytes feature '{key}'")),
            }
        };
        let dimension = |key: &str| -> Result<u32, String> {
            let value = single_int(key)?;
            u32::try_from(value).map_err(|_| format!("'{key}' out of range: {value}"))
        };

        let record = Record {
            width: dimension(keys::WIDTH)?,
            height: dimension(keys::HEIGHT)?,
            depth: dimension(keys::DEPTH)?,
            labels: example
                .feature(keys::CLASS_LABEL)
                .and_then(Feature::as_int64_list)
                .map(<[i64]>::to_vec)
                .ok_or_else(|| format!("missing int64 feature '{}'", keys::CLASS_LABEL))?,
            xmin: floats(keys::BBOX_XMIN)?,
            ymin: floats(keys::BBOX_YMIN)?,
            xmax: floats(keys::BBOX_XMAX)?,
            ymax: floats(keys::BBOX_YMAX)?,
            encoded: single_bytes(keys::ENCODED)?,
            filename: String::from_utf8(single_bytes(keys::FILENAME)?)
                .map_err(|e| format!("'{}' is not UTF-8: {e}", keys::FILENAME))?,
        };

        if record.depth != IMAGE_DEPTH {
            return Err(format!("depth is {}, expected {IMAGE_DEPTH}", record.depth));
        }
        let n = record.labels.len();
        if [&record.xmin, &record.ymin, &record.xmax, &record.ymax]
            .iter()
            .any(|list| list.len() != n)
        {
            return Err("per-object feature lists differ in length".to_string());
        }
        Ok(record)
    }
}

/// Normalizes and validates every box of `group` against the image size.
///
/// Returns `(label, box)` pairs in annotation order.
///
/// # Errors
/// [`ShardlabelError::MalformedBBox`] for non-finite or inverted boxes,
/// [`ShardlabelError::CoordinateOutOfRange`] for normalized coordinates
/// outside `[0.0, 1.0]` (both bounds inclusive) and
/// [`ShardlabelError::InvalidCategory`] for ids that do not fit a label.
pub fn normalize_group(
    group: &AnnotationGroup,
    width: u32,
    height: u32,
) -> Result<Vec<(i64, NormalizedBox)>, ShardlabelError> {
    if width == 0 || height == 0 {
        return Err(ShardlabelError::ImageUnreadable {
            path: group.image_ref().into(),
            message: format!("image has zero extent ({width}x{height})"),
        });
    }

    group
        .annotations()
        .iter()
        .enumerate()
        .map(|(index, ann)| {
            if !ann.bbox.is_finite() {
                return Err(ShardlabelError::MalformedBBox {
                    image_ref: group.image_ref().to_string(),
                    index,
                    message: format!("non-finite coordinates {:?}", ann.bbox),
                });
            }
            if !ann.bbox.is_ordered() {
                return Err(ShardlabelError::MalformedBBox {
                    image_ref: group.image_ref().to_string(),
                    index,
                    message: format!(
                        "negative extent (width {}, height {})",
                        ann.bbox.width(),
                        ann.bbox.height()
                    ),
                });
            }

            let normalized = ann.bbox.to_normalized(width, height);
            if let Some((coord, value)) = normalized.first_out_of_range() {
                return Err(ShardlabelError::CoordinateOutOfRange {
                    image_ref: group.image_ref().to_string(),
                    index,
                    coord,
                    value,
                });
            }
            let label = ann
                .category_id
                .as_label()
                .ok_or_else(|| ShardlabelError::InvalidCategory {
                    image_ref: group.image_ref().to_string(),
                    index,
                    category_id: ann.category_id.as_u64(),
                })?;
            Ok((label, normalized))
        })
        .collect()
}

/// Encodes one group into a record.
///
/// Non-image references are skipped with a warning. Everything else is
/// loaded through `images`, normalized, validated and assembled.
pub fn encode_group<S>(group: &AnnotationGroup, images: &S) -> Result<EncodeOutcome, ShardlabelError>
where
    S: ImageSource + ?Sized,
{
    if !images.is_image(group.image_ref()) {
        warn!(image_ref = group.image_ref(), "skipping non-image entry");
        return Ok(EncodeOutcome::Skipped);
    }

    let image = images.load(group.image_ref())?;
    let boxes = normalize_group(group, image.width, image.height)?;

    let mut record = Record {
        width: image.width,
        height: image.height,
        depth: IMAGE_DEPTH,
        labels: Vec::with_capacity(boxes.len()),
        xmin: Vec::with_capacity(boxes.len()),
        ymin: Vec::with_capacity(boxes.len()),
        xmax: Vec::with_capacity(boxes.len()),
        ymax: Vec::with_capacity(boxes.len()),
        encoded: image.encoded,
        filename: group.file_name(),
    };
    for (label, bbox) in boxes {
        record.labels.push(label);
        record.xmin.push(bbox.xmin() as f32);
        record.ymin.push(bbox.ymin() as f32);
        record.xmax.push(bbox.xmax() as f32);
        record.ymax.push(bbox.ymax() as f32);
    }

    debug!(
        image_ref = group.image_ref(),
        objects = record.object_count(),
        bytes = record.encoded.len(),
        "encoded record"
    );
    Ok(EncodeOutcome::Record(record))
}
