//! COCO instances JSON reader.
//!
//! Only the `annotations` array is consumed. Every entry becomes one
//! [`RawAnnotation`] whose image reference is derived from `image_id`:
//!
//! ```text
//! <image_dir>/<image_id zero-padded to 12 digits>.jpg
//! ```
//!
//! COCO bounding boxes use `[x, y, width, height]` in absolute pixels; they are
//! converted to XYXY on read. The `images`, `categories` and `info` sections
//! are accepted and ignored. A bbox with other than four numbers is a parse
//! error.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use super::{BBoxXYXY, CategoryId, ImageId, Pixel, RawAnnotation, Split};
use crate::error::ShardlabelError;
use crate::source::AnnotationSource;

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CocoInstances {
    annotations: Vec<CocoAnnotation>,
}

#[derive(Debug, Deserialize)]
struct CocoAnnotation {
    image_id: u64,
    #[serde(deserialize_with = "int64_label")]
    category_id: u64,

    /// `[x, y, width, height]` with `(x, y)` the top-left corner.
    bbox: [f64; 4],
}

/// Class ids are written as int64 labels, so larger values are rejected here.
fn int64_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let id = u64::deserialize(deserializer)?;
    if i64::try_from(id).is_err() {
        return Err(serde::de::Error::custom(format!(
            "category_id {id} does not fit in an int64 label"
        )));
    }
    Ok(id)
}

// ============================================================================
// Public API
// ============================================================================

/// Reads the annotations of one split from a COCO instances file.
///
/// # Errors
/// [`ShardlabelError::MissingInput`] if the file does not exist,
/// [`ShardlabelError::CocoJsonParse`] if it is not valid COCO JSON.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use shardlabel::ir::Split;
/// use shardlabel::ir::io_coco_json::read_coco_annotations;
///
/// let anns = read_coco_annotations(
///     Path::new("annotations/instances_val2017.json"),
///     Path::new("val2017"),
///     Split::Val,
/// )?;
/// # Ok::<(), shardlabel::ShardlabelError>(())
/// ```
pub fn read_coco_annotations(
    path: &Path,
    image_dir: &Path,
    split: Split,
) -> Result<Vec<RawAnnotation>, ShardlabelError> {
    if !path.exists() {
        return Err(ShardlabelError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(ShardlabelError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoInstances =
        serde_json::from_reader(reader).map_err(|source| ShardlabelError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(coco_to_raw(coco, image_dir, split))
}

/// Reads annotations from a COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_str(
    json: &str,
    image_dir: &Path,
    split: Split,
) -> Result<Vec<RawAnnotation>, serde_json::Error> {
    let coco: CocoInstances = serde_json::from_str(json)?;
    Ok(coco_to_raw(coco, image_dir, split))
}

/// Reads annotations from COCO JSON bytes.
///
/// Useful for fuzzing and processing raw bytes without UTF-8 validation overhead.
pub fn from_coco_slice(
    bytes: &[u8],
    image_dir: &Path,
    split: Split,
) -> Result<Vec<RawAnnotation>, serde_json::Error> {
    let coco: CocoInstances = serde_json::from_slice(bytes)?;
    Ok(coco_to_raw(coco, image_dir, split))
}

/// Image reference for a COCO image id inside `image_dir`.
pub fn image_ref_for(image_dir: &Path, image_id: ImageId) -> String {
    image_dir
        .join(format!("{}.jpg", image_id.file_stem()))
        .to_string_lossy()
        .into_owned()
}

fn coco_to_raw(coco: CocoInstances, image_dir: &Path, split: Split) -> Vec<RawAnnotation> {
    coco.annotations
        .into_iter()
        .map(|ann| {
            let [x, y, w, h] = ann.bbox;
            let image_id = ImageId::new(ann.image_id);
            RawAnnotation {
                image_ref: image_ref_for(image_dir, image_id),
                image_id,
                category_id: CategoryId::new(ann.category_id),
                bbox: BBoxXYXY::<Pixel>::from_xywh(x, y, w, h),
                split,
            }
        })
        .collect()
}

// ============================================================================
// Annotation source
// ============================================================================

/// Where one split's annotations and images live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CocoSplitPaths {
    pub annotations: PathBuf,
    pub image_dir: PathBuf,
}

/// [`AnnotationSource`] backed by COCO instances files, one per split.
#[derive(Clone, Debug, Default)]
pub struct CocoAnnotationSource {
    splits: BTreeMap<Split, CocoSplitPaths>,
}

impl CocoAnnotationSource {
    /// Creates a source with no splits registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the annotation file and image directory of a split.
    pub fn with_split(
        mut self,
        split: Split,
        annotations: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        self.splits.insert(
            split,
            CocoSplitPaths {
                annotations: annotations.into(),
                image_dir: image_dir.into(),
            },
        );
        self
    }

    /// The COCO 2017 release layout under `root`:
    /// `annotations/instances_{train,val}2017.json` next to
    /// `train2017/` and `val2017/`.
    pub fn coco2017(root: &Path) -> Self {
        Self::new()
            .with_split(
                Split::Train,
                root.join("annotations").join("instances_train2017.json"),
                root.join("train2017"),
            )
            .with_split(
                Split::Val,
                root.join("annotations").join("instances_val2017.json"),
                root.join("val2017"),
            )
    }

    /// Paths registered for `split`, if any.
    pub fn paths(&self, split: Split) -> Option<&CocoSplitPaths> {
        self.splits.get(&split)
    }
}

impl AnnotationSource for CocoAnnotationSource {
    fn load(&self, split: Split) -> Result<Vec<RawAnnotation>, ShardlabelError> {
        let paths = self.paths(split).ok_or_else(|| {
            ShardlabelError::InvalidConfig(format!("no annotation file configured for split '{split}'"))
        })?;
        read_coco_annotations(&paths.annotations, &paths.image_dir, split)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_coco_json() -> &'static str {
        r#"{
            "info": {"year": 2017},
            "images": [{"id": 139, "width": 640, "height": 426, "file_name": "000000000139.jpg"}],
            "categories": [{"id": 1, "name": "person"}],
            "annotations": [
                {"id": 1, "image_id": 139, "category_id": 64, "bbox": [236.98, 142.51, 24.7, 69.5], "area": 1035.7, "iscrowd": 0},
                {"id": 2, "image_id": 285, "category_id": 23, "bbox": [0, 50, 100, 25]},
                {"id": 3, "image_id": 139, "category_id": 1, "bbox": [10, 20, 30, 40]}
            ]
        }"#
    }

    #[test]
    fn test_annotations_are_read_in_source_order() {
        let anns = from_coco_str(sample_coco_json(), Path::new("val2017"), Split::Val)
            .expect("parse failed");

        assert_eq!(anns.len(), 3);
        assert_eq!(anns[0].image_id, ImageId(139));
        assert_eq!(anns[1].image_id, ImageId(285));
        assert_eq!(anns[2].category_id, CategoryId(1));
        assert!(anns.iter().all(|a| a.split == Split::Val));
    }

    #[test]
    fn test_image_ref_is_zero_padded_path() {
        let anns = from_coco_str(sample_coco_json(), Path::new("val2017"), Split::Val)
            .expect("parse failed");
        let expected = Path::new("val2017")
            .join("000000000285.jpg")
            .to_string_lossy()
            .into_owned();
        assert_eq!(anns[1].image_ref, expected);
    }

    #[test]
    fn test_bbox_xywh_becomes_xyxy() {
        let anns = from_coco_str(sample_coco_json(), Path::new("."), Split::Train)
            .expect("parse failed");
        let bbox = &anns[2].bbox;
        assert_eq!(bbox.xmin(), 10.0);
        assert_eq!(bbox.ymin(), 20.0);
        assert_eq!(bbox.xmax(), 40.0);
        assert_eq!(bbox.ymax(), 60.0);
    }

    #[test]
    fn test_short_bbox_is_parse_error() {
        let json = r#"{"annotations": [{"image_id": 1, "category_id": 1, "bbox": [1, 2, 3]}]}"#;
        assert!(from_coco_str(json, Path::new("."), Split::Train).is_err());
    }

    #[test]
    fn test_category_id_must_fit_int64_label() {
        let max = format!(
            r#"{{"annotations": [{{"image_id": 1, "category_id": {}, "bbox": [0, 0, 1, 1]}}]}}"#,
            i64::MAX
        );
        let anns = from_coco_str(&max, Path::new("."), Split::Train).expect("i64::MAX fits");
        assert_eq!(anns[0].category_id.as_label(), Some(i64::MAX));

        let over = format!(
            r#"{{"annotations": [{{"image_id": 1, "category_id": {}, "bbox": [0, 0, 1, 1]}}]}}"#,
            i64::MAX as u64 + 1
        );
        let err = from_coco_str(&over, Path::new("."), Split::Train).unwrap_err();
        assert!(err.to_string().contains("does not fit in an int64 label"));

        let negative = r#"{"annotations": [{"image_id": 1, "category_id": -3, "bbox": [0, 0, 1, 1]}]}"#;
        assert!(from_coco_str(negative, Path::new("."), Split::Train).is_err());
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = read_coco_annotations(
            Path::new("definitely/not/here.json"),
            Path::new("."),
            Split::Train,
        )
        .unwrap_err();
        assert!(matches!(err, ShardlabelError::MissingInput { .. }));
    }

    #[test]
    fn test_unregistered_split_is_config_error() {
        let source = CocoAnnotationSource::new().with_split(Split::Train, "a.json", "imgs");
        let err = source.load(Split::Val).unwrap_err();
        assert!(matches!(err, ShardlabelError::InvalidConfig(_)));
    }

    #[test]
    fn test_coco2017_layout() {
        let source = CocoAnnotationSource::coco2017(Path::new("/data/coco"));
        let val = source.paths(Split::Val).expect("val registered");
        assert_eq!(
            val.annotations,
            Path::new("/data/coco/annotations/instances_val2017.json")
        );
        assert_eq!(val.image_dir, Path::new("/data/coco/val2017"));
    }
}
