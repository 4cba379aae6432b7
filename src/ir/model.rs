//! Annotation model shared by the grouping, partitioning and encoding stages.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::bbox::BBoxXYXY;
use super::ids::{CategoryId, ImageId};
use super::space::Pixel;

/// A named dataset split. Each split is converted by an independent pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Split {
    Train,
    Val,
}

impl Split {
    /// All splits, in the order a full conversion processes them.
    pub const ALL: [Split; 2] = [Split::Train, Split::Val];

    /// Stable name used in shard file names and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "val" | "validation" => Ok(Split::Val),
            other => Err(format!("unknown split '{other}' (expected 'train' or 'val')")),
        }
    }
}

/// One ground-truth object as read from the annotation source.
#[derive(Clone, Debug, PartialEq)]
pub struct RawAnnotation {
    /// Path of the image the object belongs to.
    pub image_ref: String,

    /// Source image id (kept for diagnostics).
    pub image_id: ImageId,

    /// Class of the object.
    pub category_id: CategoryId,

    /// Pixel box, already converted from `(x, y, width, height)`.
    pub bbox: BBoxXYXY<Pixel>,

    pub split: Split,
}

impl RawAnnotation {
    pub fn new(
        image_ref: impl Into<String>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBoxXYXY<Pixel>,
        split: Split,
    ) -> Self {
        Self {
            image_ref: image_ref.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox,
            split,
        }
    }
}

/// Every annotation of one image, in source order.
///
/// Never empty, and every member shares the group's `image_ref` and `split`.
/// Pixel dimensions and image bytes are resolved later, at encode time, through
/// an [`ImageSource`](crate::source::ImageSource).
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationGroup {
    image_ref: String,
    split: Split,
    annotations: Vec<RawAnnotation>,
}

impl AnnotationGroup {
    /// Starts a group from its first annotation.
    pub fn new(first: RawAnnotation) -> Self {
        Self {
            image_ref: first.image_ref.clone(),
            split: first.split,
            annotations: vec![first],
        }
    }

    /// Builds a group from a list, or `None` if the list is empty or mixes
    /// images or splits.
    pub fn from_annotations(annotations: Vec<RawAnnotation>) -> Option<Self> {
        let first = annotations.first()?;
        let (image_ref, split) = (first.image_ref.clone(), first.split);
        if annotations
            .iter()
            .any(|ann| ann.image_ref != image_ref || ann.split != split)
        {
            return None;
        }
        Some(Self {
            image_ref,
            split,
            annotations,
        })
    }

    /// Appends a member. The caller guarantees the image and split match.
    pub(crate) fn push(&mut self, annotation: RawAnnotation) {
        debug_assert_eq!(annotation.image_ref, self.image_ref);
        debug_assert_eq!(annotation.split, self.split);
        self.annotations.push(annotation);
    }

    pub fn image_ref(&self) -> &str {
        &self.image_ref
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn annotations(&self) -> &[RawAnnotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Base file name of the image, written to `image/filename`.
    pub fn file_name(&self) -> String {
        Path::new(&self.image_ref)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_ref.clone())
    }
}
