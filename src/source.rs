//! Collaborator interfaces the pipeline reads its inputs through.
//!
//! Both traits are shared read-only by every shard worker, so implementations
//! must be `Send + Sync` and must not rely on interior mutation for
//! correctness.

use crate::error::ShardlabelError;
use crate::ir::{RawAnnotation, Split};

/// Supplies the flat annotation list for a split.
pub trait AnnotationSource: Send + Sync {
    /// Returns every annotation of `split`, in source order.
    fn load(&self, split: Split) -> Result<Vec<RawAnnotation>, ShardlabelError>;
}

/// An image ready to be embedded in a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    /// Pixel width of the source image.
    pub width: u32,
    /// Pixel height of the source image.
    pub height: u32,
    /// Encoded payload written to `image/encoded`.
    pub encoded: Vec<u8>,
}

/// Resolves image references to pixel dimensions and encoded bytes.
pub trait ImageSource: Send + Sync {
    /// Returns false for references that name something other than an image,
    /// such as `.DS_Store` entries. Those groups are skipped, not failed.
    fn is_image(&self, image_ref: &str) -> bool;

    /// Loads the image behind `image_ref`.
    ///
    /// # Errors
    /// [`ShardlabelError::ImageNotFound`] if nothing exists at the reference,
    /// [`ShardlabelError::ImageUnreadable`] if it cannot be decoded.
    fn load(&self, image_ref: &str) -> Result<LoadedImage, ShardlabelError>;
}

impl<T: AnnotationSource + ?Sized> AnnotationSource for &T {
    fn load(&self, split: Split) -> Result<Vec<RawAnnotation>, ShardlabelError> {
        (**self).load(split)
    }
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn is_image(&self, image_ref: &str) -> bool {
        (**self).is_image(image_ref)
    }

    fn load(&self, image_ref: &str) -> Result<LoadedImage, ShardlabelError> {
        (**self).load(image_ref)
    }
}
