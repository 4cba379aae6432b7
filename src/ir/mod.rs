//! Typed annotation model for shardlabel.
//!
//! Annotations enter the pipeline as [`RawAnnotation`]s holding pixel boxes
//! and leave it as normalized boxes inside serialized records. The coordinate
//! space is carried in the type, so a [`BBoxXYXY<Pixel>`] cannot be written
//! where a [`BBoxXYXY<Normalized>`] is expected.
//!
//! # Example
//!
//! ```
//! use shardlabel::ir::{AnnotationGroup, BBoxXYXY, Pixel, RawAnnotation, Split};
//!
//! let ann = RawAnnotation::new(
//!     "train2017/000000000139.jpg",
//!     139u64,
//!     1u64,
//!     BBoxXYXY::<Pixel>::from_xywh(10.0, 20.0, 30.0, 40.0),
//!     Split::Train,
//! );
//! let group = AnnotationGroup::new(ann);
//! assert_eq!(group.file_name(), "000000000139.jpg");
//! ```

mod bbox;
mod ids;
pub mod io_coco_json;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use ids::{CategoryId, ImageId};
pub use model::{AnnotationGroup, RawAnnotation, Split};
pub use space::{Normalized, Pixel};

/// A bounding box expressed as fractions of the image dimensions.
pub type NormalizedBox = BBoxXYXY<Normalized>;
