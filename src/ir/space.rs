//! Coordinate space markers.
//!
//! Zero-sized types used as the `TSpace` parameter of
//! [`BBoxXYXY`](super::BBoxXYXY) so a box measured in pixels can never be
//! written to a shard where a normalized box is expected.

use std::fmt;

/// Absolute pixel units, origin at the top-left corner of the image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Fractions of the image width/height. Valid boxes lie in `[0.0, 1.0]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
