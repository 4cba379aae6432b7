//! Axis-aligned boxes in XYXY order, tagged with their coordinate space.

use std::marker::PhantomData;

use super::{Normalized, Pixel};

/// An axis-aligned bounding box stored as `(xmin, ymin, xmax, ymax)`.
///
/// Construction never rejects a box: a COCO file can carry negative widths or
/// boxes hanging off the image, and those must reach the record encoder intact
/// so it can report them against the offending image.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a box from explicit corner coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    /// Creates a box from a top-left corner plus extent, the layout COCO uses.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// Width of the box. Negative when the box is malformed.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height of the box. Negative when the box is malformed.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns true if no coordinate is NaN or infinite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }

    /// Returns true if `xmin <= xmax` and `ymin <= ymax`.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    /// The four coordinates labelled with their wire names.
    pub fn named_coords(&self) -> [(&'static str, f64); 4] {
        [
            ("xmin", self.xmin),
            ("ymin", self.ymin),
            ("xmax", self.xmax),
            ("ymax", self.ymax),
        ]
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}

impl BBoxXYXY<Pixel> {
    /// Divides each coordinate by the matching image dimension.
    pub fn to_normalized(&self, image_width: u32, image_height: u32) -> BBoxXYXY<Normalized> {
        let w = f64::from(image_width);
        let h = f64::from(image_height);
        BBoxXYXY::from_xyxy(self.xmin / w, self.ymin / h, self.xmax / w, self.ymax / h)
    }
}

impl BBoxXYXY<Normalized> {
    /// Returns the first coordinate that falls outside `[0.0, 1.0]`.
    ///
    /// Both bounds are inclusive. NaN is never inside the range.
    pub fn first_out_of_range(&self) -> Option<(&'static str, f64)> {
        self.named_coords()
            .into_iter()
            .find(|(_, value)| !(0.0..=1.0).contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_xywh_computes_max_corner() {
        let bbox: BBoxXYXY<Pixel> = BBoxXYXY::from_xywh(10.0, 20.0, 30.0, 40.0);
        assert_eq!(bbox.xmax(), 40.0);
        assert_eq!(bbox.ymax(), 60.0);
        assert_eq!(bbox.width(), 30.0);
        assert_eq!(bbox.height(), 40.0);
    }

    #[test]
    fn test_to_normalized_divides_per_axis() {
        let bbox: BBoxXYXY<Pixel> = BBoxXYXY::from_xywh(10.0, 20.0, 30.0, 40.0);
        let norm = bbox.to_normalized(100, 200);
        assert!((norm.xmin() - 0.10).abs() < 1e-12);
        assert!((norm.ymin() - 0.10).abs() < 1e-12);
        assert!((norm.xmax() - 0.40).abs() < 1e-12);
        assert!((norm.ymax() - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_range_check_is_inclusive() {
        let edge: BBoxXYXY<Normalized> = BBoxXYXY::from_xyxy(0.0, 0.0, 1.0, 1.0);
        assert_eq!(edge.first_out_of_range(), None);

        let over: BBoxXYXY<Normalized> = BBoxXYXY::from_xyxy(0.0, 0.0, 1.05, 1.0);
        assert_eq!(over.first_out_of_range(), Some(("xmax", 1.05)));

        let under: BBoxXYXY<Normalized> = BBoxXYXY::from_xyxy(0.0, -0.01, 0.5, 0.5);
        assert_eq!(under.first_out_of_range(), Some(("ymin", -0.01)));
    }

    #[test]
    fn test_nan_is_out_of_range() {
        let nan: BBoxXYXY<Normalized> = BBoxXYXY::from_xyxy(f64::NAN, 0.0, 0.5, 0.5);
        let (name, _) = nan.first_out_of_range().expect("NaN must be rejected");
        assert_eq!(name, "xmin");
        assert!(!nan.is_finite());
    }

    #[test]
    fn test_ordering() {
        let ordered: BBoxXYXY<Pixel> = BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 80.0);
        assert!(ordered.is_ordered());

        let flipped: BBoxXYXY<Pixel> = BBoxXYXY::from_xywh(10.0, 20.0, -5.0, 10.0);
        assert!(!flipped.is_ordered());
    }
}
