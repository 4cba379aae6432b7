#![allow(dead_code)]

use shardlabel::ir::{BBoxXYXY, CategoryId, ImageId, Pixel, RawAnnotation, Split};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBoxXYXY<Pixel>> {
    let w = width as f64;
    let h = height as f64;
    (0.0..w, 0.0..h, 0.0..w, 0.0..h)
        .prop_map(|(x1, y1, x2, y2)| {
            BBoxXYXY::<Pixel>::from_xyxy(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
        })
        .boxed()
}

/// Annotations drawn from a pool of `max_images` image ids, in arbitrary
/// interleaved order.
pub fn arb_annotations(max_images: u64, max_annotations: usize) -> BoxedStrategy<Vec<RawAnnotation>> {
    prop::collection::vec(
        (1..=max_images, 1u64..=90, arb_bbox_within(640, 480)),
        0..=max_annotations,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(image_id, category_id, bbox)| {
                RawAnnotation::new(
                    format!("train2017/{image_id:012}.jpg"),
                    ImageId::new(image_id),
                    CategoryId::new(category_id),
                    bbox,
                    Split::Train,
                )
            })
            .collect()
    })
    .boxed()
}
