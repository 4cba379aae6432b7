//! Fuzz target for COCO instances parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use shardlabel::group::group_by_image;
use shardlabel::ir::io_coco_json::from_coco_slice;
use shardlabel::ir::Split;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for JSON annotation files.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(annotations) = from_coco_slice(data, Path::new("images"), Split::Train) {
        let total = annotations.len();
        let groups = group_by_image(annotations);
        assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), total);
    }
});
