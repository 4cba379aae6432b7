#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

pub const IMAGE_WIDTH: u32 = 8;
pub const IMAGE_HEIGHT: u32 = 6;

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// One COCO annotation entry: `(image_id, category_id, [x, y, w, h])`.
pub type CocoEntry = (u64, u64, [f64; 4]);

/// A COCO-style split laid out in a temporary directory.
pub struct CocoFixture {
    pub dir: TempDir,
    pub annotations: PathBuf,
    pub images: PathBuf,
    pub output: PathBuf,
}

impl CocoFixture {
    /// Writes `entries` as an instances file and one BMP per distinct image
    /// id, stored under the COCO `<id:012>.jpg` name.
    pub fn new(entries: &[CocoEntry]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let annotations = dir.path().join("instances.json");
        let images = dir.path().join("images");
        let output = dir.path().join("shards");
        fs::create_dir_all(&images).expect("create image dir");

        for (image_id, _, _) in entries {
            let path = images.join(format!("{image_id:012}.jpg"));
            if !path.exists() {
                write_bmp(&path, IMAGE_WIDTH, IMAGE_HEIGHT);
            }
        }
        write_instances(&annotations, entries);

        Self {
            dir,
            annotations,
            images,
            output,
        }
    }

    /// `image_count` images with `per_image` valid boxes each.
    pub fn uniform(image_count: u64, per_image: u64) -> Self {
        Self::new(&uniform_entries(image_count, per_image))
    }
}

pub fn uniform_entries(image_count: u64, per_image: u64) -> Vec<CocoEntry> {
    let mut entries = Vec::new();
    for image_id in 1..=image_count {
        for k in 0..per_image {
            entries.push((image_id, 1 + k % 3, [1.0, 1.0, 4.0, 3.0]));
        }
    }
    entries
}

pub fn write_instances(path: &Path, entries: &[CocoEntry]) {
    let annotations: Vec<_> = entries
        .iter()
        .enumerate()
        .map(|(id, (image_id, category_id, bbox))| {
            json!({
                "id": id + 1,
                "image_id": image_id,
                "category_id": category_id,
                "bbox": bbox,
            })
        })
        .collect();
    let doc = json!({ "images": [], "categories": [], "annotations": annotations });
    fs::write(path, serde_json::to_vec_pretty(&doc).expect("serialize coco")).expect("write coco");
}

/// Shard files in `dir`, sorted by name.
pub fn shard_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "tfrecord"))
        .collect();
    files.sort();
    files
}
