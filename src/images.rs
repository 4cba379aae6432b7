//! Filesystem-backed [`ImageSource`].
//!
//! Image references are plain paths. Hidden files (`.DS_Store` and friends),
//! directories and files without a raster image extension are reported as
//! non-images, which makes the encoder skip their group. Everything else is
//! loaded and, by default, re-encoded as RGB JPEG.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};

use crate::error::ShardlabelError;
use crate::source::{ImageSource, LoadedImage};

/// Extensions treated as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// Default JPEG quality for re-encoded images.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// How image bytes are put into records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCodec {
    /// Decode, convert to 8-bit RGB and re-encode as JPEG.
    #[default]
    Jpeg,
    /// Store the file bytes unchanged; dimensions come from the header.
    Passthrough,
}

impl ImageCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageCodec::Jpeg => "jpeg",
            ImageCodec::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for ImageCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" | "jpg" => Ok(ImageCodec::Jpeg),
            "passthrough" => Ok(ImageCodec::Passthrough),
            other => Err(format!(
                "unknown image codec '{other}' (expected 'jpeg' or 'passthrough')"
            )),
        }
    }
}

/// Loads images from the local filesystem.
#[derive(Clone, Debug)]
pub struct FsImageSource {
    codec: ImageCodec,
    jpeg_quality: u8,
}

impl Default for FsImageSource {
    fn default() -> Self {
        Self::new(ImageCodec::default())
    }
}

impl FsImageSource {
    pub fn new(codec: ImageCodec) -> Self {
        Self {
            codec,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Sets the JPEG quality (1..=100) used when re-encoding.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn codec(&self) -> ImageCodec {
        self.codec
    }

    fn reencode_jpeg(&self, path: &Path, bytes: &[u8]) -> Result<LoadedImage, ShardlabelError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| ShardlabelError::ImageUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let rgb = decoded.to_rgb8();

        let mut encoded = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality);
        rgb.write_with_encoder(encoder)
            .map_err(|source| ShardlabelError::ImageEncode {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(LoadedImage {
            width: rgb.width(),
            height: rgb.height(),
            encoded,
        })
    }

    fn passthrough(&self, path: &Path, bytes: Vec<u8>) -> Result<LoadedImage, ShardlabelError> {
        let unreadable = |message: String| ShardlabelError::ImageUnreadable {
            path: path.to_path_buf(),
            message,
        };
        let size = imagesize::blob_size(&bytes).map_err(|e| unreadable(e.to_string()))?;
        let width = u32::try_from(size.width).map_err(|_| unreadable(format!("width {} too large", size.width)))?;
        let height = u32::try_from(size.height).map_err(|_| unreadable(format!("height {} too large", size.height)))?;
        Ok(LoadedImage {
            width,
            height,
            encoded: bytes,
        })
    }
}

impl ImageSource for FsImageSource {
    fn is_image(&self, image_ref: &str) -> bool {
        let path = Path::new(image_ref);
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') || path.is_dir() {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn load(&self, image_ref: &str) -> Result<LoadedImage, ShardlabelError> {
        let path = Path::new(image_ref);
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShardlabelError::ImageNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ShardlabelError::ImageUnreadable {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        match self.codec {
            ImageCodec::Jpeg => self.reencode_jpeg(path, &bytes),
            ImageCodec::Passthrough => self.passthrough(path, bytes),
        }
    }
}
