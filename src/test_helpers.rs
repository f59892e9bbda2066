//! Shared test utilities for the gridcrop test suite.
//!
//! Synthetic images are generated in memory with the `image` crate so tests
//! never depend on fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_png(tmp.path(), "wide.png", 400, 200);
//! let bytes = test_png(100, 100);
//! ```

use image::{ImageEncoder, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// Encode a gradient PNG of the given size.
pub fn test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Write a gradient PNG into `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, test_png(width, height)).unwrap();
    path
}
