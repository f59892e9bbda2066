//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, cover_crop, and contact_sheet. All of them work on
//! in-memory encoded bytes, so the same backend serves local files and
//! downloaded remote images.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{CropParams, SheetParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Invalid crop target {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Read pixel dimensions from the image header.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Scale-to-cover, crop-to-center, encode as JPEG.
    fn cover_crop(&self, source: &[u8], params: &CropParams) -> Result<Vec<u8>, BackendError>;

    /// Compose pre-cropped tiles into one JPEG grid.
    fn contact_sheet(&self, params: &SheetParams) -> Result<Vec<u8>, BackendError>;
}
