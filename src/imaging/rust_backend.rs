//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image` crate decoders, format guessed from content |
//! | Cover crop | `DynamicImage::crop_imm` + `resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |
//! | Contact sheet | `image::imageops::overlay` onto an `RgbImage` canvas |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_cover_rect;
use super::params::{CropParams, Quality, SheetParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::LazyLock;
use tracing::debug;

/// Extensions mapped to the decoders compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Background behind contact-sheet gaps.
const SHEET_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)
}

/// Decode an in-memory image, guessing the format from its magic bytes.
fn decode(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    reader(bytes)?
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Encode as baseline JPEG. Alpha is dropped; JPEG has no alpha channel.
fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.value())
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(buf)
}

fn cover(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let natural = (img.width(), img.height());
    let rect = calculate_cover_rect(natural, (width, height));
    let (x, y, w, h) = rect.to_pixels(natural);
    debug!(
        natural_w = natural.0,
        natural_h = natural.1,
        x,
        y,
        w,
        h,
        scale = rect.scale,
        "Cover crop window"
    );
    img.crop_imm(x, y, w, h)
        .resize_exact(width, height, FilterType::Lanczos3)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        Ok(Dimensions { width, height })
    }

    fn cover_crop(&self, source: &[u8], params: &CropParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::InvalidTarget {
                width: params.width,
                height: params.height,
            });
        }
        let img = decode(source)?;
        let cropped = cover(&img, params.width, params.height);
        encode_jpeg(&cropped, params.quality)
    }

    fn contact_sheet(&self, params: &SheetParams) -> Result<Vec<u8>, BackendError> {
        if params.cell_width == 0 || params.cell_height == 0 {
            return Err(BackendError::InvalidTarget {
                width: params.cell_width,
                height: params.cell_height,
            });
        }
        let too_large = || BackendError::InvalidTarget {
            width: params.cell_width,
            height: params.cell_height,
        };
        let (canvas_w, canvas_h) = params.canvas_dimensions().ok_or_else(too_large)?;
        let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, SHEET_BACKGROUND);

        for (index, tile) in params.tiles.iter().enumerate() {
            let img = decode(tile)?;
            // Tiles should already match the cell; re-cover anything that doesn't.
            let img = if (img.width(), img.height()) == (params.cell_width, params.cell_height) {
                img
            } else {
                cover(&img, params.cell_width, params.cell_height)
            };
            let (x, y) = params.cell_origin(index).ok_or_else(too_large)?;
            image::imageops::overlay(&mut canvas, &img.to_rgb8(), x as i64, y as i64);
        }

        encode_jpeg(&DynamicImage::ImageRgb8(canvas), params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_png;
    use image::ImageEncoder;

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = super::supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp", "gif"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    fn params(width: u32, height: u32) -> CropParams {
        CropParams {
            width,
            height,
            quality: Quality::default(),
        }
    }

    #[test]
    fn identify_synthetic_png() {
        let backend = RustBackend::new();
        let dims = backend.identify(&test_png(200, 150)).unwrap();
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn identify_garbage_errors() {
        let backend = RustBackend::new();
        assert!(backend.identify(b"<html>not an image</html>").is_err());
    }

    #[test]
    fn cover_crop_produces_exact_target_jpeg() {
        let backend = RustBackend::new();
        let out = backend.cover_crop(&test_png(400, 200), &params(100, 100)).unwrap();

        let format = image::guess_format(&out).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!(backend.identify(&out).unwrap(), Dimensions::new(100, 100));
    }

    #[test]
    fn cover_crop_samples_center_window() {
        // Left half black, right half white; a centered square must contain both.
        let img = RgbImage::from_fn(400, 200, |x, _| {
            if x < 200 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let mut src = Vec::new();
        image::codecs::png::PngEncoder::new(&mut src)
            .write_image(img.as_raw(), 400, 200, image::ExtendedColorType::Rgb8)
            .unwrap();

        let backend = RustBackend::new();
        let out = backend.cover_crop(&src, &params(100, 100)).unwrap();
        let decoded = decode(&out).unwrap().to_rgb8();

        assert!(decoded.get_pixel(10, 50)[0] < 64);
        assert!(decoded.get_pixel(90, 50)[0] > 192);
    }

    #[test]
    fn cover_crop_rejects_zero_target() {
        let backend = RustBackend::new();
        let result = backend.cover_crop(&test_png(10, 10), &params(0, 10));
        assert!(matches!(
            result,
            Err(BackendError::InvalidTarget {
                width: 0,
                height: 10
            })
        ));
    }

    #[test]
    fn cover_crop_undecodable_source_is_decode_error() {
        let backend = RustBackend::new();
        let result = backend.cover_crop(b"nope", &params(10, 10));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn contact_sheet_lays_out_tiles() {
        let backend = RustBackend::new();
        let tile = backend.cover_crop(&test_png(64, 64), &params(40, 20)).unwrap();
        let sheet = SheetParams {
            columns: 2,
            rows: 2,
            cell_width: 40,
            cell_height: 20,
            gap: 6,
            quality: Quality::default(),
            tiles: vec![tile.clone(), tile.clone(), tile],
        };

        let out = backend.contact_sheet(&sheet).unwrap();
        assert_eq!(backend.identify(&out).unwrap(), Dimensions::new(86, 46));

        // The empty fourth cell stays background.
        let decoded = decode(&out).unwrap().to_rgb8();
        assert!(decoded.get_pixel(70, 40)[0] > 240);
    }

    #[test]
    fn contact_sheet_rejects_overflowing_canvas() {
        let backend = RustBackend::new();
        let sheet = SheetParams {
            columns: 12,
            rows: 1,
            cell_width: 400_000_000,
            cell_height: 10,
            gap: 6,
            quality: Quality::default(),
            tiles: Vec::new(),
        };

        assert!(matches!(
            backend.contact_sheet(&sheet),
            Err(BackendError::InvalidTarget {
                width: 400_000_000,
                height: 10
            })
        ));
    }
}
