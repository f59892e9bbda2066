//! Center-crop encoder: load a source, cover-crop it, return JPEG bytes.
//!
//! The geometry lives in [`imaging::calculate_cover_rect`](crate::imaging::calculate_cover_rect);
//! this module only glues a [`Fetcher`] to an [`ImageBackend`]. The fetched
//! buffer is dropped before returning on every path.

use crate::imaging::{self, BackendError, Dimensions, ImageBackend, Quality};
use crate::probe::{Fetcher, ImageSource, ProbeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("Failed to load source: {0}")]
    Load(#[from] ProbeError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Load `source` and cover-crop it to `target`.
pub async fn crop_to_cover(
    fetcher: &Fetcher,
    backend: &impl ImageBackend,
    source: &ImageSource,
    target: Dimensions,
    quality: Quality,
) -> Result<Vec<u8>, CropError> {
    let bytes = fetcher.fetch(source).await?;
    Ok(imaging::crop_to_cover(backend, &bytes, target, quality)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::test_helpers::write_png;
    use tempfile::TempDir;

    #[tokio::test]
    async fn crops_local_file_to_target() {
        let tmp = TempDir::new().unwrap();
        let path = write_png(tmp.path(), "wide.png", 400, 200);
        let backend = RustBackend::new();

        let out = crop_to_cover(
            &Fetcher::new(),
            &backend,
            &ImageSource::Local(path),
            Dimensions::new(100, 100),
            Quality::default(),
        )
        .await
        .unwrap();

        assert_eq!(backend.identify(&out).unwrap(), Dimensions::new(100, 100));
    }

    #[tokio::test]
    async fn missing_source_is_load_error() {
        let result = crop_to_cover(
            &Fetcher::new(),
            &RustBackend::new(),
            &ImageSource::Local("/nonexistent/a.png".into()),
            Dimensions::new(10, 10),
            Quality::default(),
        )
        .await;
        assert!(matches!(result, Err(CropError::Load(_))));
    }

    #[tokio::test]
    async fn corrupt_source_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"\xff\xd8 truncated").unwrap();

        let result = crop_to_cover(
            &Fetcher::new(),
            &RustBackend::new(),
            &ImageSource::Local(path),
            Dimensions::new(10, 10),
            Quality::default(),
        )
        .await;
        assert!(matches!(
            result,
            Err(CropError::Backend(BackendError::Decode(_)))
        ));
    }
}
