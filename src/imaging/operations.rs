//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{CropParams, Quality, SheetParams};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, bytes: &[u8]) -> Result<Dimensions> {
    backend.identify(bytes)
}

/// Plan a cover crop without executing it.
pub fn plan_crop(target: Dimensions, quality: Quality) -> CropParams {
    CropParams {
        width: target.width,
        height: target.height,
        quality,
    }
}

/// Cover-crop encoded `source` bytes to exactly `target`, returning JPEG bytes.
pub fn crop_to_cover(
    backend: &impl ImageBackend,
    source: &[u8],
    target: Dimensions,
    quality: Quality,
) -> Result<Vec<u8>> {
    backend.cover_crop(source, &plan_crop(target, quality))
}

/// Compose tiles already cropped to `cell` into a grid sheet.
///
/// `rows` is a minimum; extra tiles flow into additional rows the way CSS grid
/// adds implicit rows.
pub fn render_contact_sheet(
    backend: &impl ImageBackend,
    tiles: Vec<Vec<u8>>,
    columns: u32,
    rows: u32,
    cell: Dimensions,
    gap: u32,
) -> Result<Vec<u8>> {
    let params = plan_sheet(tiles, columns, rows, cell, gap);
    backend.contact_sheet(&params)
}

fn plan_sheet(
    tiles: Vec<Vec<u8>>,
    columns: u32,
    rows: u32,
    cell: Dimensions,
    gap: u32,
) -> SheetParams {
    let columns = columns.max(1);
    let needed = (tiles.len() as u32).div_ceil(columns);
    SheetParams {
        columns,
        rows: rows.max(needed).max(1),
        cell_width: cell.width,
        cell_height: cell.height,
        gap,
        quality: Quality::default(),
        tiles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::with_dimensions(vec![Dimensions::new(1920, 1080)]);

        let dims = get_dimensions(&backend, b"jpeg").unwrap();
        assert_eq!(dims, Dimensions::new(1920, 1080));
    }

    #[test]
    fn plan_crop_copies_target() {
        let params = plan_crop(Dimensions::new(100, 50), Quality::new(80));
        assert_eq!(params.width, 100);
        assert_eq!(params.height, 50);
        assert_eq!(params.quality.value(), 80);
    }

    #[test]
    fn crop_to_cover_uses_backend() {
        let backend = MockBackend::new();

        let out =
            crop_to_cover(&backend, b"src", Dimensions::new(224, 224), Quality::default()).unwrap();
        assert_eq!(out, b"224x224");

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::CoverCrop {
                width: 224,
                height: 224,
                quality: 92,
                ..
            }
        ));
    }

    #[test]
    fn sheet_grows_rows_for_overflow() {
        let tiles = vec![Vec::new(); 7];
        let params = plan_sheet(tiles, 3, 1, Dimensions::new(10, 10), 6);
        assert_eq!(params.rows, 3);
    }

    #[test]
    fn sheet_keeps_requested_rows_when_larger() {
        let params = plan_sheet(vec![Vec::new(); 2], 3, 4, Dimensions::new(10, 10), 6);
        assert_eq!(params.rows, 4);
    }

    #[test]
    fn sheet_with_no_tiles_has_one_row() {
        let params = plan_sheet(Vec::new(), 0, 0, Dimensions::new(10, 10), 6);
        assert_eq!((params.columns, params.rows), (1, 1));
    }

    #[test]
    fn render_contact_sheet_uses_backend() {
        let backend = MockBackend::new();
        render_contact_sheet(
            &backend,
            vec![b"a".to_vec(), b"b".to_vec()],
            3,
            0,
            Dimensions::new(10, 10),
            6,
        )
        .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::ContactSheet {
                columns: 3,
                rows: 1,
                tiles: 2
            }]
        );
    }
}
