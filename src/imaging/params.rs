//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the [`backend`](super::backend) that does the pixel work, so a mock
//! backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 92). Clamped on construction.
//! - [`CropParams`]: Target size and quality for a cover crop.
//! - [`SheetParams`]: Grid geometry and pre-cropped tiles for a contact sheet.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    /// Matches the 0.92 canvas encoder default.
    fn default() -> Self {
        Self(92)
    }
}

/// Parameters for a cover crop: scale to cover `width × height`, crop the overflow
/// symmetrically, encode as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Parameters for rendering a contact sheet.
///
/// Tiles are encoded images already cropped to `cell_width × cell_height`;
/// they are placed row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetParams {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub gap: u32,
    pub quality: Quality,
    pub tiles: Vec<Vec<u8>>,
}

impl SheetParams {
    /// Total canvas size including gaps between (not around) cells.
    ///
    /// `None` if either side does not fit in `u32`.
    pub fn canvas_dimensions(&self) -> Option<(u32, u32)> {
        let span = |count: u32, cell: u32| {
            count
                .checked_mul(cell)?
                .checked_add(count.saturating_sub(1).checked_mul(self.gap)?)
        };
        Some((
            span(self.columns, self.cell_width)?,
            span(self.rows, self.cell_height)?,
        ))
    }

    /// Top-left corner of the tile at `index`, `None` on overflow.
    pub fn cell_origin(&self, index: usize) -> Option<(u32, u32)> {
        let columns = self.columns.max(1) as usize;
        let col = u32::try_from(index % columns).ok()?;
        let row = u32::try_from(index / columns).ok()?;
        Some((
            col.checked_mul(self.cell_width.checked_add(self.gap)?)?,
            row.checked_mul(self.cell_height.checked_add(self.gap)?)?,
        ))
    }
}
