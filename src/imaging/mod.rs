//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` on in-memory bytes |
//! | **Cover crop → JPEG** | `crop_imm` + Lanczos3 `resize_exact` + `JpegEncoder` |
//! | **Contact sheet** | `imageops::overlay` onto a white canvas |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for cover-crop geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{CoverRect, calculate_cover_rect, min_dimensions};
pub use operations::{crop_to_cover, get_dimensions, plan_crop, render_contact_sheet};
pub use params::{CropParams, Quality, SheetParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
