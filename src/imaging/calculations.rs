//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Source sampling rectangle for a cover crop.
///
/// `scale` maps source pixels to target pixels. The rectangle is expressed in
/// source coordinates and is centered on the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverRect {
    pub scale: f64,
    pub src_x: f64,
    pub src_y: f64,
    pub src_w: f64,
    pub src_h: f64,
}

impl CoverRect {
    /// Round the rectangle to whole pixels inside the source bounds.
    ///
    /// Returns `(x, y, width, height)`; width and height are at least 1.
    pub fn to_pixels(&self, natural: (u32, u32)) -> (u32, u32, u32, u32) {
        let (nat_w, nat_h) = natural;
        let w = (self.src_w.round() as u32).clamp(1, nat_w.max(1));
        let h = (self.src_h.round() as u32).clamp(1, nat_h.max(1));
        let x = (self.src_x.max(0.0).round() as u32).min(nat_w.saturating_sub(w));
        let y = (self.src_y.max(0.0).round() as u32).min(nat_h.saturating_sub(h));
        (x, y, w, h)
    }
}

/// Calculate the centered sampling rectangle that, scaled by
/// `max(target_w / natural_w, target_h / natural_h)`, exactly covers the target.
///
/// # Arguments
/// * `natural` - Source image dimensions (width, height)
/// * `target` - Output dimensions (width, height), both non-zero
///
/// # Examples
/// ```
/// # use gridcrop::imaging::calculate_cover_rect;
/// // 400x200 → 100x100: scale 0.5, centered 200x200 window at x=100
/// let rect = calculate_cover_rect((400, 200), (100, 100));
/// assert_eq!(rect.to_pixels((400, 200)), (100, 0, 200, 200));
/// ```
pub fn calculate_cover_rect(natural: (u32, u32), target: (u32, u32)) -> CoverRect {
    let (nat_w, nat_h) = (natural.0 as f64, natural.1 as f64);
    let (tgt_w, tgt_h) = (target.0 as f64, target.1 as f64);

    let scale = (tgt_w / nat_w).max(tgt_h / nat_h);
    let src_w = tgt_w / scale;
    let src_h = tgt_h / scale;

    CoverRect {
        scale,
        src_x: (nat_w - src_w) / 2.0,
        src_y: (nat_h - src_h) / 2.0,
        src_w,
        src_h,
    }
}

/// Component-wise minimum over a set of dimensions.
///
/// Returns `None` for an empty input.
pub fn min_dimensions(dims: impl IntoIterator<Item = (u32, u32)>) -> Option<(u32, u32)> {
    dims.into_iter()
        .reduce(|(min_w, min_h), (w, h)| (min_w.min(w), min_h.min(h)))
}
