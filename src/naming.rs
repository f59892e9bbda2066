//! File naming for exported and published images.
//!
//! Two conventions:
//! - **Export files** are positional: `NNN-<w>x<h>-<hash8>.jpg`, so a directory
//!   listing follows the preview order and a re-export of identical pixels
//!   lands on the same name.
//! - **Published files** are content-addressed: `<hash16>.<ext>`. Uploading the
//!   same bytes twice targets the same remote path.
//!
//! Remote paths are always `/`-joined with duplicate slashes collapsed.

use crate::imaging::Dimensions;
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Content-addressed name: first 16 hex chars of the hash plus `ext`.
///
/// `ext` is lowercased; a leading dot is tolerated.
pub fn content_file_name(bytes: &[u8], ext: &str) -> String {
    let hash = content_hash(bytes);
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() {
        hash[..16].to_string()
    } else {
        format!("{}.{}", &hash[..16], ext)
    }
}

/// Export file name for the `index`-th (1-based) cropped image.
pub fn export_file_name(index: usize, dims: Dimensions, bytes: &[u8]) -> String {
    format!(
        "{:0>3}-{}x{}-{}.jpg",
        index,
        dims.width,
        dims.height,
        &content_hash(bytes)[..8]
    )
}

/// Join a path prefix and a file name into a repository path.
///
/// Leading, trailing and repeated slashes are collapsed, so `"2024//05/"` and
/// `"/a.jpg"` join to `"2024/05/a.jpg"`.
pub fn join_remote_path(prefix: &str, name: &str) -> String {
    prefix
        .split('/')
        .chain(name.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
