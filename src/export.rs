//! Batch export: cover-crop every previewed image into a directory.
//!
//! Loading is async (remote items go over HTTP); cropping and encoding run in
//! parallel on the global rayon pool, sized by `processing.max_processes`.
//! Output names follow [`naming::export_file_name`](crate::naming::export_file_name),
//! so files sort in preview order.
//!
//! A source that fails to load or decode is reported and skipped; the rest
//! of the batch still completes. Failing to write an output file aborts.

use crate::collection::ImageItem;
use crate::imaging::{self, BackendError, Dimensions, ImageBackend, Quality};
use crate::naming::export_file_name;
use crate::probe::{Fetcher, ProbeError};
use futures_util::future::join_all;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Progress reported while exporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Started { total: usize, crop: Dimensions },
    Written {
        /// 1-based position in the preview.
        index: usize,
        source: String,
        file: PathBuf,
    },
    Skipped {
        index: usize,
        source: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Written files in preview order.
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// Fetch the full bytes of every item, in order.
pub async fn load_sources(
    fetcher: &Fetcher,
    items: &[ImageItem],
) -> Vec<Result<Vec<u8>, ProbeError>> {
    join_all(items.iter().map(|item| async move {
        let source = item.image_source();
        fetcher.fetch(&source).await
    }))
    .await
}

/// Cover-crop each source in parallel. Output order matches input order.
pub fn crop_all(
    backend: &impl ImageBackend,
    sources: &[Vec<u8>],
    crop: Dimensions,
    quality: Quality,
) -> Vec<Result<Vec<u8>, BackendError>> {
    sources
        .par_iter()
        .map(|bytes| imaging::crop_to_cover(backend, bytes, crop, quality))
        .collect()
}

fn item_label(item: &ImageItem) -> String {
    match &item.source {
        Some(file) => file.path.display().to_string(),
        None => item.display_url.clone(),
    }
}

fn emit(events: Option<&Sender<ExportEvent>>, event: ExportEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Crop loaded sources and write them into `out_dir`.
///
/// `sources[i]` holds the bytes of `items[i]`, as returned by [`load_sources`].
pub fn export_items(
    backend: &impl ImageBackend,
    items: &[ImageItem],
    sources: Vec<Result<Vec<u8>, ProbeError>>,
    crop: Dimensions,
    quality: Quality,
    out_dir: &Path,
    events: Option<Sender<ExportEvent>>,
) -> Result<ExportSummary, ExportError> {
    std::fs::create_dir_all(out_dir)?;
    let events = events.as_ref();
    emit(
        events,
        ExportEvent::Started {
            total: items.len(),
            crop,
        },
    );

    let results: Vec<Option<PathBuf>> = items
        .par_iter()
        .zip(sources.into_par_iter())
        .enumerate()
        .map(|(i, (item, source))| -> Result<Option<PathBuf>, ExportError> {
            let index = i + 1;
            let label = item_label(item);
            let encoded = match source {
                Ok(bytes) => imaging::crop_to_cover(backend, &bytes, crop, quality)
                    .map_err(|e| e.to_string()),
                Err(err) => Err(err.to_string()),
            };
            match encoded {
                Ok(jpeg) => {
                    let file = out_dir.join(export_file_name(index, crop, &jpeg));
                    std::fs::write(&file, &jpeg)?;
                    emit(
                        events,
                        ExportEvent::Written {
                            index,
                            source: label,
                            file: file.clone(),
                        },
                    );
                    Ok(Some(file))
                }
                Err(reason) => {
                    emit(
                        events,
                        ExportEvent::Skipped {
                            index,
                            source: label,
                            reason,
                        },
                    );
                    Ok(None)
                }
            }
        })
        .collect::<Result<_, _>>()?;

    let skipped = results.iter().filter(|r| r.is_none()).count();
    Ok(ExportSummary {
        written: results.into_iter().flatten().collect(),
        skipped,
    })
}
