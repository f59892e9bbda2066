//! Dimension probing for local files and remote URLs.
//!
//! A probe answers one question: how large is this image? Local files are
//! read into a transient buffer and only the header is parsed; remote URLs
//! are downloaded with `reqwest` and parsed the same way. The buffer is
//! dropped when the probe returns, on success and on failure alike.
//!
//! Probes never retry. Callers decide the fallback: the collection manager
//! drops local files that fail and keeps placeholder dimensions for remote
//! images that fail.
//!
//! [`Fetcher`] is also the loader for the crop encoder, which needs the full
//! bytes rather than just the header.

use crate::imaging::{BackendError, Dimensions, ImageBackend, RustBackend, supported_input_extensions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("Not a decodable image: {0}")]
    Decode(#[from] BackendError),
    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

/// Largest remote image the fetcher will buffer.
pub const MAX_REMOTE_BYTES: u64 = 64 * 1024 * 1024;

/// Media type for a path, derived from its extension.
///
/// Unknown extensions map to `application/octet-stream`, which the collection
/// manager filters out.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("tif" | "tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// A file picked from the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub media_type: String,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = media_type_for(&path).to_string();
        Self { path, media_type }
    }

    pub fn with_media_type(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            media_type: media_type.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Where image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Local(PathBuf),
    Remote(String),
}

impl ImageSource {
    /// `http://` and `https://` inputs are remote, everything else is a path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Remote(trimmed.to_string())
        } else {
            Self::Local(PathBuf::from(input))
        }
    }
}

/// Inputs named on the command line, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    pub files: Vec<LocalFile>,
    pub urls: Vec<String>,
}

/// Expand paths and URLs into local files and remote URLs.
///
/// Directories are walked recursively in file-name order and contribute only
/// files with a decodable extension. Files named explicitly are kept as-is;
/// the collection manager filters them by media type.
pub fn collect_inputs<S: AsRef<str>>(inputs: &[S]) -> Inputs {
    let mut collected = Inputs::default();
    for input in inputs {
        match ImageSource::parse(input.as_ref()) {
            ImageSource::Remote(url) => collected.urls.push(url),
            ImageSource::Local(path) if path.is_dir() => {
                collected.files.extend(
                    WalkDir::new(&path)
                        .follow_links(true)
                        .sort_by_file_name()
                        .into_iter()
                        .filter_map(|e| e.ok())
                        .filter(|e| e.file_type().is_file() && has_supported_extension(e.path()))
                        .map(|e| LocalFile::new(e.path())),
                );
            }
            ImageSource::Local(path) => collected.files.push(LocalFile::new(path)),
        }
    }
    collected
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| supported_input_extensions().contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Loads raw image bytes from disk or over HTTP.
///
/// Remote bodies are capped at `max_bytes`; anything larger fails with
/// [`ProbeError::TooLarge`] without being buffered in full.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: reqwest::Client,
    max_bytes: u64,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::with_client(reqwest::Client::new())
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            max_bytes: MAX_REMOTE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub async fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, ProbeError> {
        match source {
            ImageSource::Local(path) => read_local(path).await,
            ImageSource::Remote(url) => self.fetch_remote(url).await,
        }
    }

    pub async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, ProbeError> {
        let mut resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let too_large = || ProbeError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        if resp.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong; count what actually arrives.
        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, ProbeError> {
    tokio::fs::read(path).await.map_err(|source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Asynchronous dimension lookup.
///
/// The collection manager is generic over this trait so tests can resolve
/// probes in any order they like.
pub trait DimensionProbe {
    fn probe_local(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Dimensions, ProbeError>> + Send;

    fn probe_remote(&self, url: &str)
    -> impl Future<Output = Result<Dimensions, ProbeError>> + Send;
}

/// Production prober: [`Fetcher`] for bytes, an [`ImageBackend`] for headers.
pub struct Prober<B = RustBackend> {
    fetcher: Fetcher,
    backend: Arc<B>,
}

impl Prober<RustBackend> {
    pub fn new() -> Self {
        Self::with_backend(Fetcher::new(), RustBackend::new())
    }
}

impl Default for Prober<RustBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Clone for Prober<B> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: ImageBackend> Prober<B> {
    pub fn with_backend(fetcher: Fetcher, backend: B) -> Self {
        Self {
            fetcher,
            backend: Arc::new(backend),
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }
}

impl<B: ImageBackend + Send> DimensionProbe for Prober<B> {
    async fn probe_local(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        let bytes = read_local(path).await?;
        Ok(self.backend.identify(&bytes)?)
    }

    async fn probe_remote(&self, url: &str) -> Result<Dimensions, ProbeError> {
        let bytes = self.fetcher.fetch_remote(url).await?;
        Ok(self.backend.identify(&bytes)?)
    }
}
