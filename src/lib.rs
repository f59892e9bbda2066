//! # gridcrop
//!
//! Collect images, group them by resolution, cover-crop them to a common
//! size, preview them as a grid, and publish them to a GitHub repository for
//! jsDelivr CDN delivery.
//!
//! # Pipeline
//!
//! ```text
//! inputs ──probe──▶ collection ──select──▶ preview items
//!                       │                       │
//!                  groups, crop size       crop / export / sheet / HTML
//!                                                │
//!                                             publish ──▶ CDN URLs
//! ```
//!
//! Ingestion is asynchronous: every image is probed for its pixel size
//! before it joins the collection, but the collection keeps input order no
//! matter which probe finishes first. Remote URLs join immediately with a
//! placeholder size and are patched once their probe resolves.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`probe`] | Dimension probing for local files and URLs; byte fetching; input expansion |
//! | [`imaging`] | Cover-crop geometry, `image`-crate backend, contact sheets |
//! | [`crop`] | Async load-then-crop for a single source |
//! | [`collection`] | Ordered collection, resolution groups, selection, crop size, display handles |
//! | [`preview`] | Grid layout clamping, HTML snippet, contact-sheet rendering |
//! | [`export`] | Parallel batch crop into a directory |
//! | [`repo_config`] | Persisted GitHub settings, repo range patterns, CDN URLs |
//! | [`publish`] | GitHub Contents API upload |
//! | [`naming`] | Export and content-addressed file names |
//! | [`config`] | `gridcrop.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Cover, Not Contain
//!
//! Every crop fills the target completely and trims the overflow evenly from
//! both sides. A grid of mixed resolutions then lines up without letterboxing,
//! and the HTML preview (`object-fit: cover`, centered) shows exactly what the
//! encoder will produce.
//!
//! ## Smallest Common Size
//!
//! The default crop size is the component-wise minimum over all images, so no
//! image is ever upscaled in both directions to fill a cell.
//!
//! ## Range-Pattern Repositories
//!
//! jsDelivr and GitHub both limit per-repository size. A repo pattern such as
//! `img[0-20]` spreads uploads across `img0` ..= `img20`, one random pick per
//! upload.

pub mod collection;
pub mod config;
pub mod crop;
pub mod export;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod preview;
pub mod probe;
pub mod publish;
pub mod repo_config;

#[cfg(test)]
pub(crate) mod test_helpers;
