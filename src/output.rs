//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Groups
//!
//! ```text
//! Groups
//! [x] 001 1080×1920 (2 images)
//!         photos/a.jpg
//!         photos/b.jpg
//! [ ] 002 640×480 (1 image)
//!         https://cdn.example/c.jpg
//!
//! Crop: 640×480
//! ```
//!
//! ## Export
//!
//! ```text
//! Exporting 3 images at 640×480
//!     001 photos/a.jpg → out/001-640x480-1a2b3c4d.jpg
//!     002 photos/b.jpg: skipped (Not a decodable image: ...)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::collection::ImageCollection;
use crate::export::{ExportEvent, ExportSummary};
use crate::imaging::Dimensions;
use crate::preview::GridLayout;
use crate::publish::PublishOutcome;
use crate::repo_config::RepoConfig;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Groups
// ============================================================================

pub fn format_groups(collection: &ImageCollection) -> Vec<String> {
    let groups = collection.groups();
    if groups.is_empty() {
        return vec!["No images".to_string()];
    }

    let mut lines = vec!["Groups".to_string()];
    for (i, group) in groups.iter().enumerate() {
        let mark = if collection.is_selected(&group.key) {
            "[x]"
        } else {
            "[ ]"
        };
        lines.push(format!(
            "{} {} {} ({})",
            mark,
            format_index(i + 1),
            group.key,
            plural(group.items.len(), "image")
        ));
        for item in &group.items {
            let label = match &item.source {
                Some(file) => file.path.display().to_string(),
                None => item.display_url.clone(),
            };
            lines.push(format!("{}{}", indent(2), label));
        }
    }
    lines.push(String::new());
    lines.push(format!("Crop: {}", collection.crop_dimensions()));
    lines
}

pub fn print_groups(collection: &ImageCollection) {
    for line in format_groups(collection) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

pub fn format_export_event(event: &ExportEvent) -> Vec<String> {
    match event {
        ExportEvent::Started { total, crop } => {
            vec![format!("Exporting {} at {}", plural(*total, "image"), crop)]
        }
        ExportEvent::Written {
            index,
            source,
            file,
        } => vec![format!(
            "{}{} {} → {}",
            indent(1),
            format_index(*index),
            source,
            file.display()
        )],
        ExportEvent::Skipped {
            index,
            source,
            reason,
        } => vec![format!(
            "{}{} {}: skipped ({})",
            indent(1),
            format_index(*index),
            source,
            reason
        )],
    }
}

pub fn format_export_summary(summary: &ExportSummary) -> String {
    match summary.skipped {
        0 => format!("Exported {}", plural(summary.written.len(), "image")),
        n => format!(
            "Exported {}, skipped {}",
            plural(summary.written.len(), "image"),
            n
        ),
    }
}

// ============================================================================
// Preview
// ============================================================================

pub fn format_layout(layout: &GridLayout, items: usize, crop: Dimensions) -> Vec<String> {
    let rows = if layout.rows == 0 {
        format!("{} (auto)", layout.rows_for(items))
    } else {
        layout.rows_for(items).to_string()
    };
    vec![
        format!("Grid: {} columns × {} rows, gap {}px", layout.columns, rows, layout.gap),
        format!("Cells: {} ({})", crop, plural(items, "image")),
    ]
}

pub fn print_layout(layout: &GridLayout, items: usize, crop: Dimensions) {
    for line in format_layout(layout, items, crop) {
        println!("{}", line);
    }
}

// ============================================================================
// Publish
// ============================================================================

pub fn format_publish_outcome(outcome: &PublishOutcome, config: &RepoConfig) -> Vec<String> {
    let mut lines = vec![format!("Uploaded {}/{}", outcome.repo, outcome.path)];
    if let Some(raw) = config.raw_url(&outcome.repo, &outcome.path) {
        lines.push(format!("{}Raw: {}", indent(1), raw));
    }
    if let Some(cdn) = config.jsdelivr_url_for_repo(&outcome.repo, &outcome.path) {
        lines.push(format!("{}CDN: {}", indent(1), cdn));
    }
    lines
}

pub fn print_publish_outcome(outcome: &PublishOutcome, config: &RepoConfig) {
    for line in format_publish_outcome(outcome, config) {
        println!("{}", line);
    }
}

/// Stored publish settings, with the token masked.
pub fn format_repo_config(config: &RepoConfig) -> Vec<String> {
    let token = match config.token.trim() {
        "" => "(not set)".to_string(),
        t => {
            let count = t.chars().count();
            let tail: String = t.chars().skip(count.saturating_sub(4)).collect();
            if count <= 4 {
                "****".to_string()
            } else {
                format!("****{tail}")
            }
        }
    };
    vec![
        format!("owner:       {}", config.owner),
        format!("repo:        {}", config.repo),
        format!("branch:      {}", config.effective_branch()),
        format!("path_prefix: {}", config.path_prefix),
        format!("token:       {}", token),
    ]
}

pub fn print_repo_config(config: &RepoConfig) {
    for line in format_repo_config(config) {
        println!("{}", line);
    }
}
