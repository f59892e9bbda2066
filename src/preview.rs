//! Preview grid: layout clamping, HTML snippet, contact sheet.
//!
//! The HTML is meant to be pasted into a rich-text editor, so all styling is
//! inline and local images are embedded as `data:` URLs. Remote items keep
//! their URL. Every cell has the crop aspect ratio and shows its image with
//! `object-fit: cover` centered, which matches what the crop encoder produces.

use crate::collection::ImageItem;
use crate::config::PreviewConfig;
use crate::imaging::{self, BackendError, Dimensions, ImageBackend};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::join_all;
use maud::html;
use tracing::debug;

pub const MAX_TRACKS: u32 = 12;
pub const DEFAULT_COLUMNS: u32 = 3;
pub const DEFAULT_GAP: u32 = 6;

const CELL_STYLE: &str =
    "overflow:hidden;border-radius:4px;border:1px solid #e5e7eb;background:#f3f4f6";
const IMG_STYLE: &str = "width:100%;height:100%;object-fit:cover;object-position:center center";

/// Columns × rows of the preview grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// 1..=12.
    pub columns: u32,
    /// 0 = as many as needed, otherwise 1..=12.
    pub rows: u32,
    /// Pixels between cells.
    pub gap: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS, 0)
    }
}

impl GridLayout {
    /// Clamp into range. `columns == 0` falls back to the default of 3.
    pub fn new(columns: u32, rows: u32) -> Self {
        let columns = match columns {
            0 => DEFAULT_COLUMNS,
            n => n.min(MAX_TRACKS),
        };
        Self {
            columns,
            rows: rows.min(MAX_TRACKS),
            gap: DEFAULT_GAP,
        }
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.columns, config.rows).with_gap(config.gap)
    }

    /// Inline CSS for the grid container.
    pub fn grid_style(&self) -> String {
        let rows = match self.rows {
            0 => String::new(),
            n => format!("grid-template-rows:repeat({n},1fr);"),
        };
        format!(
            "display:grid;grid-template-columns:repeat({},1fr);{rows}gap:{}px",
            self.columns, self.gap
        )
    }

    /// Rows actually occupied by `items` cells.
    pub fn rows_for(&self, items: usize) -> u32 {
        let needed = (items as u32).div_ceil(self.columns).max(1);
        needed.max(self.rows)
    }
}

/// Inline CSS for one cell at the crop aspect ratio.
pub fn cell_style(crop: Dimensions) -> String {
    format!(
        "{CELL_STYLE};aspect-ratio:{}/{}",
        crop.width.max(1),
        crop.height.max(1)
    )
}

/// Image source and alt text for one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub src: String,
    pub alt: String,
}

impl GridCell {
    /// Cell pointing at the item's display URL.
    pub fn from_item(item: &ImageItem) -> Self {
        Self {
            src: item.display_url.clone(),
            alt: item
                .source
                .as_ref()
                .map(|s| s.file_name())
                .unwrap_or_default(),
        }
    }
}

/// Cells with local files embedded as `data:` URLs.
///
/// A local file that cannot be read keeps its display URL.
pub async fn inline_cells(items: &[ImageItem]) -> Vec<GridCell> {
    join_all(items.iter().map(|item| async move {
        let mut cell = GridCell::from_item(item);
        if let Some(source) = &item.source {
            match tokio::fs::read(&source.path).await {
                Ok(bytes) => {
                    cell.src = format!("data:{};base64,{}", source.media_type, STANDARD.encode(bytes));
                }
                Err(err) => debug!(path = %source.path.display(), %err, "Keeping display URL"),
            }
        }
        cell
    }))
    .await
}

/// Render the grid as a self-contained HTML snippet.
pub fn render_grid_html(cells: &[GridCell], layout: &GridLayout, crop: Dimensions) -> String {
    let cell_style = cell_style(crop);
    html! {
        section.preview-grid style=(layout.grid_style()) aria-label="Image grid" {
            @for cell in cells {
                div style=(cell_style) {
                    img src=(cell.src) alt=(cell.alt) style=(IMG_STYLE);
                }
            }
        }
    }
    .into_string()
}

/// Render already-cropped tiles into a single JPEG laid out like the grid.
pub fn render_contact_sheet(
    backend: &impl ImageBackend,
    tiles: Vec<Vec<u8>>,
    layout: &GridLayout,
    crop: Dimensions,
) -> Result<Vec<u8>, BackendError> {
    imaging::render_contact_sheet(backend, tiles, layout.columns, layout.rows, crop, layout.gap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ImageCollection;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::probe::LocalFile;
    use crate::test_helpers::write_png;
    use tempfile::TempDir;

    #[test]
    fn layout_clamps_columns() {
        assert_eq!(GridLayout::new(0, 0).columns, 3);
        assert_eq!(GridLayout::new(1, 0).columns, 1);
        assert_eq!(GridLayout::new(40, 0).columns, 12);
    }

    #[test]
    fn layout_clamps_rows() {
        assert_eq!(GridLayout::new(3, 0).rows, 0);
        assert_eq!(GridLayout::new(3, 5).rows, 5);
        assert_eq!(GridLayout::new(3, 99).rows, 12);
    }

    #[test]
    fn grid_style_auto_rows() {
        assert_eq!(
            GridLayout::default().grid_style(),
            "display:grid;grid-template-columns:repeat(3,1fr);gap:6px"
        );
    }

    #[test]
    fn grid_style_fixed_rows() {
        assert_eq!(
            GridLayout::new(4, 2).with_gap(10).grid_style(),
            "display:grid;grid-template-columns:repeat(4,1fr);grid-template-rows:repeat(2,1fr);gap:10px"
        );
    }

    #[test]
    fn layout_from_config() {
        let config = PreviewConfig {
            columns: 2,
            rows: 1,
            gap: 0,
        };
        assert_eq!(GridLayout::from_config(&config), GridLayout { columns: 2, rows: 1, gap: 0 });
    }

    #[test]
    fn rows_for_grows_past_fixed_rows() {
        let layout = GridLayout::new(3, 1);
        assert_eq!(layout.rows_for(0), 1);
        assert_eq!(layout.rows_for(3), 1);
        assert_eq!(layout.rows_for(7), 3);
        assert_eq!(GridLayout::new(3, 4).rows_for(2), 4);
    }

    #[test]
    fn cell_style_has_aspect_ratio() {
        assert!(cell_style(Dimensions::new(16, 9)).ends_with("aspect-ratio:16/9"));
        assert!(cell_style(Dimensions::new(0, 0)).ends_with("aspect-ratio:1/1"));
    }

    #[test]
    fn html_has_one_cell_per_item() {
        let cells = vec![
            GridCell {
                src: "https://cdn.example/a.jpg".into(),
                alt: String::new(),
            },
            GridCell {
                src: "https://cdn.example/b.jpg".into(),
                alt: "b.jpg".into(),
            },
        ];
        let html = render_grid_html(&cells, &GridLayout::default(), Dimensions::new(4, 3));

        assert!(html.starts_with("<section"));
        assert!(html.contains("class=\"preview-grid\""));
        assert_eq!(html.matches("<img ").count(), 2);
        assert!(html.contains("src=\"https://cdn.example/b.jpg\" alt=\"b.jpg\""));
        assert!(html.contains("aspect-ratio:4/3"));
        assert!(html.contains("object-fit:cover"));
    }

    #[test]
    fn html_escapes_alt_text() {
        let cells = vec![GridCell {
            src: "x.jpg".into(),
            alt: "a\"b<c>".into(),
        }];
        let html = render_grid_html(&cells, &GridLayout::default(), Dimensions::new(1, 1));
        assert!(html.contains("alt=\"a&quot;b&lt;c&gt;\""));
    }

    #[tokio::test]
    async fn inline_cells_embed_local_files() {
        let tmp = TempDir::new().unwrap();
        let path = write_png(tmp.path(), "a.png", 4, 4);
        let mut collection = ImageCollection::new();
        collection.append_local(vec![(LocalFile::new(&path), Dimensions::new(4, 4))]);
        collection.push_remote_placeholder("https://cdn.example/b.jpg");

        let cells = inline_cells(collection.items()).await;

        assert!(cells[0].src.starts_with("data:image/png;base64,iVBOR"));
        assert_eq!(cells[0].alt, "a.png");
        assert_eq!(cells[1].src, "https://cdn.example/b.jpg");
    }

    #[tokio::test]
    async fn inline_cells_keep_url_for_unreadable_file() {
        let mut collection = ImageCollection::new();
        collection.append_local(vec![(LocalFile::new("/nonexistent/a.png"), Dimensions::new(4, 4))]);

        let cells = inline_cells(collection.items()).await;
        assert!(cells[0].src.starts_with("local:"));
    }

    #[test]
    fn contact_sheet_uses_layout() {
        let backend = MockBackend::new();
        render_contact_sheet(
            &backend,
            vec![b"a".to_vec(); 4],
            &GridLayout::new(2, 0),
            Dimensions::new(10, 10),
        )
        .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::ContactSheet {
                columns: 2,
                rows: 2,
                tiles: 4
            }]
        );
    }
}
