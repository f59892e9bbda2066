use clap::{Args, Parser, Subcommand};
use futures_util::future::join_all;
use gridcrop::collection::{CollectionManager, ImageCollection};
use gridcrop::config::{self, ToolConfig};
use gridcrop::imaging::{Dimensions, RustBackend};
use gridcrop::preview::{self, GridLayout};
use gridcrop::probe::{self, Fetcher, ImageSource, Prober};
use gridcrop::publish::Publisher;
use gridcrop::repo_config::{RepoConfig, RepoConfigStore};
use gridcrop::{crop, export, output};
use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridcrop")]
#[command(about = "Group images by resolution, cover-crop them to one size, preview and publish")]
#[command(long_about = "\
Group images by resolution, cover-crop them to one size, preview and publish

Inputs may be image files, directories (walked recursively) or http(s) URLs.
Images are grouped by exact pixel size. The crop size defaults to the
smallest width and the smallest height across all images; every image is
scaled to cover it and trimmed evenly from both sides.

  gridcrop groups photos/
  gridcrop export photos/ --out cropped --group 1080x1920
  gridcrop preview photos/ --columns 4 --html > grid.html
  gridcrop publish cropped/001.jpg

Publishing needs a GitHub owner, repo and token, stored with 'gridcrop
config set' or given through GITHUB_OWNER, GITHUB_REPO, GITHUB_TOKEN.
A repo such as 'img[0-20]' uploads to a random one of img0..img20.

Run 'gridcrop gen-config' to generate a documented gridcrop.toml.")]
#[command(version = env!("GRIDCROP_VERSION"))]
struct Cli {
    /// Tool config file [default: ./gridcrop.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Images to ingest.
#[derive(Args, Clone)]
struct InputArgs {
    /// Image files, directories, or http(s) URLs
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Only use these resolution groups, e.g. 1080x1920 (repeatable)
    #[arg(long = "group")]
    groups: Vec<String>,

    /// Crop width [default: smallest width]
    #[arg(long)]
    width: Option<u32>,

    /// Crop height [default: smallest height]
    #[arg(long)]
    height: Option<u32>,
}

/// GitHub settings that override the stored record for one run.
#[derive(Args, Clone, Default)]
struct GithubArgs {
    #[arg(long, env = "GITHUB_OWNER")]
    owner: Option<String>,
    /// Repository name or range pattern like img[0-20]
    #[arg(long, env = "GITHUB_REPO")]
    repo: Option<String>,
    #[arg(long, env = "GITHUB_BRANCH")]
    branch: Option<String>,
    /// Directory inside the repository [default: today as YYYY/MM/DD]
    #[arg(long)]
    path_prefix: Option<String>,
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl GithubArgs {
    fn apply(&self, config: &mut RepoConfig) {
        let fields = [
            (&self.owner, &mut config.owner),
            (&self.repo, &mut config.repo),
            (&self.branch, &mut config.branch),
            (&self.path_prefix, &mut config.path_prefix),
            (&self.token, &mut config.token),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                *field = value.trim().to_string();
            }
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List resolution groups and the common crop size
    Groups(InputArgs),
    /// Cover-crop a single image or URL
    Crop {
        source: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Output JPEG
        #[arg(short, long, default_value = "cropped.jpg")]
        output: PathBuf,
    },
    /// Crop every selected image into a directory
    Export {
        #[command(flatten)]
        input: InputArgs,
        /// Output directory
        #[arg(long, default_value = "cropped")]
        out: PathBuf,
    },
    /// Show the grid layout, or render it as HTML or a contact sheet
    Preview {
        #[command(flatten)]
        input: InputArgs,
        /// Grid columns (1-12) [default: from config]
        #[arg(long)]
        columns: Option<u32>,
        /// Grid rows, 0 = auto [default: from config]
        #[arg(long)]
        rows: Option<u32>,
        /// Print a self-contained HTML snippet
        #[arg(long)]
        html: bool,
        /// Render the grid into a JPEG contact sheet
        #[arg(long)]
        sheet: Option<PathBuf>,
        /// Upload cropped local images first and point the HTML at their CDN URLs
        #[arg(long, requires = "html")]
        publish: bool,
        #[command(flatten)]
        github: GithubArgs,
    },
    /// Upload one file to GitHub and print its raw and CDN URLs
    Publish {
        file: PathBuf,
        /// File name inside the path prefix [default: the file's own name]
        name: Option<String>,
        #[command(flatten)]
        github: GithubArgs,
    },
    /// Manage the stored GitHub settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print a stock gridcrop.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored settings (token masked)
    Show,
    /// Change stored settings
    Set(GithubArgs),
    /// Replace the stored settings from a JSON file, or stdin with '-'
    Import { file: PathBuf },
    /// Print the stored settings as JSON
    Export,
    /// Set the path prefix to today's date
    Today,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Groups(input) => {
            let tool = load_tool_config(cli.config.as_deref())?;
            let manager = ingest(&input, &tool).await?;
            manager.read(output::print_groups);
        }
        Command::Crop {
            source,
            width,
            height,
            output,
        } => {
            let tool = load_tool_config(cli.config.as_deref())?;
            let jpeg = crop::crop_to_cover(
                &Fetcher::new(),
                &RustBackend::new(),
                &ImageSource::parse(&source),
                Dimensions::new(width, height),
                tool.crop.quality(),
            )
            .await?;
            std::fs::write(&output, jpeg)?;
            println!("{} → {}", source, output.display());
        }
        Command::Export { input, out } => {
            let tool = load_tool_config(cli.config.as_deref())?;
            init_thread_pool(&tool.processing);
            let manager = ingest(&input, &tool).await?;
            let (items, crop) = manager.read(|c| (c.preview_items(), c.crop_dimensions()));
            let sources = export::load_sources(&Fetcher::new(), &items).await;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_export_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = export::export_items(
                &RustBackend::new(),
                &items,
                sources,
                crop,
                tool.crop.quality(),
                &out,
                Some(tx),
            )?;
            printer.join().ok();
            println!("{}", output::format_export_summary(&summary));
        }
        Command::Preview {
            input,
            columns,
            rows,
            html,
            sheet,
            publish,
            github,
        } => {
            let tool = load_tool_config(cli.config.as_deref())?;
            let manager = ingest(&input, &tool).await?;
            let layout = GridLayout::new(
                columns.unwrap_or(tool.preview.columns),
                rows.unwrap_or(tool.preview.rows),
            )
            .with_gap(tool.preview.gap);

            if publish {
                let repo = load_repo_config(&github);
                publish_previewed(&manager, &tool, &repo).await?;
            }

            let (items, crop) = manager.read(|c| (c.preview_items(), c.crop_dimensions()));
            if let Some(path) = sheet {
                let sources = export::load_sources(&Fetcher::new(), &items).await;
                let loaded: Vec<Vec<u8>> = sources.into_iter().filter_map(Result::ok).collect();
                let backend = RustBackend::new();
                let tiles = export::crop_all(&backend, &loaded, crop, tool.crop.quality())
                    .into_iter()
                    .filter_map(Result::ok)
                    .collect();
                let jpeg = preview::render_contact_sheet(&backend, tiles, &layout, crop)?;
                std::fs::write(&path, jpeg)?;
                eprintln!("Contact sheet → {}", path.display());
            }
            if html {
                let cells = preview::inline_cells(&items).await;
                println!("{}", preview::render_grid_html(&cells, &layout, crop));
            } else {
                output::print_layout(&layout, items.len(), crop);
            }
        }
        Command::Publish { file, name, github } => {
            let repo = load_repo_config(&github);
            let publisher = Publisher::new()?;
            match publisher.publish_file(&file, name.as_deref(), &repo).await {
                Ok(outcome) => output::print_publish_outcome(&outcome, &repo),
                Err(err) => {
                    eprintln!("Upload failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        Command::Config { action } => run_config(action)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG`; stdout carries command output.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn load_tool_config(path: Option<&Path>) -> Result<ToolConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

fn repo_store() -> Result<RepoConfigStore, Box<dyn Error>> {
    Ok(RepoConfigStore::default_location()?)
}

/// Stored record with command-line and environment overrides applied.
fn load_repo_config(overrides: &GithubArgs) -> RepoConfig {
    let mut repo = match RepoConfigStore::default_location() {
        Ok(store) => store.load(),
        Err(err) => {
            warn!(%err, "Using default repo config");
            let mut repo = RepoConfig::default();
            repo.set_path_prefix_to_today();
            repo
        }
    };
    overrides.apply(&mut repo);
    repo
}

/// Probe every input into a fresh collection, then apply group and size flags.
async fn ingest(
    input: &InputArgs,
    tool: &ToolConfig,
) -> Result<CollectionManager<Prober>, Box<dyn Error>> {
    let collection = ImageCollection::with_placeholder(tool.crop.placeholder());
    let manager = CollectionManager::with_collection(Prober::new(), collection);

    let inputs = probe::collect_inputs(&input.inputs);
    manager.add_local_files(inputs.files).await;
    let pending: Vec<_> = inputs
        .urls
        .iter()
        .filter_map(|url| manager.add_remote_image(url))
        .collect();
    join_all(pending).await;

    if !input.groups.is_empty() {
        let keys: Vec<String> = input.groups.iter().map(|g| normalize_group_key(g)).collect();
        manager.update(|c| c.select_groups(keys));
    }
    if input.width.is_some() || input.height.is_some() {
        manager.update(|c| {
            let current = c.crop_dimensions();
            c.set_crop_dimensions(Dimensions::new(
                input.width.unwrap_or(current.width),
                input.height.unwrap_or(current.height),
            ))
        })?;
    }
    Ok(manager)
}

/// Accept `1080x1920` as well as `1080×1920`.
fn normalize_group_key(key: &str) -> String {
    key.trim().replace(['x', 'X', '*'], "×")
}

/// Crop and upload every local previewed image, then swap in CDN URLs.
async fn publish_previewed(
    manager: &CollectionManager<Prober>,
    tool: &ToolConfig,
    repo: &RepoConfig,
) -> Result<(), Box<dyn Error>> {
    let (items, crop) = manager.read(|c| {
        let local: Vec<_> = c.preview_items().into_iter().filter(|i| i.is_local()).collect();
        (local, c.crop_dimensions())
    });
    if items.is_empty() {
        return Ok(());
    }

    let sources: Vec<Vec<u8>> = export::load_sources(&Fetcher::new(), &items)
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;
    let backend = RustBackend::new();
    let encoded = export::crop_all(&backend, &sources, crop, tool.crop.quality());

    let mut files = Vec::with_capacity(items.len());
    for (item, jpeg) in items.iter().zip(encoded) {
        files.push((item.display_url.clone(), jpeg?));
    }
    let urls = Publisher::new()?.publish_batch(files, repo).await?;
    let replaced = manager.update(|c| c.replace_local_with_remote_urls(&urls));
    eprintln!("Published {replaced} images");
    Ok(())
}

fn run_config(action: ConfigAction) -> Result<(), Box<dyn Error>> {
    let store = repo_store()?;
    match action {
        ConfigAction::Show => {
            println!("{}", store.path().display());
            output::print_repo_config(&store.load());
        }
        ConfigAction::Set(args) => {
            let mut repo = store.load();
            args.apply(&mut repo);
            store.try_save(&repo)?;
            output::print_repo_config(&repo);
        }
        ConfigAction::Import { file } => {
            let text = if file.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(&file)?
            };
            let value: serde_json::Value = serde_json::from_str(&text)?;
            let mut repo = RepoConfig::default();
            if !repo.import(&value) {
                return Err("expected a JSON object".into());
            }
            store.try_save(&repo)?;
            output::print_repo_config(&store.load());
        }
        ConfigAction::Export => {
            println!("{}", serde_json::to_string_pretty(&store.load().export())?);
        }
        ConfigAction::Today => {
            let mut repo = store.load();
            repo.set_path_prefix_to_today();
            store.try_save(&repo)?;
            println!("path_prefix: {}", repo.path_prefix);
        }
    }
    Ok(())
}
