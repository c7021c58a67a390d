use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use image::RgbaImage;
use serde_json::json;

use neoscope::ViewerConfig;
use neoscope::core::{CompareView, PaneTag};
use neoscope::decode::{self, ImageFormat};
use neoscope::domain::Rect;
use neoscope::persistence::{AnnotationStore, DirectoryImageSource, JsonFileStore, MemoryStore};
use neoscope::render::{SoftwareBackend, WindowLevel};

#[derive(Parser, Debug)]
#[command(
    name = "neoscope",
    version,
    about = "Decode, window and render annotated ultrasound and radiograph frames"
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode an image and print its size, range and initial window as JSON
    Inspect(InspectArgs),
    /// Render one image, or two side by side, with stored annotations to PNG
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct InspectArgs {
    file: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    file: PathBuf,
    /// Second image shown in the right pane
    #[arg(long)]
    compare: Option<PathBuf>,
    /// Output PNG path
    #[arg(long)]
    out: PathBuf,
    /// Pane width in pixels
    #[arg(long, default_value_t = 512)]
    width: u32,
    /// Pane height in pixels
    #[arg(long, default_value_t = 512)]
    height: u32,
    /// Window width in raw sample units
    #[arg(long, requires = "level")]
    window: Option<f64>,
    /// Window center in raw sample units
    #[arg(long, requires = "window")]
    level: Option<f64>,
    /// Directory of stored annotations
    #[arg(long)]
    store: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ViewerConfig::load_from(path)?,
        None => ViewerConfig::load(),
    };

    match cli.command {
        Commands::Inspect(args) => command_inspect(args).await,
        Commands::Render(args) => command_render(args, &config).await,
    }
}

async fn command_inspect(args: InspectArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let format = ImageFormat::from_path(&args.file);
    let image = decode::decode(&bytes, format)?;
    let window = WindowLevel::initial(&image);
    let range = image.value_range();

    let report = json!({
        "file": args.file.display().to_string(),
        "format": format!("{:?}", format).to_lowercase(),
        "width": image.width(),
        "height": image.height(),
        "components": image.components().count(),
        "min": range.map(|r| r.min),
        "max": range.map(|r| r.max),
        "window": window.width(),
        "level": window.center(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Image source plus the id of `path` within it
///
/// Plain relative paths keep their full form as the id so stored
/// annotations stay per file; other paths are served from their parent.
fn source_for(path: &Path) -> Result<(DirectoryImageSource, String)> {
    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if plain {
        if let Some(id) = path.to_str() {
            return Ok((DirectoryImageSource::new("."), id.to_string()));
        }
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a UTF-8 file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((DirectoryImageSource::new(dir), name.to_string()))
}

async fn command_render(args: RenderArgs, config: &ViewerConfig) -> Result<()> {
    let store: Box<dyn AnnotationStore> = match &args.store {
        Some(dir) => Box::new(JsonFileStore::new(dir)),
        None => Box::new(MemoryStore::new()),
    };
    let viewport = Rect::from_size(args.width, args.height);

    let mut files = vec![(PaneTag::Left, args.file.as_path())];
    if let Some(other) = &args.compare {
        files.push((PaneTag::Right, other.as_path()));
    }

    let mut view = CompareView::new(config);
    let mut panes = Vec::new();
    for (tag, path) in files {
        let (source, image_id) = source_for(path)?;
        view.load(
            tag,
            &image_id,
            &source,
            SoftwareBackend::new(),
            viewport,
            store.as_ref(),
        )
        .await;
        panes.push((tag, image_id));
    }

    let mut frames = Vec::new();
    for (tag, image_id) in &panes {
        let Some(pane) = view.pane_mut(*tag) else {
            bail!("{:?} pane was not mounted", tag);
        };
        if let Some(err) = pane.error() {
            bail!("{}: {}", image_id, err);
        }
        let session = pane
            .session_mut()
            .with_context(|| format!("{} did not finish loading", image_id))?;
        if let (Some(width), Some(center)) = (args.window, args.level) {
            session.set_window_level(WindowLevel::new(width, center));
        }
        frames.push(session.surface().backend().render()?);
    }

    let frame = side_by_side(&frames, args.width, args.height);
    frame
        .save(&args.out)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    log::info!("Wrote {}", args.out.display());
    Ok(())
}

fn side_by_side(frames: &[RgbaImage], width: u32, height: u32) -> RgbaImage {
    let mut out = RgbaImage::new(width * frames.len() as u32, height);
    for (i, frame) in frames.iter().enumerate() {
        image::imageops::replace(&mut out, frame, i as i64 * width as i64, 0);
    }
    out
}
