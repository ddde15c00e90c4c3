use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use answerlens::app::{App, UserAction};
use answerlens::capture::RawImage;
use answerlens::config::{load_app_config, AppConfig};
use answerlens::geometry::{CropRect, Display, Extent, ScaleFactor};
use answerlens::logging;
use answerlens::state::CaptureState;
use answerlens::submission::SubmissionResult;
use answerlens::transform;

#[derive(Parser, Debug)]
#[command(
    name = "answerlens",
    version,
    about = "Crop a photo to a region of interest and send it for analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export the crop as JPEG without submitting it
    Crop(CropArgs),
    /// Crop, submit to the analysis endpoint and print the answer
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct CropSelectionArgs {
    /// Input image (camera or gallery file)
    input: PathBuf,
    /// Rendered size the rectangle is measured against, e.g. 500x400 (default: native size)
    #[arg(long)]
    display: Option<DisplaySize>,
    /// Crop rectangle in display units as x,y,width,height (default: central area)
    #[arg(long)]
    rect: Option<RectArg>,
}

#[derive(Args, Debug)]
struct CropArgs {
    #[command(flatten)]
    selection: CropSelectionArgs,
    /// Output JPEG path
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    selection: CropSelectionArgs,
    /// Analysis endpoint URL (overrides config.json and ANSWERLENS_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,
    /// Also write the submitted crop to this path
    #[arg(long)]
    save_crop: Option<PathBuf>,
    /// Print the history entry as JSON instead of the raw answer
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Clone, Copy)]
struct DisplaySize {
    width: f64,
    height: f64,
}

impl FromStr for DisplaySize {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let (width, height) = value
            .split_once(&['x', 'X'][..])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|err| format!("invalid size component {part:?}: {err}"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct RectArg {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl FromStr for RectArg {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let parts = value
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|err| format!("invalid rectangle component {part:?}: {err}"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            &[x, y, width, height] => Ok(Self {
                x,
                y,
                width,
                height,
            }),
            _ => Err(format!("expected x,y,width,height, got {value:?}")),
        }
    }
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crop(args) => command_crop(args),
        Commands::Analyze(args) => command_analyze(args),
    }
}

fn load_selection(args: &CropSelectionArgs) -> Result<(RawImage, Extent<Display>)> {
    let raw = RawImage::open(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let display = match args.display {
        Some(size) => Extent::new(size.width, size.height)
            .ok_or_else(|| anyhow!("display size must be positive"))?,
        None => Extent::new(f64::from(raw.width()), f64::from(raw.height()))
            .ok_or_else(|| anyhow!("image has no pixels"))?,
    };
    Ok((raw, display))
}

fn selected_rect(
    args: &CropSelectionArgs,
    display: Extent<Display>,
    fraction: f64,
) -> CropRect<Display> {
    match args.rect {
        Some(rect) => CropRect::new(rect.x, rect.y, rect.width, rect.height, display),
        None => CropRect::centered(display, fraction),
    }
}

fn command_crop(args: CropArgs) -> Result<()> {
    let (raw, display) = load_selection(&args.selection)?;
    let native = raw.extent().ok_or_else(|| anyhow!("image has no pixels"))?;
    let config = load_app_config();
    let rect = selected_rect(&args.selection, display, config.default_crop_fraction());

    let native_rect =
        transform::display_to_native(&rect, ScaleFactor::between(native, display), native);
    let cropped = transform::export_crop(&raw, &native_rect).context("failed to export crop")?;
    cropped
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    tracing::info!(
        width = cropped.width(),
        height = cropped.height(),
        out = %args.out.display(),
        "crop written"
    );
    println!("{}", args.out.display());
    Ok(())
}

fn command_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = load_app_config();
    if let Some(endpoint) = args.endpoint.clone() {
        config.endpoint_url = Some(endpoint);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(analyze(args, config))
}

async fn analyze(args: AnalyzeArgs, config: AppConfig) -> Result<()> {
    let mut app = App::from_config(&config)?;
    let (raw, display) = load_selection(&args.selection)?;
    let rect = selected_rect(&args.selection, display, config.default_crop_fraction());

    app.dispatch(UserAction::LoadImage(raw))?;
    app.dispatch(UserAction::ImageRendered(display))?;
    app.dispatch(UserAction::FinalizeCrop(rect))?;
    app.dispatch(UserAction::ConfirmCrop)?;

    if let Some(path) = &args.save_crop {
        if let Some(image) = app.capture_view().preview {
            image
                .save(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }

    app.dispatch(UserAction::Analyze)?;
    app.next_completion().await;

    match app.session().state() {
        CaptureState::Done {
            result: SubmissionResult::Success(answer),
            ..
        } => {
            if args.json {
                let entry = app
                    .history()
                    .get(0)
                    .ok_or_else(|| anyhow!("history entry missing after success"))?;
                println!("{}", serde_json::to_string_pretty(&entry.summary())?);
            } else {
                println!("{answer}");
            }
            Ok(())
        }
        CaptureState::Done {
            result: SubmissionResult::Failure(reason),
            ..
        } => bail!("{}: {reason}", app.status().unwrap_or("analysis failed")),
        other => bail!("analysis did not complete (state {:?})", other.kind()),
    }
}
