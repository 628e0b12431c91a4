mod config;
mod logger;

use anyhow::{Context, Result, bail};
use card_compose::{
    ComposeOptions, Composer, CsvDirectory, DirStore, FontBook, ImageSources, ReqwestFetcher,
    Template,
};
use card_impose::{CmykConverter, CmykOptions, probe_converter};
use card_runtime::{BatchOptions, CancellationToken, CardRuntime, ColorMode, JobUpdate};
use clap::{Parser, Subcommand, ValueEnum};
use config::ToolConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "cardt", about = "Render data-driven cards and print sheets", version)]
struct Cli {
    /// JSON settings file (compose, layout, cmyk, workers)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one dataset row to a PNG
    Preview {
        /// Template JSON file
        #[arg(short, long)]
        template: PathBuf,

        /// Dataset CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Zero-based row to render
        #[arg(long, default_value = "0")]
        row: usize,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Object store root (`<store>/<bucket>/<id>`); defaults to the template's directory
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Render every dataset row and lay the cards out on print pages
    Batch {
        /// Template JSON file
        #[arg(short, long)]
        template: PathBuf,

        /// Dataset CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Object store root; defaults to the template's directory
        #[arg(long)]
        store: Option<PathBuf>,

        /// Color model of the output
        #[arg(long, default_value = "rgb", value_enum)]
        color: ColorArg,

        /// Concurrent record renders
        #[arg(long)]
        workers: Option<usize>,

        #[command(flatten)]
        page: PageArgs,

        /// Resolution tier for CMYK conversion
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,

        /// Ghostscript executable
        #[arg(long)]
        gs: Option<String>,
    },

    /// Show the card grid for a template or an aspect ratio
    Plan {
        /// Template JSON file
        #[arg(short, long, conflicts_with = "aspect", required_unless_present = "aspect")]
        template: Option<PathBuf>,

        /// Card width over height
        #[arg(long)]
        aspect: Option<f32>,

        /// Also report pages needed for this many cards
        #[arg(long)]
        cards: Option<usize>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Check whether CMYK conversion is available
    CmykSupport {
        /// Ghostscript executable
        #[arg(long)]
        gs: Option<String>,
    },

    /// Report the color spaces used by a PDF
    Validate {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    /// Output paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Output orientation
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Page margin in points
    #[arg(long)]
    margin: Option<f32>,
}

impl PageArgs {
    fn apply(&self, layout: &mut card_impose::LayoutOptions) {
        if let Some(paper) = self.paper {
            layout.paper = paper.into();
        }
        if let Some(orientation) = self.orientation {
            layout.orientation = orientation.into();
        }
        if let Some(margin) = self.margin {
            layout.margin_pt = margin;
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorArg {
    Rgb,
    Cmyk,
}

#[derive(Clone, Copy, ValueEnum)]
enum QualityArg {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<ColorArg> for ColorMode {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Rgb => Self::Rgb,
            ColorArg::Cmyk => Self::Cmyk,
        }
    }
}

impl From<QualityArg> for card_impose::ConversionQuality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::High => Self::High,
            QualityArg::Medium => Self::Medium,
            QualityArg::Low => Self::Low,
        }
    }
}

impl From<PaperArg> for card_impose::PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

impl From<OrientationArg> for card_impose::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

/// `data/guests.csv` -> (`data`, `guests`) for a [`CsvDirectory`]
fn dataset_location(path: &Path) -> Result<(PathBuf, String)> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Invalid dataset path {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Ok((dir.to_path_buf(), stem.to_string()))
}

fn store_root(store: Option<PathBuf>, template: &Path) -> PathBuf {
    store.unwrap_or_else(|| {
        template
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()
    })
}

fn build_runtime(
    compose: ComposeOptions,
    cmyk: CmykOptions,
    store_root: PathBuf,
    dataset_dir: PathBuf,
) -> Result<CardRuntime> {
    let fetcher = ReqwestFetcher::new(Duration::from_secs(compose.http_timeout_secs))?;
    let sources = ImageSources::new(Arc::new(DirStore::new(store_root)), Arc::new(fetcher))
        .with_base_dir(compose.base_dir.clone())
        .with_files_prefix(compose.files_prefix.clone());
    let fonts = FontBook::with_extra(compose.font_dirs.as_slice(), compose.font_files.as_slice());
    if fonts.is_empty() {
        log::warn!("No fonts found; text fields will render empty");
    }
    let composer = Composer::new(sources, Arc::new(fonts), compose);
    Ok(CardRuntime::new(
        composer,
        Arc::new(CsvDirectory::new(dataset_dir)),
        CmykConverter::new(cmyk),
    ))
}

/// Log job updates until the sender is dropped
fn spawn_progress_logger(mut updates: mpsc::UnboundedReceiver<JobUpdate>) {
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                JobUpdate::Progress {
                    operation,
                    current,
                    total,
                } => log::info!("{}: {}/{}", operation, current, total),
                JobUpdate::ConversionFallback { reason } => {
                    log::warn!("Delivering RGB: {}", reason)
                }
                JobUpdate::Complete { pages, .. } => log::debug!("Job complete, {} pages", pages),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::AppLogger::from_env(logger::level_for(cli.verbose, cli.quiet)).init()?;
    let mut config = ToolConfig::load_or_default(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Preview {
            template,
            data,
            row,
            output,
            store,
        } => {
            let template_doc = Template::load(&template).await?;
            let (dataset_dir, dataset_id) = dataset_location(&data)?;
            let runtime = build_runtime(
                config.compose,
                config.cmyk,
                store_root(store, &template),
                dataset_dir,
            )?;

            let card = runtime.preview_row(&template_doc, &dataset_id, row).await?;
            tokio::fs::write(&output, &card.png).await?;
            println!(
                "Rendered row {} ({}x{}) → {}",
                row,
                card.width,
                card.height,
                output.display()
            );
        }

        Commands::Batch {
            template,
            data,
            output,
            store,
            color,
            workers,
            page,
            quality,
            gs,
        } => {
            page.apply(&mut config.layout);
            if let Some(quality) = quality {
                config.cmyk.quality = quality.into();
            }
            if let Some(gs) = gs {
                config.cmyk.binary = gs;
            }
            config.cmyk.validate()?;

            let mut options = BatchOptions {
                color_mode: color.into(),
                layout: config.layout,
                ..BatchOptions::default()
            };
            if let Some(workers) = workers.or(config.workers) {
                options.workers = workers;
            }

            let template_doc = Template::load(&template).await?;
            let (dataset_dir, dataset_id) = dataset_location(&data)?;
            let runtime = build_runtime(
                config.compose,
                config.cmyk,
                store_root(store, &template),
                dataset_dir,
            )?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, cancelling batch");
                    on_interrupt.cancel();
                }
            });

            let (tx, rx) = mpsc::unbounded_channel();
            spawn_progress_logger(rx);
            let result = runtime
                .run_batch(&template_doc, &dataset_id, &options, &tx, &cancel)
                .await?;

            tokio::fs::write(&output, &result.document).await?;
            println!("Batch Statistics:");
            println!("  Cards: {}", result.stats.cards);
            println!("  Pages: {}", result.stats.pages);
            println!("  Cards per page: {}", result.stats.cards_per_page);
            println!(
                "  Card size: {:.1} x {:.1} pt",
                result.plan.card_width, result.plan.card_height
            );
            println!("  Color: {:?}", result.color_mode);
            println!("  Fully converted: {}", result.fully_converted);
            if let Some(err) = &result.conversion_error {
                println!("  Conversion error: {}", err);
            }
            println!("Batch → {}", output.display());
        }

        Commands::Plan {
            template,
            aspect,
            cards,
            page,
        } => {
            page.apply(&mut config.layout);
            config.layout.validate()?;
            let aspect = match (template, aspect) {
                (Some(path), _) => Template::load(&path).await?.aspect_ratio(),
                (None, Some(aspect)) => aspect,
                (None, None) => bail!("Either --template or --aspect is required"),
            };

            let plan = config.layout.plan(aspect);
            println!("Layout Plan:");
            println!("  Page: {:.2} x {:.2} pt", plan.page_width, plan.page_height);
            println!("  Margin: {:.1} pt", plan.margin);
            println!(
                "  Card size: {:.1} x {:.1} pt",
                plan.card_width, plan.card_height
            );
            println!(
                "  Grid: {} x {} = {} per page",
                plan.cards_per_row, plan.cards_per_col, plan.cards_per_page
            );
            if plan.is_degenerate() {
                bail!("No card size between the planner's limits fits this page");
            }
            if let Some(cards) = cards {
                let stats = card_impose::calculate_statistics(&plan, cards)?;
                println!("  Pages for {} cards: {}", cards, stats.pages);
                println!("  Empty cells on last page: {}", stats.empty_cells_last_page);
            }
        }

        Commands::CmykSupport { gs } => {
            let binary = gs.unwrap_or(config.cmyk.binary);
            if probe_converter(&binary).await {
                println!("CMYK conversion available ({})", binary);
            } else {
                println!("CMYK conversion unavailable: {} not found; batches stay RGB", binary);
            }
        }

        Commands::Validate { input } => {
            let bytes = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let report = card_impose::validate(&bytes)?;
            println!("Color spaces in {}:", input.display());
            println!("  CMYK: {}", report.is_cmyk);
            println!("  RGB: {}", report.has_rgb);
            println!("  Fully CMYK: {}", report.fully_cmyk());
        }
    }

    Ok(())
}
