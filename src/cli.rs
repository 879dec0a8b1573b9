use crate::config::load_config;
use crate::layout::compute_layout;
use crate::layout::text::{
    CalibratedMeasurer, FixedAdvanceMeasurer, SystemFontMeasurer, TextMetricsProvider,
};
use crate::layout_dump::{layout_dump_json, write_layout_dump};
use crate::request::parse_request;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "chartfit",
    version,
    about = "Area-proportional chart layout with fitted, non-overlapping labels"
)]
pub struct Args {
    /// Chart request file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file (theme and layout tuning)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Text measurement backend
    #[arg(short = 'm', long = "metrics", value_enum, default_value = "calibrated")]
    pub metrics: MetricsBackend,

    /// Width, overriding the request
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Height, overriding the request
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Pretty-print the JSON dump
    #[arg(long = "pretty")]
    pub pretty: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsBackend {
    /// Fixed advance per character
    Fixed,
    /// Per-character width table
    Calibrated,
    /// System fonts, falling back to the width table
    System,
}

impl MetricsBackend {
    pub fn provider(self) -> Box<dyn TextMetricsProvider> {
        match self {
            MetricsBackend::Fixed => Box::new(FixedAdvanceMeasurer::default()),
            MetricsBackend::Calibrated => Box::new(CalibratedMeasurer),
            MetricsBackend::System => Box::new(SystemFontMeasurer),
        }
    }
}

pub fn run() -> Result<()> {
    init_logging();
    let args = Args::parse();
    run_with(&args)
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

pub fn run_with(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let mut request = parse_request(&input).context("failed to parse chart request")?;
    if let Some(width) = args.width {
        request.width = width;
    }
    if let Some(height) = args.height {
        request.height = height;
    }

    let metrics = args.metrics.provider();
    let layout = compute_layout(&request, &config.theme, &config.layout, metrics.as_ref());
    tracing::info!(
        chart = layout.kind.as_str(),
        width = layout.width,
        height = layout.height,
        empty = layout.is_empty(),
        "layout computed"
    );

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &layout, args.pretty)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", layout_dump_json(&layout, args.pretty)?),
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
