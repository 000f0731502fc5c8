use clap::{Parser, Subcommand, ValueEnum};
use geoflow_core::models::{DatasetKind, ParamValue, Tier};
use std::path::PathBuf;

/// GeoFlow - Geospatial analysis sessions from the command line
#[derive(Parser, Debug)]
#[command(name = "geoflow")]
#[command(about = "Upload geospatial data, run analysis tools and export result layers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./geoflow.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subscription tier to run as (free, premium, pro, enterprise)
    #[arg(long, global = true)]
    pub tier: Option<Tier>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List analysis tools
    Tools(ToolsArgs),

    /// Show a tool's parameters
    Describe(DescribeArgs),

    /// Upload files and run a tool on them
    Run(RunArgs),

    /// Show resolved configuration and where each value came from
    Config,
}

/// Dataset kind filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Vector,
    Raster,
    Satellite,
}

impl From<KindArg> for DatasetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Vector => DatasetKind::Vector,
            KindArg::Raster => DatasetKind::Raster,
            KindArg::Satellite => DatasetKind::Satellite,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ToolsArgs {
    /// Only show tools that accept this kind of dataset
    #[arg(long)]
    pub kind: Option<KindArg>,
}

#[derive(Parser, Debug)]
pub struct DescribeArgs {
    /// Tool id (e.g. ndvi_analysis)
    pub tool: String,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Dataset files to upload (GeoJSON, Shapefile, KML, GPX, GeoTIFF, JPEG, PNG)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Tool id to run
    #[arg(long)]
    pub tool: String,

    /// Tool parameter as key=value (repeatable)
    #[arg(long = "param", short = 'p', value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,

    /// Index of the uploaded file to analyze (defaults to the first)
    #[arg(long, default_value_t = 0)]
    pub dataset: usize,

    /// Pause between progress checkpoints, in milliseconds
    #[arg(long)]
    pub progress_interval_ms: Option<u64>,

    /// Fail the job after this many seconds (0 disables the limit)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Write the visible layers to this file
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Export format id (geojson, geotiff, shapefile, csv, pdf_report, cog)
    #[arg(long, default_value = "geojson", requires = "export")]
    pub export_format: String,
}

/// Parse `key=value`; numeric values become numbers
pub fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    Ok((key.to_string(), ParamValue::parse(value)))
}
