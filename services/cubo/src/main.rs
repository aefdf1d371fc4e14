//! Earth Observation mini-cube tool.
//!
//! - `cubo bbox`: pixel-aligned UTM bounding box of a cube around a point
//! - `cubo create`: search a STAC catalog and write the cube manifest

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use cubo_common::{CuboError, EdgeUnit, GeoPoint};
use minicube::{
    BoundingBoxResolver, CubeClient, PixelAnchor, StacClientConfig, StacFetcher,
    PLANETARY_COMPUTER_STAC,
};

use config::RequestFile;

#[derive(Parser, Debug)]
#[command(name = "cubo")]
#[command(about = "Earth Observation mini-cubes around a point", version)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the bounding box of a cube as JSON
    Bbox {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Edge length, in `edge_unit`
        #[arg(long, default_value = "128")]
        edge_size: f64,

        /// Unit of the edge length (px, m, km, ft, ...)
        #[arg(long, default_value = "px")]
        edge_unit: String,

        /// Pixel size in metres
        #[arg(long, default_value = "10")]
        resolution: f64,
    },

    /// Search a STAC catalog and write the cube manifest as JSON
    Create(CreateArgs),
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// YAML request file; flags override its values
    #[arg(long)]
    request: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Collection name in the catalog
    #[arg(long)]
    collection: Option<String>,

    /// First date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// Last date (YYYY-MM-DD), inclusive
    #[arg(long)]
    end: Option<String>,

    /// Band to include; repeat for several (default: every data asset)
    #[arg(long = "band")]
    bands: Vec<String>,

    #[arg(long)]
    edge_size: Option<f64>,

    #[arg(long)]
    edge_unit: Option<String>,

    #[arg(long)]
    resolution: Option<f64>,

    /// Label pixel centres instead of upper-left corners
    #[arg(long)]
    center: bool,

    /// STAC API endpoint
    #[arg(long, env = "CUBO_STAC_URL")]
    stac: Option<String>,

    /// Stop after this many items
    #[arg(long)]
    max_items: Option<usize>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "CUBO_HTTP_TIMEOUT", default_value = "60")]
    timeout_secs: u64,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl CreateArgs {
    fn overrides(&self) -> RequestFile {
        RequestFile {
            lat: self.lat,
            lon: self.lon,
            collection: self.collection.clone(),
            start_date: self.start.clone(),
            end_date: self.end.clone(),
            bands: (!self.bands.is_empty()).then(|| self.bands.clone()),
            edge_size: self.edge_size,
            edge_unit: self.edge_unit.as_deref().map(EdgeUnit::parse),
            resolution: self.resolution,
            pixel_anchor: self.center.then_some(PixelAnchor::Center),
            stac: self.stac.clone(),
            max_items: self.max_items,
            query: Default::default(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr; stdout carries the JSON result
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// 2 for invalid input, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CuboError>() {
        Some(e) if e.is_user_error() => 2,
        _ => 1,
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Bbox {
            lat,
            lon,
            edge_size,
            edge_unit,
            resolution,
        } => {
            let geometry = BoundingBoxResolver::new().locate(
                GeoPoint::new(lat, lon)?,
                resolution,
                edge_size,
                &EdgeUnit::parse(&edge_unit),
            )?;
            println!("{}", serde_json::to_string_pretty(&geometry)?);
            Ok(())
        }
        Commands::Create(args) => create(args).await,
    }
}

async fn create(args: CreateArgs) -> Result<()> {
    let file = match &args.request {
        Some(path) => RequestFile::load(path)?,
        None => RequestFile::default(),
    };
    let request = file.merge(args.overrides()).into_request(PLANETARY_COMPUTER_STAC)?;

    info!(
        collection = %request.collection,
        lat = request.lat,
        lon = request.lon,
        dates = %request.dates.to_interval(),
        "Creating cube"
    );

    let config = StacClientConfig {
        request_timeout: Duration::from_secs(args.timeout_secs),
        ..Default::default()
    };
    let client = CubeClient::new(StacFetcher::new(config)?);
    let cube = client.create(&request).await?;

    info!(
        bands = cube.bands.len(),
        times = cube.times.len(),
        edge_pixels = cube.x.len(),
        "Cube assembled"
    );

    let json = serde_json::to_string_pretty(&cube.manifest())?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Manifest written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bbox() {
        let cli = Cli::try_parse_from([
            "cubo", "bbox", "--lat", "-33.8688", "--lon", "151.2093", "--edge-size", "1.28",
            "--edge-unit", "km",
        ])
        .unwrap();
        match cli.command {
            Commands::Bbox {
                lat, edge_unit, ..
            } => {
                assert_eq!(lat, -33.8688);
                assert_eq!(edge_unit, "km");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_create_overrides() {
        let cli = Cli::try_parse_from([
            "cubo", "--log-format", "json", "create", "--lat", "50", "--lon", "10",
            "--collection", "sentinel-2-l2a", "--start", "2021-06-01", "--end", "2021-06-10",
            "--band", "B02", "--band", "B03", "--center",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        let request = args
            .overrides()
            .into_request(PLANETARY_COMPUTER_STAC)
            .unwrap();
        assert_eq!(request.bands.as_deref().unwrap(), ["B02", "B03"]);
        assert_eq!(request.pixel_anchor, PixelAnchor::Center);
        assert_eq!(request.edge_size, 128.0);
    }

    #[test]
    fn test_exit_codes() {
        let user: anyhow::Error = CuboError::UnknownUnit("furlong-typo".into()).into();
        assert_eq!(exit_code(&user), 2);

        let wrapped = anyhow::Error::from(CuboError::InvalidDate("bad".into())).context("parsing");
        assert_eq!(exit_code(&wrapped), 2);

        let remote: anyhow::Error = CuboError::Http("connection refused".into()).into();
        assert_eq!(exit_code(&remote), 1);
    }
}
