use anyhow::Context;
use clap::Parser;
use rmosaic::config::{
    DEFAULT_COLORS, DEFAULT_OUTPUT, DEFAULT_SOURCE, DEFAULT_TARGET_WIDTH, DEFAULT_TILE_SIZE,
};
use rmosaic::{build_mosaic, ClosenessKind, MosaicConfig, PhotoOrder};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build a photo mosaic of a target image out of cached photos
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// The target photo to make it look like
    target: PathBuf,

    /// Mosaic width in tiles (final image width is a multiple of it)
    #[arg(long, value_name = "WIDTH", default_value_t = DEFAULT_TARGET_WIDTH)]
    target_width: u32,

    /// Directory of cached photos (all square and of equal size)
    #[arg(long, value_name = "SOURCE_DIR", default_value = DEFAULT_SOURCE)]
    source: PathBuf,

    /// Tile edge length in pixels
    #[arg(long, value_name = "SIZE", default_value_t = DEFAULT_TILE_SIZE)]
    size: u32,

    /// File to write the mosaic to
    #[arg(long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Maximum number of palette colors (clamped to 1-256)
    #[arg(long, default_value_t = DEFAULT_COLORS)]
    colors: usize,

    /// Order in which cached photos are matched
    #[arg(long, value_enum, default_value_t)]
    order: PhotoOrder,

    /// Color closeness function
    #[arg(long, value_enum, default_value_t)]
    closeness: ClosenessKind,

    /// Never match a photo to a color scoring above this
    #[arg(long)]
    max_closeness: Option<f64>,

    /// Extensions of cached photo files
    #[arg(long, value_delimiter = ',', default_value = "jpg,jpeg,png")]
    extensions: Vec<String>,
}

impl From<Args> for MosaicConfig {
    fn from(args: Args) -> Self {
        Self {
            target: args.target,
            target_width: args.target_width,
            source: args.source,
            tile_size: args.size,
            output: args.output,
            colors: args.colors,
            order: args.order,
            closeness: args.closeness,
            max_closeness: args.max_closeness,
            extensions: args.extensions,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rmosaic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config = MosaicConfig::from(Args::parse());
    let report = build_mosaic(&config)
        .with_context(|| format!("building mosaic of {}", config.target.display()))?;
    tracing::info!(
        cells = (report.grid_width as usize * report.grid_height as usize),
        dropped = report.dropped,
        evictions = report.stats.evictions,
        "Picture generated"
    );
    Ok(())
}
