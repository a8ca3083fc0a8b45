mod base;
mod enrich;
mod estimate;
mod job;
mod lister;
mod partition;
mod store;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use base::{Bucket, DatasetSpec};
use estimate::HttpEstimateSource;
use store::FileStore;

const TOKEN_ENV: &str = "TOURIST_API_TOKEN";

#[derive(Parser, Debug)]
#[command(
    name = "partition-enrich",
    version,
    about = "Enrich partitioned weather/pollution data with tourist estimates for Iasi"
)]
struct Cli {
    /// Bucket holding the partitioned datasets
    #[arg(long, value_name = "NAME")]
    bucket: String,

    /// Object-store root directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    store_root: PathBuf,

    /// Upstream estimate API endpoint
    #[arg(long, value_name = "URL")]
    api_url: String,

    /// Source prefix for weather data
    #[arg(long, value_name = "PREFIX", default_value = "weather_partitioned/")]
    weather_prefix: String,

    /// Destination prefix for enriched weather data
    #[arg(
        long,
        value_name = "PREFIX",
        default_value = "weather_partitioned_enriched/"
    )]
    weather_out_prefix: String,

    /// Source prefix for pollution data
    #[arg(long, value_name = "PREFIX", default_value = "pollution_partitioned/")]
    pollution_prefix: String,

    /// Destination prefix for enriched pollution data
    #[arg(
        long,
        value_name = "PREFIX",
        default_value = "pollution_partitioned_enriched/"
    )]
    pollution_out_prefix: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let token =
        env::var(TOKEN_ENV).with_context(|| format!("read API token from ${TOKEN_ENV}"))?;

    let store = FileStore::new(cli.store_root);
    let source = HttpEstimateSource::new(cli.api_url, token);
    let bucket = Bucket::new(cli.bucket);
    let specs = vec![
        DatasetSpec::new("weather", cli.weather_prefix, cli.weather_out_prefix),
        DatasetSpec::new("pollution", cli.pollution_prefix, cli.pollution_out_prefix),
    ];

    let summary = job::run(&store, &source, &bucket, &specs)?;
    info!(
        datasets = summary.datasets,
        objects = summary.objects_written,
        unique_dates = summary.unique_dates,
        "run complete"
    );
    Ok(())
}
