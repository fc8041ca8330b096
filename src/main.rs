mod capacity;
mod config;
mod pipeline;
mod plot;
mod server;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::capacity::drop_zero_capacity;
use crate::capacity::extract::write_solar_capacities;
use crate::capacity::nrel::{
    NrelClient, ResourcePeriod, SolarMetric, SolarQuery, resolve_coordinates,
};
use crate::config::AppConfig;
use crate::pipeline::{WindData, build_figures, load_plants};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the factor that puts east wind capacity factors on the west's scale
    WindFactor {
        /// Defaults to `processing.scaling_precision`
        #[arg(long)]
        precision: Option<usize>,
    },
    /// Query solar irradiance for every plant and wind site and write the solar CSV
    Solar {
        #[arg(long, value_enum, default_value_t = SolarMetric::Ghi)]
        metric: SolarMetric,
        /// Month (1-12) to query instead of the annual average
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(long, default_value_t = 4)]
        precision: usize,
        /// Seconds to wait between requests
        #[arg(long, default_value_t = 3.6)]
        delay: f64,
        #[arg(long)]
        dry_run: bool,
        /// Leave out coordinates whose query failed
        #[arg(long)]
        drop_zeros: bool,
    },
    /// Save the raw API response for every geohash bucket, one per line
    SaveRaw {
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
        #[arg(long, default_value_t = 5)]
        precision: usize,
        #[arg(long, default_value_t = 3.6)]
        delay: f64,
    },
    /// Render every map and histogram to HTML
    Plot,
    /// Render the figures and serve them over HTTP
    Serve,
}

/// Plant and wind site coordinates, the set the solar queries cover
fn query_coordinates(app_config: &AppConfig) -> Result<Vec<capacity::Coordinate>> {
    let mut records = load_plants(app_config)?;
    records.extend(WindData::load(app_config)?.sites());
    Ok(resolve_coordinates(None, Some(&records), None, None)?)
}

fn delay_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid delay: {}", secs))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let app_config = AppConfig::load_from_file(&cli.config)?;

    match cli.command {
        Commands::WindFactor { precision } => {
            let wind = WindData::load(&app_config)?;
            let precision = precision.unwrap_or(app_config.processing.scaling_precision);
            let factor = capacity::bucket::wind_scaling_factor(&wind.west, &wind.east, precision)?;
            println!("{:.6}", factor);
        }
        Commands::Solar {
            metric,
            month,
            precision,
            delay,
            dry_run,
            drop_zeros,
        } => {
            let coordinates = query_coordinates(&app_config)?;
            let query = SolarQuery {
                metric,
                period: month.map_or(ResourcePeriod::Annual, ResourcePeriod::Monthly),
                precision,
                delay: delay_from_secs(delay)?,
                dry_run,
                ..SolarQuery::default()
            };

            let client = NrelClient::new(app_config.credentials.nrel_api_key.clone());
            let mut solar = client.query_solar_capacities(&coordinates, &query).await?;
            if dry_run {
                return Ok(());
            }
            if drop_zeros {
                solar = drop_zero_capacity(solar);
            }

            write_solar_capacities(&app_config.data.solar_csv, &solar)?;
            info!(
                "wrote {} solar capacities to {}",
                solar.len(),
                app_config.data.solar_csv.display()
            );
        }
        Commands::SaveRaw {
            out,
            precision,
            delay,
        } => {
            let coordinates = query_coordinates(&app_config)?;
            let client = NrelClient::new(app_config.credentials.nrel_api_key.clone());
            client
                .save_raw_responses(&coordinates, precision, delay_from_secs(delay)?, &out)
                .await?;
        }
        Commands::Plot => {
            let figures = build_figures(&app_config)?;
            for figure in &figures {
                let path = figure.write_html(&app_config.output.figure_dir)?;
                info!("wrote {}", path.display());
            }
        }
        Commands::Serve => {
            let figures = build_figures(&app_config)?;
            server::start_server(figures, app_config.server.port).await?;
        }
    }

    Ok(())
}
