//! Firefleet - plan fire vehicle dispatch from incident locations

mod config;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use firefleet_core::{
    plan_dispatch, read_geojson, to_feature_collection, validate_vehicle_count, DispatchPlan,
    KMeansConfig, PlanOptions, RouteOptions, DRIVING_PROFILE,
};
use firefleet_services::{NominatimClient, OrsClient};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Full plan as JSON
    Plan,
    /// GeoJSON FeatureCollection for map rendering
    Geojson,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// GeoJSON file with incident locations
    input: PathBuf,

    /// Number of vehicles to dispatch
    #[arg(allow_hyphen_values = true)]
    vehicles: i64,

    /// Seed for reproducible clustering
    #[arg(long)]
    seed: Option<u64>,

    /// K-means restarts, best result wins
    #[arg(long, default_value_t = 10)]
    restarts: usize,

    #[arg(long, value_enum, default_value_t = Format::Plan)]
    format: Format,

    /// Write output here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Routing profile
    #[arg(long, default_value = DRIVING_PROFILE)]
    profile: String,

    /// Concurrent service requests (defaults to FIREFLEET_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Skip reverse geocoding
    #[arg(long)]
    no_geocode: bool,

    /// Skip route resolution
    #[arg(long)]
    no_routes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine readable.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("firefleet=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let vehicles = validate_vehicle_count(args.vehicles)?;
    let collection = read_geojson(&args.input)
        .with_context(|| format!("Failed to read incidents from {}", args.input.display()))?;

    let options = PlanOptions {
        kmeans: KMeansConfig {
            n_init: args.restarts.max(1),
            seed: args.seed,
            ..KMeansConfig::default()
        },
    };
    let mut plan = plan_dispatch(&collection, vehicles, &options)?;
    tracing::info!(
        "Planned {} groups for {} incidents (seed {})",
        plan.groups.len(),
        plan.points.len(),
        plan.seed
    );

    let concurrency = args.concurrency.unwrap_or(config.concurrency).max(1);
    enrich(&mut plan, &args, &config, concurrency).await?;

    let rendered = match args.format {
        Format::Plan => serde_json::to_string_pretty(&plan)?,
        Format::Geojson => serde_json::to_string_pretty(&to_feature_collection(&plan))?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

async fn enrich(plan: &mut DispatchPlan, args: &Args, config: &Config, concurrency: usize) -> Result<()> {
    if !args.no_geocode {
        let geocoder = NominatimClient::new(
            config.nominatim_url.clone(),
            &config.geocoder_user_agent,
            config.service_timeout,
        )?
        .with_min_interval(config.geocoder_min_interval);
        plan.annotate_places(&geocoder, concurrency).await;
    }

    if !args.no_routes {
        let router = OrsClient::new(
            config.ors_base_url.clone(),
            config.ors_api_key.clone(),
            config.service_timeout,
        )?;
        let options = RouteOptions {
            profile: args.profile.clone(),
            concurrency,
        };
        plan.resolve_routes(&router, &options).await;

        let failed = plan.routes.iter().filter(|r| !r.is_resolved()).count();
        if failed > 0 {
            tracing::warn!("{} of {} routes could not be resolved", failed, plan.routes.len());
        }
    }

    Ok(())
}
