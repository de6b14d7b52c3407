//! Prepare a claims record set for modelling
//!
//! Loads policy records, joins geographic attributes by postal code, encodes
//! the categorical columns and appends the average claim per policy.
//!
//! Usage:
//!   prepare_claims <input.csv|parquet> <output.csv|parquet>
//!
//! Environment:
//!   PREP_CONFIG     JSON configuration file (optional, defaults otherwise)
//!   PREP_REFERENCE  postal code reference table (overrides the config file)
//!   RUST_LOG        log filter (default: claims_prep=info,warn)

use anyhow::{bail, Context, Result};
use claims_prep::{data, prepare, GeoTable, PrepConfig};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claims_prep=info,prepare_claims=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("usage: {} <input> <output>", args.first().map(String::as_str).unwrap_or("prepare_claims"));
    }
    let input = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);

    let config = match std::env::var_os("PREP_CONFIG") {
        Some(path) => PrepConfig::load(&PathBuf::from(&path))
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => PrepConfig::default(),
    };
    let reference_path = config
        .reference_path_or(std::env::var_os("PREP_REFERENCE").map(PathBuf::from))
        .context("Set PREP_REFERENCE or reference_path in the configuration")?;

    tracing::info!("Configuration:");
    tracing::info!("  Input:     {}", input.display());
    tracing::info!("  Output:    {}", output.display());
    tracing::info!("  Reference: {}", reference_path.display());
    tracing::info!("  Unmapped:  {:?}", config.unmapped);

    let start = Instant::now();

    let records = data::load_frame(&input)
        .with_context(|| format!("Failed to load records: {}", input.display()))?;
    let geo = GeoTable::load(&reference_path, &config)
        .with_context(|| format!("Failed to load reference table: {}", reference_path.display()))?;

    let mut prepared = prepare(&records, &geo, &config).context("Preparation failed")?;

    data::write_frame(&mut prepared, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!("Done in {:.3} s", start.elapsed().as_secs_f64());
    Ok(())
}
