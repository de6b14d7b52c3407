//! Full preparation pass
//!
//! Enrichment, categorical encoding and the average claim column, applied in
//! that order. Each step stays available on its own; this only chains them.

use polars::prelude::*;
use tracing::info;

use crate::claims::with_avg_claim;
use crate::config::PrepConfig;
use crate::encoding::cat_to_numeric;
use crate::error::Result;
use crate::geo::{enrich, GeoTable};

/// Run every transform over `records`, returning a new frame
pub fn prepare(records: &DataFrame, geo: &GeoTable, config: &PrepConfig) -> Result<DataFrame> {
    let enriched = enrich(records, geo, config)?;
    let encoded = cat_to_numeric(&enriched, config.unmapped)?;
    let prepared = with_avg_claim(&encoded, &config.claims)?;

    info!(
        "Prepared {} records: {} → {} columns",
        prepared.height(),
        records.width(),
        prepared.width()
    );
    Ok(prepared)
}
