//! Claims dataset preparation
//!
//! Stateless transforms over a polars `DataFrame` of motor insurance policies:
//! - `geo`: postal code → geographic attributes (left join)
//! - `encoding`: categorical columns → ordinal `UInt8` codes
//! - `claims`: average charge per claim with a zero-count guard
//!
//! Every transform returns a new frame and leaves its input untouched.
//! `pipeline::prepare` chains the three; `reference_cache` keeps loaded
//! reference tables around for callers that enrich repeatedly.

pub mod claims;
pub mod config;
pub mod data;
pub mod encoding;
pub mod error;
pub mod geo;
pub mod pipeline;
pub mod record;
pub mod reference_cache;

// Re-export commonly used types
pub use claims::{avg_claim, avg_claims, with_avg_claim};
pub use config::{ClaimColumns, PrepConfig, UnmappedPolicy};
pub use encoding::{cat_to_numeric, encode_row, CategoricalColumn};
pub use error::{PrepError, Result};
pub use geo::{enrich, GeoTable};
pub use pipeline::prepare;
pub use record::{Row, Value};
pub use reference_cache::GeoTableCache;
