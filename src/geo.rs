//! Postal Code Enrichment
//!
//! Joins geographic attributes (latitude, longitude, ...) onto policy records
//! by postal code, replacing the code itself.
//!
//! The reference table keeps only its key and geographic columns: the
//! internal identifier and locality name are dropped at construction. Keys
//! are unique after construction, so the left join never adds rows.

use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::PrepConfig;
use crate::data::load_frame;
use crate::error::{PrepError, Result};

/// Row counter used to restore input order after the join
const ROW_ORDER_COLUMN: &str = "__claims_prep_row";

/// Marker that is non-null exactly on rows that found a postal code
const MATCHED_COLUMN: &str = "__claims_prep_matched";

/// Read-only postal code → geographic attributes table
#[derive(Debug, Clone)]
pub struct GeoTable {
    /// Key column (normalised to strings) followed by the attribute columns
    frame: DataFrame,

    key: String,
}

impl GeoTable {
    /// Load the reference table from CSV or Parquet
    ///
    /// # Errors
    /// - `ResourceUnavailable` if the file cannot be read
    /// - `Schema` if it has no postal code column
    pub fn load(path: &Path, config: &PrepConfig) -> Result<Self> {
        let raw = load_frame(path)?;
        let table = Self::from_frame(&raw, config)?;
        info!(
            "Reference table {}: {} postal codes, attributes {:?}",
            path.display(),
            table.len(),
            table.attribute_names()
        );
        Ok(table)
    }

    /// Build the table from an already loaded frame
    pub fn from_frame(raw: &DataFrame, config: &PrepConfig) -> Result<Self> {
        let key = config.postal_column.as_str();
        let key_column = raw
            .column(key)
            .map_err(|_| PrepError::schema(key, "reference table"))?;

        let mut frame = raw.clone();
        for name in &config.reference_drop_columns {
            if frame.get_column_index(name).is_some() {
                frame = frame.drop(name)?;
            }
        }
        frame.with_column(join_key(key_column)?)?;

        let before = frame.height();
        let frame = frame
            .lazy()
            .filter(col(key).is_not_null())
            .unique_stable(Some(vec![key.into()]), UniqueKeepStrategy::First)
            .collect()?;

        if frame.height() < before {
            debug!(
                "Reference table: collapsed {} duplicate or null postal code rows",
                before - frame.height()
            );
        }

        Ok(GeoTable {
            frame,
            key: key.to_string(),
        })
    }

    /// Number of distinct postal codes
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Geographic columns that `enrich` appends
    pub fn attribute_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != self.key)
            .map(|name| name.to_string())
            .collect()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

/// Postal codes as strings so numeric and text keys join on equal footing
///
/// Whole floats (e.g. from a CSV column with blanks) are written as integers
/// so `1000.0` matches `1000`. A fractional float is not a postal code and
/// becomes null, which never matches.
fn join_key(column: &Column) -> Result<Column> {
    let dtype = column.dtype();
    let key = if dtype.is_float() {
        let floats = column.cast(&DataType::Float64)?;
        let codes: Vec<Option<String>> = floats
            .f64()?
            .into_iter()
            .map(|opt| {
                opt.filter(|v| v.is_finite() && v.fract() == 0.0)
                    .map(|v| format!("{}", v as i64))
            })
            .collect();
        Series::new(column.name().clone(), codes).into()
    } else if dtype == &DataType::String {
        column.clone()
    } else {
        column.cast(&DataType::String)?
    };
    Ok(key)
}

/// Left join geographic attributes onto `records` and drop the postal code
///
/// Every input row is kept, in order. Rows whose postal code is absent from
/// the reference get nulls in the appended columns. A record column that
/// shares its name with a reference attribute is replaced by the reference
/// value. `records` is not modified.
///
/// # Errors
/// `Schema` if `records` lacks the postal code column.
pub fn enrich(records: &DataFrame, geo: &GeoTable, config: &PrepConfig) -> Result<DataFrame> {
    let key = config.postal_column.as_str();
    if key != geo.key {
        return Err(PrepError::schema(key, "reference table"));
    }

    let key_column = records
        .column(key)
        .map_err(|_| PrepError::schema(key, "records"))?;

    let mut left = records.clone();
    left.with_column(join_key(key_column)?)?;

    for attribute in geo.attribute_names() {
        if left.get_column_index(&attribute).is_some() {
            warn!("Record column '{}' is replaced by the reference attribute", attribute);
            left = left.drop(&attribute)?;
        }
    }

    let right = geo
        .frame
        .clone()
        .lazy()
        .with_column(lit(true).alias(MATCHED_COLUMN));

    let joined = left
        .lazy()
        .with_row_index(ROW_ORDER_COLUMN, None)
        .left_join(right, col(key), col(key))
        .sort([ROW_ORDER_COLUMN], SortMultipleOptions::default())
        .collect()?;

    let unmatched = joined.column(MATCHED_COLUMN)?.null_count();
    if unmatched > 0 {
        warn!("{} of {} records have no matching postal code", unmatched, joined.height());
    }

    let joined = joined
        .drop(MATCHED_COLUMN)?
        .drop(ROW_ORDER_COLUMN)?
        .drop(key)?;

    debug!(
        "Enriched {} records with {} geographic attributes",
        joined.height(),
        geo.attribute_names().len()
    );
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DataFrame {
        df![
            "INS" => &[21004i64, 44021, 62063],
            "COMMUNE" => &["Bruxelles", "Gent", "Liege"],
            "CODPOSS" => &[1000i64, 9000, 4000],
            "LAT" => &[50.85, 51.05, 50.63],
            "LONG" => &[4.35, 3.72, 5.57],
        ]
        .unwrap()
    }

    fn records() -> DataFrame {
        df![
            "CODPOSS" => &[9000i64, 1234, 1000, 9000],
            "chargtot" => &[10.0, 20.0, 30.0, 40.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_reference_drops_non_geographic_columns() {
        let geo = GeoTable::from_frame(&reference(), &PrepConfig::default()).unwrap();
        assert_eq!(geo.attribute_names(), vec!["LAT".to_string(), "LONG".to_string()]);
        assert_eq!(geo.len(), 3);
        assert!(!geo.is_empty());

        let empty = reference().head(Some(0));
        assert!(GeoTable::from_frame(&empty, &PrepConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_clashing_record_column_is_replaced() {
        let config = PrepConfig::default();
        let geo = GeoTable::from_frame(
            &df!["CODPOSS" => &[1000i64], "LAT" => &[50.85]].unwrap(),
            &config,
        )
        .unwrap();
        let input = df![
            "CODPOSS" => &[1000i64, 2000],
            "LAT" => &[1.0, 2.0],
        ]
        .unwrap();

        let out = enrich(&input, &geo, &config).unwrap();
        assert_eq!(
            out.get_column_names().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["LAT"]
        );
        let lat: Vec<Option<f64>> = out.column("LAT").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(lat, vec![Some(50.85), None]);

        // Input keeps its own column
        assert_eq!(input.column("LAT").unwrap().f64().unwrap().get(0), Some(1.0));
    }

    #[test]
    fn test_fractional_float_key_never_matches() {
        let config = PrepConfig::default();
        let geo = GeoTable::from_frame(&reference(), &config).unwrap();
        let input = df!["CODPOSS" => &[1000.9, 1000.0]].unwrap();

        let out = enrich(&input, &geo, &config).unwrap();
        let lat: Vec<Option<f64>> = out.column("LAT").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(lat, vec![None, Some(50.85)]);
    }

    #[test]
    fn test_enrich_left_join() {
        let config = PrepConfig::default();
        let geo = GeoTable::from_frame(&reference(), &config).unwrap();
        let input = records();

        let out = enrich(&input, &geo, &config).unwrap();

        assert_eq!(out.height(), input.height());
        assert!(out.column("CODPOSS").is_err());
        assert_eq!(
            out.get_column_names().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["chargtot", "LAT", "LONG"]
        );

        let charges: Vec<Option<f64>> = out.column("chargtot").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(charges, vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0)]);

        let lat: Vec<Option<f64>> = out.column("LAT").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(lat, vec![Some(51.05), None, Some(50.85), Some(51.05)]);

        // Input untouched
        assert!(input.column("CODPOSS").is_ok());
        assert_eq!(input.width(), 2);
    }

    #[test]
    fn test_duplicate_reference_keys_do_not_multiply_rows() {
        let config = PrepConfig::default();
        let dup = df![
            "CODPOSS" => &[1000i64, 1000, 9000],
            "LAT" => &[50.85, 0.0, 51.05],
        ]
        .unwrap();
        let geo = GeoTable::from_frame(&dup, &config).unwrap();
        assert_eq!(geo.len(), 2);

        let out = enrich(&records(), &geo, &config).unwrap();
        assert_eq!(out.height(), 4);
        assert_eq!(out.column("LAT").unwrap().f64().unwrap().get(2), Some(50.85));
    }

    #[test]
    fn test_string_records_join_numeric_reference() {
        let config = PrepConfig::default();
        let geo = GeoTable::from_frame(&reference(), &config).unwrap();
        let input = df![
            "CODPOSS" => &[Some("4000"), None, Some("9999")],
        ]
        .unwrap();

        let out = enrich(&input, &geo, &config).unwrap();
        let lat: Vec<Option<f64>> = out.column("LAT").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(lat, vec![Some(50.63), None, None]);
    }

    #[test]
    fn test_missing_postal_column() {
        let config = PrepConfig::default();
        let geo = GeoTable::from_frame(&reference(), &config).unwrap();

        let input = df!["chargtot" => &[1.0]].unwrap();
        let err = enrich(&input, &geo, &config).unwrap_err();
        assert!(matches!(err, PrepError::Schema { ref column, .. } if column == "CODPOSS"));

        let bad_reference = reference().drop("CODPOSS").unwrap();
        let err = GeoTable::from_frame(&bad_reference, &config).unwrap_err();
        assert!(matches!(err, PrepError::Schema { .. }));
    }

    #[test]
    fn test_load_missing_reference() {
        let err = GeoTable::load(Path::new("/nonexistent/inspost.csv"), &PrepConfig::default())
            .unwrap_err();
        assert!(matches!(err, PrepError::ResourceUnavailable { .. }));
    }
}
