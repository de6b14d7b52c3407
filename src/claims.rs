//! Average Claim per Policy
//!
//! `avg_claim = chargtot / nbrtotc`, defined as 0 when there were no claims.

use polars::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use crate::config::ClaimColumns;
use crate::error::{PrepError, Result};
use crate::record::{Row, Value};

/// Ratio with the zero-count guard
#[inline]
pub fn claim_rate(count: f64, charge: f64) -> f64 {
    if count == 0.0 {
        0.0
    } else {
        charge / count
    }
}

fn numeric_field(row: &Row, column: &str, row_idx: usize) -> Result<f64> {
    let value = row
        .get(column)
        .ok_or_else(|| PrepError::schema(column, "average claim"))?;

    value.as_f64().ok_or_else(|| PrepError::InvalidValue {
        column: column.to_string(),
        row: row_idx,
        value: match value {
            Value::Str(s) => format!("'{}'", s),
            other => other.to_string(),
        },
    })
}

/// Average charge per claim for one row
///
/// # Errors
/// - `Schema` if either field is missing
/// - `InvalidValue` if a field is null or not numeric
pub fn avg_claim(row: &Row, columns: &ClaimColumns) -> Result<f64> {
    avg_claim_at(row, columns, 0)
}

fn avg_claim_at(row: &Row, columns: &ClaimColumns, row_idx: usize) -> Result<f64> {
    let count = numeric_field(row, &columns.count, row_idx)?;
    let charge = numeric_field(row, &columns.charge, row_idx)?;
    Ok(claim_rate(count, charge))
}

/// Average claim for every row, computed in parallel
///
/// Rows are independent; any failing row fails the whole batch.
pub fn avg_claims(rows: &[Row], columns: &ClaimColumns) -> Result<Vec<f64>> {
    rows.par_iter()
        .enumerate()
        .map(|(idx, row)| avg_claim_at(row, columns, idx))
        .collect()
}

/// Cast a column to `f64` values, rejecting nulls, non-finite and unparsable values
///
/// Only numeric and string columns are accepted; a boolean column is not a count.
fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PrepError::schema(name, "average claim"))?;

    let dtype = column.dtype();
    if !(dtype.is_integer() || dtype.is_float() || dtype == &DataType::String) {
        return Err(PrepError::InvalidValue {
            column: name.to_string(),
            row: 0,
            value: format!("column of type {}", dtype),
        });
    }

    let cast = column.cast(&DataType::Float64)?;

    // A null after casting is either a missing cell or a value the cast could not parse
    let mut values = Vec::with_capacity(cast.len());
    for (idx, value) in cast.f64()?.into_iter().enumerate() {
        match value {
            Some(v) if v.is_finite() => values.push(v),
            _ => {
                return Err(PrepError::InvalidValue {
                    column: name.to_string(),
                    row: idx,
                    value: column.get(idx)?.to_string(),
                })
            }
        }
    }
    Ok(values)
}

/// Append the average claim column to a copy of `df`
pub fn with_avg_claim(df: &DataFrame, columns: &ClaimColumns) -> Result<DataFrame> {
    let counts = float_values(df, &columns.count)?;
    let charges = float_values(df, &columns.charge)?;

    let rates: Vec<f64> = counts
        .iter()
        .zip(&charges)
        .map(|(&count, &charge)| claim_rate(count, charge))
        .collect();

    let mut out = df.clone();
    out.with_column(Series::new(columns.output.as_str().into(), rates))?;

    debug!("Computed '{}' for {} rows", columns.output, out.height());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(count: Value, charge: Value) -> Row {
        Row::new().with("nbrtotc", count).with("chargtot", charge)
    }

    #[test]
    fn test_zero_claims_is_zero() {
        let columns = ClaimColumns::default();
        for charge in [0.0, 500.0, -12.5, 1e12] {
            let rate = avg_claim(&row(Value::Int(0), Value::Float(charge)), &columns).unwrap();
            assert_eq!(rate, 0.0);
        }
    }

    #[test]
    fn test_average_claim() {
        let columns = ClaimColumns::default();
        let rate = avg_claim(&row(Value::Int(2), Value::Int(500)), &columns).unwrap();
        assert_relative_eq!(rate, 250.0, epsilon = 1e-12);

        let rate = avg_claim(&row(Value::Int(3), Value::Float(100.0)), &columns).unwrap();
        assert_relative_eq!(rate, 33.3333, epsilon = 0.0001);

        // Numeric strings are coerced
        let rate = avg_claim(&row(Value::Str("4".into()), Value::Str("10".into())), &columns).unwrap();
        assert_relative_eq!(rate, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_field() {
        let columns = ClaimColumns::default();
        let partial = Row::new().with("nbrtotc", Value::Int(1));
        let err = avg_claim(&partial, &columns).unwrap_err();
        assert!(matches!(err, PrepError::Schema { ref column, .. } if column == "chargtot"));
    }

    #[test]
    fn test_invalid_value() {
        let columns = ClaimColumns::default();
        let err = avg_claim(&row(Value::Str("many".into()), Value::Int(1)), &columns).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { ref column, .. } if column == "nbrtotc"));

        let err = avg_claim(&row(Value::Int(1), Value::Null), &columns).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { ref column, .. } if column == "chargtot"));

        let err = avg_claim(&row(Value::Str("NaN".into()), Value::Int(500)), &columns).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { ref column, .. } if column == "nbrtotc"));

        let err = avg_claim(&row(Value::Int(1), Value::Str("inf".into())), &columns).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { ref column, .. } if column == "chargtot"));
    }

    #[test]
    fn test_with_avg_claim_rejects_boolean_column() {
        let df = df![
            "nbrtotc" => &[true, false],
            "chargtot" => &[500.0, 500.0],
        ]
        .unwrap();

        let err = with_avg_claim(&df, &ClaimColumns::default()).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { ref column, .. } if column == "nbrtotc"));
    }

    #[test]
    fn test_with_avg_claim_rejects_non_finite() {
        let df = df![
            "nbrtotc" => &["1", "NaN"],
            "chargtot" => &[500.0, 500.0],
        ]
        .unwrap();
        let err = with_avg_claim(&df, &ClaimColumns::default()).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { row: 1, ref column, .. } if column == "nbrtotc"));

        let df = df![
            "nbrtotc" => &[1i64, 2],
            "chargtot" => &[500.0, f64::INFINITY],
        ]
        .unwrap();
        let err = with_avg_claim(&df, &ClaimColumns::default()).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { row: 1, ref column, .. } if column == "chargtot"));
    }

    #[test]
    fn test_avg_claims_parallel_reports_row() {
        let columns = ClaimColumns::default();
        let rows = vec![
            row(Value::Int(0), Value::Int(500)),
            row(Value::Int(2), Value::Int(500)),
            row(Value::Int(4), Value::Float(10.0)),
        ];
        assert_eq!(avg_claims(&rows, &columns).unwrap(), vec![0.0, 250.0, 2.5]);

        let mut bad = rows.clone();
        bad.push(row(Value::Bool(true), Value::Int(1)));
        let err = avg_claims(&bad, &columns).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { row: 3, .. }));
    }

    #[test]
    fn test_with_avg_claim_frame() {
        let df = df![
            "nbrtotc" => &[0i64, 2, 5],
            "chargtot" => &[500.0, 500.0, 0.0],
        ]
        .unwrap();

        let out = with_avg_claim(&df, &ClaimColumns::default()).unwrap();
        let rates: Vec<Option<f64>> = out.column("avg_claim").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(rates, vec![Some(0.0), Some(250.0), Some(0.0)]);

        assert_eq!(df.width(), 2);
        assert_eq!(out.width(), 3);
    }

    #[test]
    fn test_with_avg_claim_null_count() {
        let df = df![
            "nbrtotc" => &[Some(1i64), None],
            "chargtot" => &[10.0, 20.0],
        ]
        .unwrap();

        let err = with_avg_claim(&df, &ClaimColumns::default()).unwrap_err();
        assert!(matches!(err, PrepError::InvalidValue { row: 1, ref column, .. } if column == "nbrtotc"));
    }

    #[test]
    fn test_with_avg_claim_missing_column() {
        let df = df!["nbrtotc" => &[1i64]].unwrap();
        let err = with_avg_claim(&df, &ClaimColumns::default()).unwrap_err();
        assert!(matches!(err, PrepError::Schema { .. }));
    }
}
