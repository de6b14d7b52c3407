//! Categorical Code Tables
//!
//! Maps the nine string-valued policy columns to small ordinal codes for
//! downstream numeric work. The tables are compile-time constants; there is
//! no way to extend or mutate them at runtime.
//!
//! Encoding always works on a copy: `cat_to_numeric` returns a new frame and
//! `encode_row` a new row, the input stays usable by other consumers.

use polars::prelude::*;
use tracing::{debug, warn};

use crate::config::UnmappedPolicy;
use crate::error::{PrepError, Result};
use crate::record::{Row, Value};

/// A categorical column of the claims dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalColumn {
    VehicleAge,     // agecar
    Sex,            // sexp
    Fuel,           // fuelc
    PremiumSplit,   // split
    Usage,          // usec
    Fleet,          // fleetc
    SportVehicle,   // sportc
    Coverage,       // coverp
    Power,          // powerc
}

// ============================================================================
// CODE TABLES
// ============================================================================

static AGECAR_CODES: &[(&str, u8)] = &[("0-1", 0), ("2-5", 1), ("6-10", 2), (">10", 3)];
static SEXP_CODES: &[(&str, u8)] = &[("Male", 0), ("Female", 1)];
static FUELC_CODES: &[(&str, u8)] = &[("Petrol", 0), ("Gasoil", 1)];
static SPLIT_CODES: &[(&str, u8)] = &[("Once", 0), ("Monthly", 1), ("Twice", 2), ("Thrice", 3)];
static USEC_CODES: &[(&str, u8)] = &[("Private", 0), ("Professional", 1)];
static FLEETC_CODES: &[(&str, u8)] = &[("Yes", 0), ("No", 1)];
static SPORTC_CODES: &[(&str, u8)] = &[("Yes", 0), ("No", 1)];
static COVERP_CODES: &[(&str, u8)] = &[("MTPL", 0), ("MTPL+", 1), ("MTPL+++", 2)];
static POWERC_CODES: &[(&str, u8)] = &[("<66", 0), ("66-110", 1), (">110", 2)];

impl CategoricalColumn {
    /// All encoded columns, in the order they are processed
    pub const ALL: [CategoricalColumn; 9] = [
        CategoricalColumn::VehicleAge,
        CategoricalColumn::Sex,
        CategoricalColumn::Fuel,
        CategoricalColumn::PremiumSplit,
        CategoricalColumn::Usage,
        CategoricalColumn::Fleet,
        CategoricalColumn::SportVehicle,
        CategoricalColumn::Coverage,
        CategoricalColumn::Power,
    ];

    /// Column name in the dataset
    pub fn name(self) -> &'static str {
        match self {
            CategoricalColumn::VehicleAge => "agecar",
            CategoricalColumn::Sex => "sexp",
            CategoricalColumn::Fuel => "fuelc",
            CategoricalColumn::PremiumSplit => "split",
            CategoricalColumn::Usage => "usec",
            CategoricalColumn::Fleet => "fleetc",
            CategoricalColumn::SportVehicle => "sportc",
            CategoricalColumn::Coverage => "coverp",
            CategoricalColumn::Power => "powerc",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn codes(self) -> &'static [(&'static str, u8)] {
        match self {
            CategoricalColumn::VehicleAge => AGECAR_CODES,
            CategoricalColumn::Sex => SEXP_CODES,
            CategoricalColumn::Fuel => FUELC_CODES,
            CategoricalColumn::PremiumSplit => SPLIT_CODES,
            CategoricalColumn::Usage => USEC_CODES,
            CategoricalColumn::Fleet => FLEETC_CODES,
            CategoricalColumn::SportVehicle => SPORTC_CODES,
            CategoricalColumn::Coverage => COVERP_CODES,
            CategoricalColumn::Power => POWERC_CODES,
        }
    }

    /// Number of distinct codes; valid codes are `0..cardinality()`
    pub fn cardinality(self) -> usize {
        self.codes().len()
    }
}

// ============================================================================
// LOOKUP FUNCTIONS
// ============================================================================

/// Ordinal code for a category label. Matching is exact (case and whitespace).
///
/// # Examples
/// ```
/// use claims_prep::encoding::{encode_value, CategoricalColumn};
///
/// assert_eq!(encode_value(CategoricalColumn::VehicleAge, "2-5"), Some(1));
/// assert_eq!(encode_value(CategoricalColumn::Coverage, "MTPL+++"), Some(2));
/// assert_eq!(encode_value(CategoricalColumn::Sex, "female"), None);
/// ```
pub fn encode_value(column: CategoricalColumn, value: &str) -> Option<u8> {
    column
        .codes()
        .iter()
        .find(|(label, _)| *label == value)
        .map(|(_, code)| *code)
}

/// Category label for an ordinal code
pub fn decode_value(column: CategoricalColumn, code: u8) -> Option<&'static str> {
    column
        .codes()
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(label, _)| *label)
}

/// Accept an already-encoded numeric value if it is a valid code
fn existing_code(column: CategoricalColumn, value: f64) -> Result<u8> {
    if value.fract() == 0.0 && value >= 0.0 && (value as usize) < column.cardinality() {
        Ok(value as u8)
    } else {
        Err(PrepError::InvalidCategory {
            column: column.name().to_string(),
            value: value.to_string(),
        })
    }
}

fn unmapped(column: CategoricalColumn, value: &str, policy: UnmappedPolicy) -> Result<Option<u8>> {
    match policy {
        UnmappedPolicy::Null => Ok(None),
        UnmappedPolicy::Reject => Err(PrepError::InvalidCategory {
            column: column.name().to_string(),
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// FRAME ENCODING
// ============================================================================

/// Replace the nine categorical columns with their `UInt8` codes
///
/// Returns a new frame; `df` is left untouched. Nulls stay null. Columns
/// that are already numeric are checked against the code range and passed
/// through, so encoding an encoded frame is a no-op.
///
/// # Errors
/// - `Schema` if any of the nine columns is missing
/// - `InvalidCategory` for an unknown label under `UnmappedPolicy::Reject`,
///   or for an out-of-range numeric code under either policy
pub fn cat_to_numeric(df: &DataFrame, policy: UnmappedPolicy) -> Result<DataFrame> {
    let mut out = df.clone();

    for column in CategoricalColumn::ALL {
        let source = df
            .column(column.name())
            .map_err(|_| PrepError::schema(column.name(), "categorical encoding"))?;

        let codes = encode_column(column, source, policy)?;
        out.with_column(codes)?;
    }

    debug!("Encoded {} categorical columns over {} rows", CategoricalColumn::ALL.len(), out.height());
    Ok(out)
}

fn encode_column(column: CategoricalColumn, source: &Column, policy: UnmappedPolicy) -> Result<Series> {
    let dtype = source.dtype();

    let codes: Vec<Option<u8>> = if dtype.is_integer() || dtype.is_float() {
        let values = source.cast(&DataType::Float64)?;
        let values = values.f64()?;
        values
            .into_iter()
            .map(|opt| opt.map(|v| existing_code(column, v)).transpose())
            .collect::<Result<_>>()?
    } else {
        // Also covers Categorical/Enum dtypes by going through their labels
        let labels = source.cast(&DataType::String)?;
        let labels = labels.str()?;

        let mut missing = 0usize;
        let mut codes = Vec::with_capacity(labels.len());
        for label in labels.into_iter() {
            let code = match label {
                None => None,
                Some(label) => match encode_value(column, label) {
                    Some(code) => Some(code),
                    None => {
                        missing += 1;
                        unmapped(column, label, policy)?
                    }
                },
            };
            codes.push(code);
        }

        if missing > 0 {
            warn!("{}: {} value(s) outside the known categories set to null", column.name(), missing);
        }
        codes
    };

    Ok(Series::new(column.name().into(), codes))
}

// ============================================================================
// ROW ENCODING
// ============================================================================

/// Row-level counterpart of `cat_to_numeric`; codes come back as `Value::Int`
pub fn encode_row(row: &Row, policy: UnmappedPolicy) -> Result<Row> {
    let mut out = row.clone();

    for column in CategoricalColumn::ALL {
        let value = row
            .get(column.name())
            .ok_or_else(|| PrepError::schema(column.name(), "categorical encoding"))?;

        let code = match value {
            Value::Null => None,
            Value::Str(label) => match encode_value(column, label) {
                Some(code) => Some(code),
                None => unmapped(column, label, policy)?,
            },
            Value::Int(v) => Some(existing_code(column, *v as f64)?),
            Value::Float(v) => Some(existing_code(column, *v)?),
            Value::Bool(v) => unmapped(column, &v.to_string(), policy)?,
        };

        let encoded = code.map_or(Value::Null, |c| Value::Int(c as i64));
        out.insert(column.name(), encoded);
    }

    Ok(out)
}
