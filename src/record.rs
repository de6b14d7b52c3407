//! Row-level view of a record set
//!
//! Frames are the main currency of the crate, but the claim-rate and
//! encoding contracts are also defined per row. `Row` is that row: a map
//! from column name to a loosely typed `Value`, readable from JSON or from
//! any row of a `DataFrame`.

use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// A single cell
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Finite numeric view of the value
    ///
    /// Strings are parsed. Booleans, nulls, NaN and infinities are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            Value::Str(s) => s.trim().parse().ok()?,
            Value::Null | Value::Bool(_) => return None,
        };
        v.is_finite().then_some(v)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<AnyValue<'_>> for Value {
    fn from(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Value::Null,
            AnyValue::Boolean(v) => Value::Bool(v),
            AnyValue::String(s) => Value::Str(s.to_string()),
            AnyValue::StringOwned(s) => Value::Str(s.to_string()),
            AnyValue::Int8(v) => Value::Int(v as i64),
            AnyValue::Int16(v) => Value::Int(v as i64),
            AnyValue::Int32(v) => Value::Int(v as i64),
            AnyValue::Int64(v) => Value::Int(v),
            AnyValue::UInt8(v) => Value::Int(v as i64),
            AnyValue::UInt16(v) => Value::Int(v as i64),
            AnyValue::UInt32(v) => Value::Int(v as i64),
            AnyValue::UInt64(v) => match i64::try_from(v) {
                Ok(v) => Value::Int(v),
                Err(_) => Value::Float(v as f64),
            },
            AnyValue::Float32(v) => Value::Float(v as f64),
            AnyValue::Float64(v) => Value::Float(v),
            other => Value::Str(other.to_string()),
        }
    }
}

/// One record: column name → value
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: FxHashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for literals in tests and callers
    pub fn with(mut self, column: &str, value: Value) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: Value) -> Option<Value> {
        self.fields.insert(column.to_string(), value)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Extract row `idx` of a frame
    pub fn from_frame(df: &DataFrame, idx: usize) -> Result<Self> {
        let mut row = Row::new();
        for column in df.get_columns() {
            let value = column.get(idx)?;
            row.insert(column.name().as_str(), Value::from(value));
        }
        Ok(row)
    }
}

/// Every row of a frame, in order
pub fn rows_from_frame(df: &DataFrame) -> Result<Vec<Row>> {
    (0..df.height()).map(|idx| Row::from_frame(df, idx)).collect()
}
