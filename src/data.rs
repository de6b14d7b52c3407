//! Tabular I/O
//!
//! Reads and writes record sets as CSV or Parquet, picked by file extension.
//! CSV `NA` cells are read as null.

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::error::{PrepError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Parquet,
}

fn format_of(path: &Path) -> Result<Format> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => Ok(Format::Csv),
        Some("parquet") => Ok(Format::Parquet),
        other => Err(PrepError::unavailable(
            path,
            format!("unsupported file extension {:?} (expected csv or parquet)", other),
        )),
    }
}

/// Load a record set from a CSV or Parquet file
pub fn load_frame(path: &Path) -> Result<DataFrame> {
    let format = format_of(path)?;
    if !path.exists() {
        return Err(PrepError::unavailable(path, "file not found"));
    }

    let df = match format {
        Format::Csv => {
            let parse_options = CsvParseOptions::default()
                .with_null_values(Some(NullValues::AllColumnsSingle("NA".into())));

            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(None)
                .with_parse_options(parse_options)
                .try_into_reader_with_file_path(Some(path.into()))
                .map_err(|e| PrepError::unavailable(path, e))?
                .finish()
                .map_err(|e| PrepError::unavailable(path, e))?
        }
        Format::Parquet => {
            let file = File::open(path).map_err(|e| PrepError::unavailable(path, e))?;
            ParquetReader::new(file)
                .finish()
                .map_err(|e| PrepError::unavailable(path, e))?
        }
    };

    info!("Loaded {} rows × {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Write a record set to a CSV or Parquet file
pub fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    let format = format_of(path)?;
    let mut file = File::create(path).map_err(|e| PrepError::unavailable(path, e))?;

    match format {
        Format::Csv => {
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        Format::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
    }

    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
