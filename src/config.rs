//! Preparation Settings
//!
//! Column names and policies shared by the transforms. Every field has a
//! default matching the claims dataset, so an empty JSON object (or no file
//! at all) gives a working configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};

/// What the encoder does with a value outside a column's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Unknown values become null; callers treat them as missing.
    #[default]
    Null,
    /// Unknown values fail the whole transform with `InvalidCategory`.
    Reject,
}

/// Names of the two inputs and the output of the claim-rate calculation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaimColumns {
    pub count: String,
    pub charge: String,
    pub output: String,
}

impl Default for ClaimColumns {
    fn default() -> Self {
        ClaimColumns {
            count: "nbrtotc".to_string(),
            charge: "chargtot".to_string(),
            output: "avg_claim".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Join key present in both the records and the reference table
    pub postal_column: String,

    /// Reference columns that are not geographic attributes
    pub reference_drop_columns: Vec<String>,

    /// Location of the postal-code reference table (CSV or Parquet)
    pub reference_path: Option<PathBuf>,

    pub unmapped: UnmappedPolicy,

    pub claims: ClaimColumns,
}

impl Default for PrepConfig {
    fn default() -> Self {
        PrepConfig {
            postal_column: "CODPOSS".to_string(),
            reference_drop_columns: vec!["INS".to_string(), "COMMUNE".to_string()],
            reference_path: None,
            unmapped: UnmappedPolicy::Null,
            claims: ClaimColumns::default(),
        }
    }
}

impl PrepConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| PrepError::unavailable(path, e))?;

        let config: PrepConfig = serde_json::from_str(&contents)
            .map_err(|e| PrepError::Config(format!("{}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.postal_column.trim().is_empty() {
            return Err(PrepError::Config("postal_column must not be empty".into()));
        }
        if self.reference_drop_columns.iter().any(|c| c == &self.postal_column) {
            return Err(PrepError::Config(format!(
                "postal column '{}' cannot also be dropped from the reference table",
                self.postal_column
            )));
        }
        let claims = &self.claims;
        if claims.output == claims.count || claims.output == claims.charge {
            return Err(PrepError::Config(format!(
                "output column '{}' would overwrite an input column",
                claims.output
            )));
        }
        Ok(())
    }

    /// Reference path, with an override (e.g. from the environment) taking precedence
    pub fn reference_path_or(&self, override_path: Option<PathBuf>) -> Result<PathBuf> {
        override_path
            .or_else(|| self.reference_path.clone())
            .ok_or_else(|| PrepError::Config("no reference table path configured".into()))
    }
}
