//! Export formats shared by the result and feedback exports.

use ballot_core::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
  Csv,
  Json,
}

impl ExportFormat {
  pub fn parse(raw: &str) -> Result<Self> {
    raw.parse().map_err(|_| {
      Error::InvalidInput("Invalid format. Supported formats: csv, json".into())
    })
  }
}

/// An exported document: rendered CSV text, or the rows themselves for the
/// transport to encode as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Export<T> {
  Csv(String),
  Json(T),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_parsing() {
    assert_eq!(ExportFormat::parse("csv").unwrap(), ExportFormat::Csv);
    assert_eq!(ExportFormat::parse("JSON").unwrap(), ExportFormat::Json);
    let err = ExportFormat::parse("xml").unwrap_err();
    assert_eq!(err.to_string(), "Invalid format. Supported formats: csv, json");
  }
}
