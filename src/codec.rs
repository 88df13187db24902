//! Canonical JSON form of a [`Report`] and its schema.

use crate::error::{Error, Result};
use crate::report::Report;
use jsonschema::Validator;
use std::path::Path;
use std::sync::OnceLock;

/// Published schema every report file must satisfy (JSON Schema draft 2020-12).
pub const REPORT_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": [
    "from_dir", "to_dir", "packet_type",
    "initial_timestamp", "received_timestamp", "sent_timestamp", "final_timestamp",
    "public_key", "signature", "user_id", "installation_id", "observations"
  ],
  "properties": {
    "from_dir": { "type": "string" },
    "to_dir": { "type": "string" },
    "packet_type": { "$ref": "#/$defs/byte" },
    "initial_timestamp": { "$ref": "#/$defs/day_offset" },
    "received_timestamp": { "$ref": "#/$defs/day_offset" },
    "sent_timestamp": { "$ref": "#/$defs/day_offset" },
    "final_timestamp": { "$ref": "#/$defs/day_offset" },
    "public_key": { "type": "string" },
    "signature": { "type": "string" },
    "user_id": { "type": "integer", "minimum": 0 },
    "installation_id": { "type": "integer", "minimum": 0 },
    "observations": {
      "type": "array",
      "minItems": 1,
      "items": { "$ref": "#/$defs/observation" }
    }
  },
  "$defs": {
    "byte": { "type": "string", "minLength": 1, "maxLength": 1 },
    "day_offset": { "type": "integer", "minimum": 0, "exclusiveMaximum": 86400000000000 },
    "observation": {
      "type": "object",
      "required": [
        "day_timestamp", "type_identifier", "packet_size",
        "initial_timestamp", "reception_timestamp", "sent_timestamp", "final_timestamp"
      ],
      "properties": {
        "day_timestamp": { "type": "integer", "minimum": 0, "maximum": 9000000000 },
        "type_identifier": { "$ref": "#/$defs/byte" },
        "packet_size": { "type": "integer", "minimum": 0, "maximum": 4294967295 },
        "initial_timestamp": { "$ref": "#/$defs/day_offset" },
        "reception_timestamp": { "$ref": "#/$defs/day_offset" },
        "sent_timestamp": { "$ref": "#/$defs/day_offset" },
        "final_timestamp": { "$ref": "#/$defs/day_offset" }
      }
    }
  }
}"##;

static VALIDATOR: OnceLock<Validator> = OnceLock::new();

fn validator() -> Result<&'static Validator> {
    if let Some(v) = VALIDATOR.get() {
        return Ok(v);
    }
    let schema: serde_json::Value = serde_json::from_str(REPORT_SCHEMA)
        .map_err(|e| Error::malformed(format!("invalid schema JSON: {e}")))?;
    let compiled = Validator::new(&schema)
        .map_err(|e| Error::malformed(format!("invalid JSON Schema: {e}")))?;
    Ok(VALIDATOR.get_or_init(|| compiled))
}

/// Checks a parsed document against [`REPORT_SCHEMA`], reporting every violation.
pub fn validate(value: &serde_json::Value) -> Result<()> {
    let errors: Vec<String> = validator()?
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if !errors.is_empty() {
        return Err(Error::malformed(errors.join("; ")));
    }
    Ok(())
}

pub fn encode(report: &Report) -> Result<String> {
    serde_json::to_string(report).map_err(|e| Error::malformed(format!("encode: {e}")))
}

pub fn decode(text: &str) -> Result<Report> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;
    validate(&value)?;

    let report: Report =
        serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string()))?;
    if !report.offsets_in_range() {
        return Err(Error::malformed("timestamp offset outside of the day"));
    }
    if !report.day_keys_in_range() {
        return Err(Error::malformed("day_timestamp out of range"));
    }
    Ok(report)
}

/// Reads and decodes a report file, recording its absolute path.
pub fn load(path: &Path) -> Result<Report> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
    let mut report = decode(&raw).map_err(|e| e.at_path(path))?;
    let abs = std::path::absolute(path).map_err(|e| Error::fs(path, e))?;
    report.file_path = Some(abs);
    Ok(report)
}

pub fn save(report: &Report, path: &Path) -> Result<()> {
    let raw = encode(report)?;
    std::fs::write(path, raw).map_err(|e| Error::fs(path, e))
}

impl Report {
    pub fn load(path: &Path) -> Result<Report> {
        load(path)
    }
}
