// report.rs - machine-readable verification report for `zipsign verify --json`

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::verifier::VerifyResult;

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub archive: String,
    pub result: VerifyResult,
    /// RFC 3339, UTC.
    pub verified_at: String,
}

impl VerifyReport {
    pub fn new(archive: &Path, result: VerifyResult) -> Self {
        Self {
            archive: archive.display().to_string(),
            result,
            verified_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
