//! Batch report (batch_report.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::status::{ExitCode, Status};
use crate::batch::{
    ArtifactDisposition, BatchState, EntryOutcome, ReconcileOutcome, Rename, RenameMap,
    ScrubOutcome, SigningKey,
};
use crate::item::BuildItem;

/// Schema version for batch_report.json
pub const BATCH_REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for batch_report.json
pub const BATCH_REPORT_SCHEMA_ID: &str = "sn-batch/batch_report@1";

/// Per-input artifact line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    /// Path the caller supplied
    pub input: PathBuf,
    /// Path the caller should now reference
    pub output: PathBuf,
    pub disposition: ArtifactDisposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Batch report (batch_report.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// Batch identifier
    pub batch_id: String,

    /// When the report was created
    pub created_at: DateTime<Utc>,

    /// Aggregated status
    pub status: Status,

    /// Overall success flag for the host
    pub success: bool,

    /// Exit code the CLI reports
    pub exit_code: i32,

    /// Directory that received signed artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_dir: Option<PathBuf>,

    /// Key used for this batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<SigningKey>,

    /// Directories offered to the provider for dependency lookup
    #[serde(default)]
    pub probing_paths: Vec<PathBuf>,

    /// One line per input reference, in input order
    pub artifacts: Vec<ArtifactReport>,

    /// Distinct artifacts signed in this batch
    pub signed_count: usize,

    /// Inputs skipped (unreadable or failed to sign)
    pub skipped_count: usize,

    /// Renames propagated into the auxiliary list
    pub renames: Vec<Rename>,

    /// Reconciliation results; absent when nothing was signed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconcileOutcome>,

    /// Friend scrub results; absent when nothing was signed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrub: Option<ScrubOutcome>,

    /// States the batch passed through
    pub states: Vec<BatchState>,

    /// Wall-clock duration of the batch in milliseconds
    pub duration_ms: u64,

    /// Human-readable summary
    pub human_summary: String,
}

impl BatchReport {
    /// Create a blank report for a batch
    pub fn new(batch_id: String) -> Self {
        Self {
            schema_version: BATCH_REPORT_SCHEMA_VERSION,
            schema_id: BATCH_REPORT_SCHEMA_ID.to_string(),
            batch_id,
            created_at: Utc::now(),
            status: Status::Success,
            success: true,
            exit_code: ExitCode::Success.as_i32(),
            signed_dir: None,
            key: None,
            probing_paths: Vec::new(),
            artifacts: Vec::new(),
            signed_count: 0,
            skipped_count: 0,
            renames: Vec::new(),
            reconciliation: None,
            scrub: None,
            states: Vec::new(),
            duration_ms: 0,
            human_summary: "No references to process".to_string(),
        }
    }

    /// Record per-artifact outcomes from the signing step
    pub fn record_artifacts<H: BuildItem>(&mut self, entries: &[EntryOutcome<H>], signed_count: usize) {
        self.artifacts = entries
            .iter()
            .map(|e| ArtifactReport {
                input: e.original.clone(),
                output: e.handle.item_path().to_path_buf(),
                disposition: e.disposition,
                reason: e.reason.clone(),
            })
            .collect();
        self.signed_count = signed_count;
        self.skipped_count = entries.iter().filter(|e| e.disposition.is_skipped()).count();
    }

    pub fn record_renames(&mut self, renames: &RenameMap) {
        self.renames = renames.iter().cloned().collect();
    }

    /// Number of best-effort corrections that failed
    pub fn warning_count(&self) -> usize {
        self.reconciliation.as_ref().map_or(0, |r| r.failures.len())
            + self.scrub.as_ref().map_or(0, |s| s.failures.len())
    }

    /// Inputs that failed to sign
    pub fn signing_failures(&self) -> usize {
        self.artifacts
            .iter()
            .filter(|a| a.disposition == ArtifactDisposition::SigningFailed)
            .count()
    }

    /// Aggregate status, exit code and summary. Call once the batch is done.
    pub fn finish(&mut self, states: &[BatchState], duration_ms: u64) {
        let unreadable = self
            .artifacts
            .iter()
            .filter(|a| a.disposition == ArtifactDisposition::Unreadable)
            .count();

        self.status = if self.signing_failures() > 0 {
            Status::Failed
        } else if unreadable > 0 || self.warning_count() > 0 {
            Status::Degraded
        } else {
            Status::Success
        };
        self.success = self.status.is_success();
        self.exit_code = self.status.exit_code().as_i32();
        self.states = states.to_vec();
        self.duration_ms = duration_ms;
        self.human_summary = self.generate_human_summary();
    }

    fn generate_human_summary(&self) -> String {
        if self.artifacts.is_empty() {
            return "No references to process".to_string();
        }

        let already = self
            .artifacts
            .iter()
            .filter(|a| a.disposition == ArtifactDisposition::AlreadySigned)
            .count();
        let fixed = self
            .reconciliation
            .as_ref()
            .map_or(0, |r| r.references_fixed);

        let mut summary = format!(
            "{} reference(s): {} signed, {} already signed, {} skipped; {} reference(s) fixed",
            self.artifacts.len(),
            self.signed_count,
            already,
            self.skipped_count,
            fixed
        );
        let warnings = self.warning_count();
        if warnings > 0 {
            summary.push_str(&format!("; {} warning(s)", warnings));
        }
        summary
    }

    /// Get the exit code as a typed value
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_i32(self.exit_code).unwrap_or(ExitCode::SigningFailed)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}
