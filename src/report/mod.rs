//! Batch report (batch_report.json) and exit code taxonomy

mod batch_report;
mod status;

pub use batch_report::{ArtifactReport, BatchReport, BATCH_REPORT_SCHEMA_ID, BATCH_REPORT_SCHEMA_VERSION};
pub use status::{ExitCode, Status};
