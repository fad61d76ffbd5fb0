//! Logging decorator for batch operations

use tracing::{error, info, warn};

use super::orchestrator::{BatchOutput, BatchRequest, BatchResult, ReferenceBatch};
use crate::item::BuildItem;
use crate::report::Status;

/// Wraps a batch with a banner, a closing summary and error logging.
/// Results and errors pass through unchanged.
pub struct LoggingBatch<B> {
    inner: B,
}

impl<B> LoggingBatch<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<H: BuildItem, B: ReferenceBatch<H>> ReferenceBatch<H> for LoggingBatch<B> {
    fn execute(&self, request: BatchRequest<H>) -> BatchResult<BatchOutput<H>> {
        info!("---- sn-batch v{} ----", env!("CARGO_PKG_VERSION"));
        info!(
            references = request.references.len(),
            copy_local = request.copy_local.len(),
            "Starting batch"
        );

        match self.inner.execute(request) {
            Ok(output) => {
                let report = &output.report;
                match report.status {
                    Status::Success => info!(batch_id = %report.batch_id, "{}", report.human_summary),
                    Status::Degraded | Status::Failed => warn!(
                        batch_id = %report.batch_id,
                        status = ?report.status,
                        "{}",
                        report.human_summary
                    ),
                }
                Ok(output)
            }
            Err(e) => {
                error!(error = %e, exit_code = e.exit_code().as_i32(), "Batch failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchError, BatchSettings, Orchestrator};
    use crate::item::TaskItem;
    use crate::mock::MockProvider;
    use tempfile::TempDir;

    fn provider() -> MockProvider {
        let provider = MockProvider::new();
        provider.add_unsigned("/in/A.dll");
        provider.add_signed("/in/B.dll");
        provider.add_reference("/in/A.dll", "/in/B.dll");
        provider
    }

    fn request(out: &std::path::Path) -> BatchRequest<TaskItem> {
        BatchRequest::new(
            vec![TaskItem::new("/in/A.dll"), TaskItem::new("/in/B.dll")],
            out,
        )
        .with_copy_local(vec![TaskItem::new("/in/A.dll"), TaskItem::new("/in/A.xml")])
    }

    #[test]
    fn test_output_matches_undecorated() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("key.snk");

        let plain = Orchestrator::new(provider(), BatchSettings::new(&key));
        let logged = LoggingBatch::new(Orchestrator::new(provider(), BatchSettings::new(&key)));

        let a = plain.execute(request(&dir.path().join("a"))).unwrap();
        let b = logged.execute(request(&dir.path().join("b"))).unwrap();

        let names = |items: &[TaskItem]| -> Vec<Option<String>> {
            items
                .iter()
                .map(|i| i.item_spec.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect()
        };
        assert_eq!(names(&a.references), names(&b.references));
        assert_eq!(names(&a.copy_local), names(&b.copy_local));
        assert_eq!(a.report.status, b.report.status);
        assert_eq!(a.report.signed_count, b.report.signed_count);
        assert_eq!(a.report.states, b.report.states);
    }

    #[test]
    fn test_error_passes_through() {
        let dir = TempDir::new().unwrap();
        let logged = LoggingBatch::new(Orchestrator::new(
            provider(),
            BatchSettings::new(dir.path().join("key.snk")),
        ));

        let request = BatchRequest {
            references: vec![TaskItem::new("/in/A.dll")],
            output_dir: None,
            copy_local: Vec::new(),
        };
        let err = logged.execute(request).unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfiguration(_)));
        assert_eq!(logged.inner().provider().sign_calls(), 0);
    }
}
