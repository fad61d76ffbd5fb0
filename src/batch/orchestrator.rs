//! Batch orchestration
//!
//! Sequences the batch steps:
//! - Provision the shared key
//! - Resolve input identities
//! - Sign unsigned artifacts into the signed directory
//! - Reconcile intra-batch references
//! - Scrub invalid friend declarations
//! - Propagate renames into the auxiliary (copy-local) list
//!
//! Per-artifact problems are recorded in the report; only configuration-level
//! problems end the batch with an error.

use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use sn_provider::SigningProvider;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::key::{ensure_key, KeyError};
use super::reconcile::ReferenceReconciler;
use super::remap::remap;
use super::resolver::IdentityResolver;
use super::scrub::TrustScrubber;
use super::signer::{probing_paths, BatchSigner};
use super::state::{BatchProgress, BatchState, TransitionError};
use crate::item::BuildItem;
use crate::lock::LockError;
use crate::report::{BatchReport, ExitCode};

/// Default name of the signed-output subdirectory
pub const SIGNED_DIR_NAME: &str = "StrongNameSigner";

/// Default key-pair file name
pub const KEY_FILE_NAME: &str = "StrongNameSigner.snk";

/// Batch errors. Only conditions that stop the whole batch live here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("key provisioning failed: {0}")]
    KeyProvisioning(#[from] KeyError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("{0}")]
    Transition(#[from] TransitionError),
}

impl BatchError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            BatchError::InvalidConfiguration(_) => ExitCode::InvalidConfiguration,
            BatchError::KeyProvisioning(_) => ExitCode::KeyProvisioning,
            BatchError::Io(_) => ExitCode::Io,
            BatchError::Lock(_) => ExitCode::Lock,
            BatchError::Transition(_) => ExitCode::Io,
        }
    }
}

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Settings fixed for the lifetime of an orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    /// Subdirectory of the output directory that receives signed artifacts
    pub signed_dir_name: String,

    /// Location of the shared key-pair file
    pub key_path: PathBuf,
}

impl BatchSettings {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            signed_dir_name: SIGNED_DIR_NAME.to_string(),
            key_path: key_path.into(),
        }
    }

    pub fn with_signed_dir_name(mut self, name: impl Into<String>) -> Self {
        self.signed_dir_name = name.into();
        self
    }
}

/// Input of one batch
#[derive(Debug, Clone)]
pub struct BatchRequest<H> {
    /// References to sign and reconcile, in build order
    pub references: Vec<H>,

    /// Build output directory; required when `references` is non-empty
    pub output_dir: Option<PathBuf>,

    /// Auxiliary items copied alongside the output
    pub copy_local: Vec<H>,
}

impl<H> BatchRequest<H> {
    pub fn new(references: Vec<H>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            references,
            output_dir: Some(output_dir.into()),
            copy_local: Vec::new(),
        }
    }

    pub fn with_copy_local(mut self, items: Vec<H>) -> Self {
        self.copy_local = items;
        self
    }
}

/// Output of one batch
#[derive(Debug, Clone)]
pub struct BatchOutput<H> {
    /// Every input reference, in order, at its current path
    pub references: Vec<H>,

    /// The auxiliary list with renames applied
    pub copy_local: Vec<H>,

    pub report: BatchReport,
}

impl<H> BatchOutput<H> {
    pub fn success(&self) -> bool {
        self.report.success
    }
}

/// A complete batch operation over caller handles of type `H`
pub trait ReferenceBatch<H: BuildItem> {
    fn execute(&self, request: BatchRequest<H>) -> BatchResult<BatchOutput<H>>;
}

/// Runs batches against a signing provider
pub struct Orchestrator<P> {
    provider: P,
    settings: BatchSettings,
}

impl<P: SigningProvider> Orchestrator<P> {
    pub fn new(provider: P, settings: BatchSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    fn run<H: BuildItem>(
        &self,
        request: BatchRequest<H>,
        progress: &mut BatchProgress,
        report: &mut BatchReport,
    ) -> BatchResult<(Vec<H>, Vec<H>)> {
        if request.references.is_empty() {
            debug!("No references supplied, nothing to do");
            progress.advance(BatchState::Done)?;
            return Ok((Vec::new(), Vec::new()));
        }

        let output_dir = request
            .output_dir
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                BatchError::InvalidConfiguration("output directory not provided".to_string())
            })?;

        let signed_dir = full_path(&output_dir.join(&self.settings.signed_dir_name))?;
        fs::create_dir_all(&signed_dir)?;

        let key = ensure_key(&self.provider, &self.settings.key_path)?;

        info!(signed_dir = %signed_dir.display(), "Signed assembly directory");
        info!(key = %key.path.display(), fingerprint = %key.fingerprint, "Key file");

        let probing = probing_paths(&request.references);
        report.signed_dir = Some(signed_dir.clone());
        report.key = Some(key.clone());
        report.probing_paths = probing.clone();

        // 1. Resolve
        let resolved = IdentityResolver::new(&self.provider).read_references(&request.references);
        progress.advance(BatchState::Resolved)?;

        // 2. Sign
        let outcome =
            BatchSigner::new(&self.provider, &key, &signed_dir, &probing).sign_all(resolved);
        report.record_artifacts(&outcome.entries, outcome.signed_count());
        progress.advance(BatchState::Signed)?;

        // 3 + 4. Reconcile and scrub, only if some identity changed
        if outcome.signed_count() > 0 {
            let finals = outcome.final_artifacts();
            report.reconciliation =
                Some(ReferenceReconciler::new(&self.provider, &key, &probing).reconcile(&finals));
            progress.advance(BatchState::Reconciled)?;

            report.scrub =
                Some(TrustScrubber::new(&self.provider, &key, &probing).scrub(&outcome.newly_signed));
            progress.advance(BatchState::Scrubbed)?;
        } else {
            debug!("No artifacts signed, skipping reconciliation and friend scrub");
            progress.advance(BatchState::Reconciled)?;
            progress.advance(BatchState::Scrubbed)?;
        }

        // 5. Remap auxiliary paths
        let copy_local = remap(&request.copy_local, &outcome.rename_map);
        report.record_renames(&outcome.rename_map);
        progress.advance(BatchState::Remapped)?;

        progress.advance(BatchState::Done)?;
        Ok((outcome.final_handles(), copy_local))
    }
}

impl<P: SigningProvider, H: BuildItem> ReferenceBatch<H> for Orchestrator<P> {
    fn execute(&self, request: BatchRequest<H>) -> BatchResult<BatchOutput<H>> {
        let start = Instant::now();
        let mut progress = BatchProgress::new();
        let mut report = BatchReport::new(Uuid::new_v4().to_string());

        match self.run(request, &mut progress, &mut report) {
            Ok((references, copy_local)) => {
                report.finish(progress.history(), start.elapsed().as_millis() as u64);
                Ok(BatchOutput {
                    references,
                    copy_local,
                    report,
                })
            }
            Err(e) => {
                progress.fail();
                debug!(states = ?progress.history(), "Batch aborted");
                Err(e)
            }
        }
    }
}

/// Absolute, lexically normalized form of `path`. `.` is dropped and `..`
/// removes the previous component; the file system is not consulted.
fn full_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
