//! Pairwise reference reconciliation.
//!
//! After signing, any artifact in the batch may hold a stale reference to
//! another one (old path, no public key token). Every ordered pair (A, B) of
//! distinct final artifacts gets a fixup call; the provider makes it a no-op
//! when A does not reference B.

use serde::{Deserialize, Serialize};
use sn_provider::{ArtifactIdentity, SigningProvider};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::key::SigningKey;

/// A best-effort correction that did not go through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWarning {
    /// Artifact being corrected
    pub artifact: PathBuf,
    /// Referenced artifact, for reference fixups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    pub reason: String,
}

/// Result of the reconciliation step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Ordered pairs attempted
    pub pairs_checked: usize,
    /// Pairs where a stored reference was rewritten
    pub references_fixed: usize,
    /// Failed fixups (`ReconciliationFailed`)
    pub failures: Vec<StepWarning>,
}

/// Rewrites intra-batch references to match current identities
pub struct ReferenceReconciler<'a, P: ?Sized> {
    provider: &'a P,
    key: &'a SigningKey,
    probing_paths: &'a [PathBuf],
}

impl<'a, P: SigningProvider + ?Sized> ReferenceReconciler<'a, P> {
    pub fn new(provider: &'a P, key: &'a SigningKey, probing_paths: &'a [PathBuf]) -> Self {
        Self {
            provider,
            key,
            probing_paths,
        }
    }

    /// Fix every ordered pair of distinct artifacts in `artifacts`.
    ///
    /// Pairs are independent: a failed fixup never causes another pair to be
    /// skipped.
    pub fn reconcile(&self, artifacts: &[ArtifactIdentity]) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        for artifact in artifacts {
            for referenced in artifacts {
                if artifact.same_artifact(referenced) {
                    continue;
                }
                outcome.pairs_checked += 1;

                match self.provider.fix_reference(
                    &artifact.path,
                    &referenced.path,
                    self.key.path(),
                    self.probing_paths,
                ) {
                    Ok(true) => {
                        outcome.references_fixed += 1;
                        info!(
                            artifact = %artifact.path.display(),
                            referenced = %referenced.path.display(),
                            "Fixed reference"
                        );
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(
                            artifact = %artifact.path.display(),
                            referenced = %referenced.path.display(),
                            error = %e,
                            "Reference fixup failed, reference may be stale"
                        );
                        outcome.failures.push(StepWarning {
                            artifact: artifact.path.clone(),
                            target: Some(referenced.path.clone()),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            pairs = outcome.pairs_checked,
            fixed = outcome.references_fixed,
            failed = outcome.failures.len(),
            "Reconciliation finished"
        );
        outcome
    }
}
