//! Friend declaration scrubbing for newly signed artifacts.
//!
//! A strong-named assembly cannot grant friend access to an assembly named
//! without a public key. Only artifacts signed in this batch are scrubbed;
//! artifacts that arrived signed were validated when they were signed.

use serde::{Deserialize, Serialize};
use sn_provider::{ArtifactIdentity, PathKey, SigningProvider};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::key::SigningKey;
use super::reconcile::StepWarning;

/// Result of the scrub step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrubOutcome {
    /// Artifacts scrubbed
    pub artifacts_checked: usize,
    /// Artifacts that had invalid friend declarations removed
    pub scrubbed: Vec<PathBuf>,
    /// Failed scrubs (`ScrubFailed`)
    pub failures: Vec<StepWarning>,
}

/// Removes friend declarations that lack a public key
pub struct TrustScrubber<'a, P: ?Sized> {
    provider: &'a P,
    key: &'a SigningKey,
    probing_paths: &'a [PathBuf],
}

impl<'a, P: SigningProvider + ?Sized> TrustScrubber<'a, P> {
    pub fn new(provider: &'a P, key: &'a SigningKey, probing_paths: &'a [PathBuf]) -> Self {
        Self {
            provider,
            key,
            probing_paths,
        }
    }

    pub fn scrub(&self, newly_signed: &[ArtifactIdentity]) -> ScrubOutcome {
        let mut outcome = ScrubOutcome::default();
        let mut seen: HashSet<PathKey> = HashSet::new();

        for artifact in newly_signed.iter().filter(|a| seen.insert(a.key())) {
            outcome.artifacts_checked += 1;
            debug!(artifact = %artifact.path.display(), "Removing invalid friend references");

            match self.provider.remove_invalid_friend_declarations(
                &artifact.path,
                self.key.path(),
                self.probing_paths,
            ) {
                Ok(true) => {
                    info!(artifact = %artifact.path.display(), "Invalid friend assemblies removed");
                    outcome.scrubbed.push(artifact.path.clone());
                }
                Ok(false) => {
                    debug!(artifact = %artifact.path.display(), "No friend references to fix");
                }
                Err(e) => {
                    warn!(
                        artifact = %artifact.path.display(),
                        error = %e,
                        "Friend declaration scrub failed"
                    );
                    outcome.failures.push(StepWarning {
                        artifact: artifact.path.clone(),
                        target: None,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
