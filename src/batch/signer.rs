//! Batch signing of unsigned references.
//!
//! Each unsigned artifact is signed at most once per batch. Per-artifact
//! failures are isolated: the entry keeps its original path and the batch
//! moves on. `UNREADABLE_ARTIFACT` is a warning; any other failure is reported
//! as a signing failure.

use serde::{Deserialize, Serialize};
use sn_provider::{ArtifactIdentity, PathKey, SigningProvider};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::key::SigningKey;
use super::remap::RenameMap;
use super::resolver::{IdentityResolver, ReferenceEntry, ResolvedReference};
use crate::item::BuildItem;

/// What happened to one input reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactDisposition {
    /// Was already strong-named; passed through
    AlreadySigned,
    /// Signed in this batch
    Signed,
    /// Not a valid module; left untouched
    Unreadable,
    /// Signing failed; left untouched
    SigningFailed,
}

impl ArtifactDisposition {
    /// True if the artifact was dropped from renaming and reconciliation
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Unreadable | Self::SigningFailed)
    }
}

/// Final state of one input reference after signing
#[derive(Debug, Clone)]
pub struct EntryOutcome<H> {
    /// The caller's handle, pointing at the artifact's current path
    pub handle: H,
    /// Path the caller originally supplied
    pub original: PathBuf,
    /// Current identity; `None` when the artifact could not be read
    pub identity: Option<ArtifactIdentity>,
    pub disposition: ArtifactDisposition,
    /// Failure reason for skipped entries
    pub reason: Option<String>,
}

/// Everything the signing step produced
#[derive(Debug, Clone)]
pub struct SignOutcome<H> {
    /// One outcome per input reference, in input order
    pub entries: Vec<EntryOutcome<H>>,
    /// Renames for artifacts whose path changed
    pub rename_map: RenameMap,
    /// Identities signed in this batch, one per distinct artifact
    pub newly_signed: Vec<ArtifactIdentity>,
}

impl<H: BuildItem> SignOutcome<H> {
    /// Number of distinct artifacts signed in this batch
    pub fn signed_count(&self) -> usize {
        self.newly_signed.len()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &EntryOutcome<H>> {
        self.entries.iter().filter(|e| e.disposition.is_skipped())
    }

    /// Signed artifacts that take part in reconciliation, de-duplicated by
    /// path in first-seen order
    pub fn final_artifacts(&self) -> Vec<ArtifactIdentity> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(|e| e.identity.as_ref())
            .filter(|id| id.is_signed)
            .filter(|id| seen.insert(id.key()))
            .cloned()
            .collect()
    }

    /// Caller handles in input order, each at its current path
    pub fn final_handles(&self) -> Vec<H> {
        self.entries.iter().map(|e| e.handle.clone()).collect()
    }
}

/// Outcome of one signing attempt, cached per artifact path
#[derive(Debug, Clone)]
enum SignAttempt {
    AlreadySigned(ArtifactIdentity),
    Signed(ArtifactIdentity),
    Unreadable(String),
    Failed(String),
}

/// Signs every unsigned reference in a batch
pub struct BatchSigner<'a, P: ?Sized> {
    provider: &'a P,
    key: &'a SigningKey,
    output_dir: &'a Path,
    probing_paths: &'a [PathBuf],
}

impl<'a, P: SigningProvider + ?Sized> BatchSigner<'a, P> {
    pub fn new(
        provider: &'a P,
        key: &'a SigningKey,
        output_dir: &'a Path,
        probing_paths: &'a [PathBuf],
    ) -> Self {
        Self {
            provider,
            key,
            output_dir,
            probing_paths,
        }
    }

    /// Sign every unsigned entry, passing signed and unreadable ones through.
    pub fn sign_all<H: BuildItem>(&self, references: Vec<ResolvedReference<H>>) -> SignOutcome<H> {
        let mut attempts: HashMap<PathKey, SignAttempt> = HashMap::new();
        let mut rename_map = RenameMap::new();
        let mut newly_signed = Vec::new();
        let mut entries = Vec::with_capacity(references.len());
        // signed path -> the input that owns it
        let mut outputs: HashMap<PathKey, PathBuf> = HashMap::new();

        for reference in references {
            let entry = match reference {
                ResolvedReference::Unresolved {
                    handle,
                    reason,
                    unreadable,
                } => {
                    let disposition = if unreadable {
                        ArtifactDisposition::Unreadable
                    } else {
                        ArtifactDisposition::SigningFailed
                    };
                    entries.push(EntryOutcome {
                        original: handle.item_path().to_path_buf(),
                        handle,
                        identity: None,
                        disposition,
                        reason: Some(reason),
                    });
                    continue;
                }
                ResolvedReference::Entry(entry) => entry,
            };

            if entry.identity.is_signed {
                outputs
                    .entry(entry.identity.key())
                    .or_insert_with(|| entry.identity.path.clone());
                entries.push(EntryOutcome {
                    original: entry.identity.path.clone(),
                    handle: entry.handle,
                    identity: Some(entry.identity),
                    disposition: ArtifactDisposition::AlreadySigned,
                    reason: None,
                });
                continue;
            }

            let key = entry.identity.key();
            let attempt = match attempts.get(&key) {
                Some(previous) => {
                    debug!(artifact = %entry.identity.path.display(), "Duplicate reference, reusing result");
                    previous.clone()
                }
                None => {
                    let attempt = match self.predicted_owner(&entry.identity.path, &outputs) {
                        Some(owner) => Self::collision(&entry.identity.path, owner),
                        None => self.sign_one(&entry),
                    };
                    let attempt = Self::claim_output(&entry.identity.path, attempt, &mut outputs);
                    if let SignAttempt::Signed(ref signed) = attempt {
                        if !entry.identity.same_artifact(signed) {
                            rename_map.insert(&entry.identity.path, &signed.path);
                        }
                        newly_signed.push(signed.clone());
                    }
                    attempts.insert(key, attempt.clone());
                    attempt
                }
            };

            entries.push(Self::outcome(entry, attempt));
        }

        SignOutcome {
            entries,
            rename_map,
            newly_signed,
        }
    }

    /// Input that already owns the path `path` would be signed to
    fn predicted_owner<'m>(
        &self,
        path: &Path,
        outputs: &'m HashMap<PathKey, PathBuf>,
    ) -> Option<&'m PathBuf> {
        let target = self.output_dir.join(path.file_name()?);
        outputs
            .get(&PathKey::from_path(&target))
            .filter(|owner| PathKey::from_path(owner) != PathKey::from_path(path))
    }

    fn collision(path: &Path, owner: &Path) -> SignAttempt {
        error!(
            artifact = %path.display(),
            owner = %owner.display(),
            "Signed output would overwrite another artifact of the batch"
        );
        SignAttempt::Failed(format!("signed output collides with '{}'", owner.display()))
    }

    /// Record the output path of a successful attempt. The provider may name
    /// outputs differently than predicted, so the returned path is checked too.
    fn claim_output(
        path: &Path,
        attempt: SignAttempt,
        outputs: &mut HashMap<PathKey, PathBuf>,
    ) -> SignAttempt {
        let key = match &attempt {
            SignAttempt::Signed(identity) | SignAttempt::AlreadySigned(identity) => {
                Some(identity.key())
            }
            _ => None,
        };
        let Some(key) = key else {
            return attempt;
        };

        match outputs.get(&key).cloned() {
            Some(owner) if PathKey::from_path(&owner) != PathKey::from_path(path) => {
                Self::collision(path, &owner)
            }
            Some(_) => attempt,
            None => {
                outputs.insert(key, path.to_path_buf());
                attempt
            }
        }
    }

    fn outcome<H: BuildItem>(entry: ReferenceEntry<H>, attempt: SignAttempt) -> EntryOutcome<H> {
        let original = entry.identity.path.clone();
        match attempt {
            SignAttempt::AlreadySigned(identity) => {
                let entry = entry.reidentified(identity);
                EntryOutcome {
                    original,
                    handle: entry.handle,
                    identity: Some(entry.identity),
                    disposition: ArtifactDisposition::AlreadySigned,
                    reason: None,
                }
            }
            SignAttempt::Signed(identity) => {
                let entry = entry.reidentified(identity);
                EntryOutcome {
                    original,
                    handle: entry.handle,
                    identity: Some(entry.identity),
                    disposition: ArtifactDisposition::Signed,
                    reason: None,
                }
            }
            SignAttempt::Unreadable(reason) => EntryOutcome {
                original,
                handle: entry.handle,
                identity: None,
                disposition: ArtifactDisposition::Unreadable,
                reason: Some(reason),
            },
            SignAttempt::Failed(reason) => EntryOutcome {
                original,
                handle: entry.handle,
                identity: Some(entry.identity),
                disposition: ArtifactDisposition::SigningFailed,
                reason: Some(reason),
            },
        }
    }

    fn sign_one<H: BuildItem>(&self, entry: &ReferenceEntry<H>) -> SignAttempt {
        let path = &entry.identity.path;
        debug!(artifact = %path.display(), "Strong-name signing");

        // Re-check rather than trust the snapshot taken at resolve time.
        let current = match IdentityResolver::new(self.provider).resolve(path) {
            Ok(identity) => identity,
            Err(e) if e.is_unreadable() => {
                warn!(artifact = %path.display(), error = %e, "Skipping unreadable artifact");
                return SignAttempt::Unreadable(e.reason());
            }
            Err(e) => {
                error!(artifact = %path.display(), error = %e, "Could not re-read artifact before signing");
                return SignAttempt::Failed(e.reason());
            }
        };

        if current.is_signed {
            debug!(artifact = %path.display(), "Already strong-name signed");
            return SignAttempt::AlreadySigned(current);
        }

        match self
            .provider
            .sign(path, self.key.path(), self.output_dir, self.probing_paths)
        {
            Ok(signed) if signed.is_signed => {
                info!(
                    artifact = %path.display(),
                    signed = %signed.path.display(),
                    "Strong-name signed successfully"
                );
                SignAttempt::Signed(signed)
            }
            Ok(signed) => {
                error!(artifact = %path.display(), result = %signed, "Provider returned an unsigned identity");
                SignAttempt::Failed("provider returned an unsigned identity".to_string())
            }
            Err(e) if e.is_unreadable() => {
                warn!(artifact = %path.display(), error = %e, "Skipping unreadable artifact");
                SignAttempt::Unreadable(e.reason())
            }
            Err(e) => {
                error!(artifact = %path.display(), error = %e, "Strong-name signing failed");
                SignAttempt::Failed(e.reason())
            }
        }
    }
}

/// Distinct parent directories of `items`, in first-seen order, compared
/// case-insensitively.
pub fn probing_paths<H: BuildItem>(items: &[H]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| item.item_path().parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .filter(|dir| seen.insert(PathKey::from_path(dir)))
        .map(Path::to_path_buf)
        .collect()
}
