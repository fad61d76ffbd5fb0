//! Identity resolution for input references.

use std::path::Path;

use sn_provider::{ArtifactIdentity, ProviderResult, SigningProvider};
use tracing::{debug, error, warn};

use crate::item::BuildItem;

/// A caller handle paired with its current identity
#[derive(Debug, Clone)]
pub struct ReferenceEntry<H> {
    pub handle: H,
    pub identity: ArtifactIdentity,
}

impl<H: BuildItem> ReferenceEntry<H> {
    pub fn new(handle: H, identity: ArtifactIdentity) -> Self {
        Self { handle, identity }
    }

    /// Replacement entry for a re-identified artifact. The handle keeps its
    /// data but points at the new path.
    pub fn reidentified(&self, identity: ArtifactIdentity) -> Self {
        Self {
            handle: self.handle.with_item_path(&identity.path),
            identity,
        }
    }
}

/// Result of resolving one input reference
#[derive(Debug, Clone)]
pub enum ResolvedReference<H> {
    /// Identity was read successfully
    Entry(ReferenceEntry<H>),
    /// The provider could not read the artifact. `unreadable` is false when
    /// the failure was something other than a malformed module.
    Unresolved {
        handle: H,
        reason: String,
        unreadable: bool,
    },
}

impl<H: BuildItem> ResolvedReference<H> {
    pub fn handle(&self) -> &H {
        match self {
            ResolvedReference::Entry(entry) => &entry.handle,
            ResolvedReference::Unresolved { handle, .. } => handle,
        }
    }
}

/// Wraps the provider's `inspect` call
pub struct IdentityResolver<'a, P: ?Sized> {
    provider: &'a P,
}

impl<'a, P: SigningProvider + ?Sized> IdentityResolver<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Read the current identity of the artifact at `path`
    pub fn resolve(&self, path: &Path) -> ProviderResult<ArtifactIdentity> {
        self.provider.inspect(path)
    }

    /// Resolve every input item, in order. Unreadable artifacts are kept as
    /// `Unresolved` so they still appear in the batch output.
    pub fn read_references<H: BuildItem>(&self, items: &[H]) -> Vec<ResolvedReference<H>> {
        items
            .iter()
            .map(|item| match self.resolve(item.item_path()) {
                Ok(identity) => {
                    debug!(
                        artifact = %identity.path.display(),
                        signed = identity.is_signed,
                        "Resolved reference"
                    );
                    ResolvedReference::Entry(ReferenceEntry::new(item.clone(), identity))
                }
                Err(e) => {
                    if e.is_unreadable() {
                        warn!(
                            artifact = %item.item_path().display(),
                            error = %e,
                            "Could not read reference, leaving it untouched"
                        );
                    } else {
                        error!(
                            artifact = %item.item_path().display(),
                            error = %e,
                            "Provider failed to inspect reference"
                        );
                    }
                    ResolvedReference::Unresolved {
                        handle: item.clone(),
                        reason: e.reason(),
                        unreadable: e.is_unreadable(),
                    }
                }
            })
            .collect()
    }
}
