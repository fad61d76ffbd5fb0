//! Batch signing engine
//!
//! Each step lives in its own module and is driven by [`Orchestrator`].

mod key;
mod logging;
mod orchestrator;
mod reconcile;
mod remap;
mod resolver;
mod scrub;
mod signer;
mod state;

pub use key::{compute_key_fingerprint, ensure_key, KeyError, SigningKey};
pub use logging::LoggingBatch;
pub use orchestrator::{
    BatchError, BatchOutput, BatchRequest, BatchResult, BatchSettings, Orchestrator,
    ReferenceBatch, KEY_FILE_NAME, SIGNED_DIR_NAME,
};
pub use reconcile::{ReconcileOutcome, ReferenceReconciler, StepWarning};
pub use remap::{remap, Rename, RenameMap};
pub use resolver::{IdentityResolver, ReferenceEntry, ResolvedReference};
pub use scrub::{ScrubOutcome, TrustScrubber};
pub use signer::{probing_paths, ArtifactDisposition, BatchSigner, EntryOutcome, SignOutcome};
pub use state::{BatchProgress, BatchState, TransitionError};
