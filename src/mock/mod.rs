//! Mock Signing Provider
//!
//! In-memory artifact universe implementing `SigningProvider` for tests.
//! Artifacts carry references (matched by file name, the way assembly
//! references match by name) and friend declarations, so reference fixups and
//! friend scrubbing have observable effects.
//!
//! # Operations
//!
//! - `inspect`: Identity of a registered artifact, `UNREADABLE_ARTIFACT` otherwise
//! - `generate_key_pair`: Deterministic key bytes
//! - `sign`: Copy into the output directory as signed
//! - `fix_reference`: Point a stored reference at the target's current identity
//! - `remove_invalid_friends`: Drop friend declarations with no public key
//!
//! Every call is recorded; failures can be injected per operation and path.

mod failure;
mod provider;
mod state;

pub use failure::{FailureConfig, FailureInjector};
pub use provider::MockProvider;
pub use state::{FriendDeclaration, MockArtifact, MockCall, MockOp, MockReference, MockState};
