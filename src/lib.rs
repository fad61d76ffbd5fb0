//! sn-batch - batch strong-name signing
//!
//! Takes the reference list of a build, signs every unsigned artifact with one
//! shared key, re-links references between artifacts of the batch, strips
//! friend declarations a signed artifact can no longer honor, and rewrites
//! auxiliary file lists to point at the signed copies.
//!
//! The binary format work is delegated to a [`SigningProvider`]; this crate
//! decides what to sign, in which order, and how results propagate.

pub mod batch;
pub mod config;
pub mod item;
pub mod lock;
pub mod mock;
pub mod report;

pub use batch::{
    BatchError, BatchOutput, BatchRequest, BatchResult, BatchSettings, LoggingBatch, Orchestrator,
    ReferenceBatch,
};
pub use config::{EffectiveConfig, SignerSettings};
pub use item::{BuildItem, TaskItem};
pub use lock::{BatchLock, LockError};
pub use report::{BatchReport, ExitCode, Status};
pub use sn_provider::{ArtifactIdentity, CommandProvider, SigningProvider};
