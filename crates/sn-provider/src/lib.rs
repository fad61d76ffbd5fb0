//! Signing provider boundary for sn-batch
//!
//! Defines the artifact identity model, the `SigningProvider` trait the batch
//! engine drives, and the JSON envelope used by subprocess providers.

pub mod command;
pub mod error;
pub mod identity;
pub mod provider;
pub mod request;
pub mod response;

pub use command::CommandProvider;
pub use error::{ErrorCode, ProviderError, ProviderResult, WireError};
pub use identity::{ArtifactIdentity, PathKey};
pub use provider::SigningProvider;
pub use request::{Operation, ProviderRequest};
pub use response::{ChangedPayload, KeyPairPayload, ProviderResponse};

/// Envelope version spoken by `CommandProvider`.
pub const WIRE_VERSION: u32 = 1;
