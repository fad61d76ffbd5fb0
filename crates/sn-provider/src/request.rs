//! Provider request envelope.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::WIRE_VERSION;

/// One provider operation and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Inspect {
        path: PathBuf,
    },
    GenerateKeyPair,
    Sign {
        path: PathBuf,
        key_path: PathBuf,
        output_dir: PathBuf,
        probing_paths: Vec<PathBuf>,
    },
    FixReference {
        artifact: PathBuf,
        referenced: PathBuf,
        key_path: PathBuf,
        probing_paths: Vec<PathBuf>,
    },
    RemoveInvalidFriends {
        artifact: PathBuf,
        key_path: PathBuf,
        probing_paths: Vec<PathBuf>,
    },
}

impl Operation {
    /// Stable operation name, matching the `op` tag
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Inspect { .. } => "inspect",
            Operation::GenerateKeyPair => "generate_key_pair",
            Operation::Sign { .. } => "sign",
            Operation::FixReference { .. } => "fix_reference",
            Operation::RemoveInvalidFriends { .. } => "remove_invalid_friends",
        }
    }

    /// The artifact this operation is about, if any
    pub fn subject(&self) -> Option<&Path> {
        match self {
            Operation::Inspect { path } | Operation::Sign { path, .. } => Some(path),
            Operation::FixReference { artifact, .. }
            | Operation::RemoveInvalidFriends { artifact, .. } => Some(artifact),
            Operation::GenerateKeyPair => None,
        }
    }
}

/// Request written to a subprocess provider's stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Envelope version
    pub version: u32,

    #[serde(flatten)]
    pub operation: Operation,
}

impl ProviderRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            version: WIRE_VERSION,
            operation,
        }
    }
}
