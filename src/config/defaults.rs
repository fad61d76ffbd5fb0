//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::batch::SIGNED_DIR_NAME;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Signed-output subdirectory (default: "StrongNameSigner")
    pub signed_dir_name: String,

    /// Batch lock wait in seconds (default: 60)
    pub lock_timeout_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            signed_dir_name: SIGNED_DIR_NAME.to_string(),
            lock_timeout_seconds: 60,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging.
    ///
    /// `key_file` and `provider` have no builtin value; they resolve at
    /// run time.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "signed_dir_name": self.signed_dir_name,
            "lock_timeout_seconds": self.lock_timeout_seconds,
        })
    }
}
