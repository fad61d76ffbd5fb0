//! Batch status and stable exit codes

use serde::{Deserialize, Serialize};

/// Overall batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Every artifact processed, no warnings
    Success,
    /// Outputs produced, but some artifacts were unreadable or some fixups failed
    Degraded,
    /// At least one artifact failed to sign
    Failed,
}

impl Status {
    /// The single success boolean reported to the host
    pub fn is_success(&self) -> bool {
        !matches!(self, Status::Failed)
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Status::Success | Status::Degraded => ExitCode::Success,
            Status::Failed => ExitCode::SigningFailed,
        }
    }
}

/// Stable exit codes for the `sn-batch` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Batch completed (possibly degraded)
    #[default]
    Success = 0,
    /// Local I/O failure outside any single artifact
    Io = 1,
    /// Missing or invalid configuration (output directory, config file)
    InvalidConfiguration = 2,
    /// One or more artifacts failed to sign
    SigningFailed = 3,
    /// The shared key pair could not be provisioned
    KeyProvisioning = 4,
    /// The output directory lock could not be acquired
    Lock = 5,
}

impl ExitCode {
    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::Io),
            2 => Some(ExitCode::InvalidConfiguration),
            3 => Some(ExitCode::SigningFailed),
            4 => Some(ExitCode::KeyProvisioning),
            5 => Some(ExitCode::Lock),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_is_still_success() {
        assert!(Status::Success.is_success());
        assert!(Status::Degraded.is_success());
        assert!(!Status::Failed.is_success());
        assert_eq!(Status::Degraded.exit_code(), ExitCode::Success);
        assert_eq!(Status::Failed.exit_code(), ExitCode::SigningFailed);
    }

    #[test]
    fn test_exit_code_round_trip() {
        for code in [
            ExitCode::Success,
            ExitCode::Io,
            ExitCode::InvalidConfiguration,
            ExitCode::SigningFailed,
            ExitCode::KeyProvisioning,
            ExitCode::Lock,
        ] {
            assert_eq!(ExitCode::from_i32(code.as_i32()), Some(code));
        }
        assert_eq!(ExitCode::from_i32(42), None);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Degraded).unwrap(), "\"degraded\"");
    }
}
