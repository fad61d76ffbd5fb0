//! Failure Injection for Mock Provider

use std::collections::HashMap;
use std::path::Path;

use sn_provider::{ErrorCode, PathKey, ProviderError, WireError};

use super::state::MockOp;

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error code to report
    pub code: ErrorCode,
    /// Error message to report
    pub message: String,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that returns an error
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fail_count: None,
        }
    }

    /// Report the artifact as malformed
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::error(ErrorCode::UnreadableArtifact, message)
    }

    /// Report a signing failure (permissions, locked file)
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::error(ErrorCode::SigningFailed, message)
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

type InjectionKey = (MockOp, Option<PathKey>);

/// Failure injector for the mock provider
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// Failure configs per operation, optionally scoped to one artifact
    configs: HashMap<InjectionKey, FailureConfig>,
    /// Call counts (for fail_count tracking)
    call_counts: HashMap<InjectionKey, u32>,
}

impl FailureInjector {
    /// Create a new failure injector
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for `op` on `path`, or on every path when `None`
    pub fn inject(&mut self, op: MockOp, path: Option<&Path>, config: FailureConfig) {
        let key = (op, path.map(PathKey::from_path));
        self.configs.insert(key.clone(), config);
        self.call_counts.insert(key, 0);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Check if a failure should occur. Path-scoped injections win over
    /// operation-wide ones.
    pub fn check(&mut self, op: MockOp, path: Option<&Path>) -> Option<ProviderError> {
        let scoped = path.map(|p| (op, Some(PathKey::from_path(p))));
        let key = match scoped {
            Some(key) if self.configs.contains_key(&key) => key,
            _ => (op, None),
        };

        let config = self.configs.get(&key)?;
        let count = self.call_counts.entry(key).or_insert(0);
        *count += 1;

        if let Some(fail_limit) = config.fail_count {
            if *count > fail_limit {
                return None;
            }
        }

        let wire = WireError::new(config.code, config.message.clone());
        Some(ProviderError::from_wire(wire, path.map(Path::to_path_buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_failure_only_hits_its_path() {
        let mut injector = FailureInjector::new();
        injector.inject(
            MockOp::Sign,
            Some(Path::new("/in/A.dll")),
            FailureConfig::signing_failed("locked"),
        );

        let err = injector.check(MockOp::Sign, Some(Path::new("/IN/a.dll"))).unwrap();
        assert_eq!(err.code(), ErrorCode::SigningFailed);
        assert!(injector.check(MockOp::Sign, Some(Path::new("/in/B.dll"))).is_none());
        assert!(injector.check(MockOp::Inspect, Some(Path::new("/in/A.dll"))).is_none());
    }

    #[test]
    fn test_wildcard_failure() {
        let mut injector = FailureInjector::new();
        injector.inject(MockOp::FixReference, None, FailureConfig::error(ErrorCode::OperationFailed, "io"));

        assert!(injector.check(MockOp::FixReference, Some(Path::new("/a"))).is_some());
        assert!(injector.check(MockOp::FixReference, Some(Path::new("/b"))).is_some());
    }

    #[test]
    fn test_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(
            MockOp::Sign,
            None,
            FailureConfig::signing_failed("busy").with_fail_count(2),
        );

        assert!(injector.check(MockOp::Sign, None).is_some());
        assert!(injector.check(MockOp::Sign, None).is_some());
        assert!(injector.check(MockOp::Sign, None).is_none());
    }

    #[test]
    fn test_clear() {
        let mut injector = FailureInjector::new();
        injector.inject(MockOp::Inspect, None, FailureConfig::unreadable("bad"));
        injector.clear();

        assert!(injector.check(MockOp::Inspect, None).is_none());
    }
}
