//! Artifact identity snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Case-insensitive key for an artifact path.
///
/// Artifact paths compare under case-insensitive filesystem semantics, so every
/// map or set keyed by path goes through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Path> for PathKey {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

impl From<&PathBuf> for PathKey {
    fn from(path: &PathBuf) -> Self {
        Self::from_path(path)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of an artifact's identity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactIdentity {
    /// Canonical path of the artifact
    pub path: PathBuf,

    /// Whether the artifact carries a strong-name signature
    pub is_signed: bool,
}

impl ArtifactIdentity {
    pub fn new(path: impl Into<PathBuf>, is_signed: bool) -> Self {
        Self {
            path: path.into(),
            is_signed,
        }
    }

    pub fn signed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, true)
    }

    pub fn unsigned(path: impl Into<PathBuf>) -> Self {
        Self::new(path, false)
    }

    /// Case-insensitive key of this identity's path
    pub fn key(&self) -> PathKey {
        PathKey::from_path(&self.path)
    }

    /// True if both identities denote the same artifact on disk
    pub fn same_artifact(&self, other: &ArtifactIdentity) -> bool {
        self.key() == other.key()
    }

    /// True if this identity lives at `path`
    pub fn is_at(&self, path: &Path) -> bool {
        self.key() == PathKey::from_path(path)
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_signed { "signed" } else { "unsigned" };
        write!(f, "{} ({})", self.path.display(), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_artifact_ignores_case() {
        let a = ArtifactIdentity::unsigned("/build/Lib/Foo.dll");
        let b = ArtifactIdentity::signed("/build/lib/FOO.DLL");

        assert!(a.same_artifact(&b));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_different_paths_are_different_artifacts() {
        let a = ArtifactIdentity::signed("/build/a/Foo.dll");
        let b = ArtifactIdentity::signed("/build/b/Foo.dll");

        assert!(!a.same_artifact(&b));
        assert!(a.is_at(Path::new("/BUILD/A/foo.dll")));
    }

    #[test]
    fn test_display() {
        let id = ArtifactIdentity::unsigned("/x/A.dll");
        assert_eq!(id.to_string(), "/x/A.dll (unsigned)");
    }
}
