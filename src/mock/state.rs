//! Mock Provider State Management
//!
//! Tracks registered artifacts and the calls made against them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sn_provider::{ArtifactIdentity, PathKey};

/// Provider operations, for call recording and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Inspect,
    GenerateKeyPair,
    Sign,
    FixReference,
    RemoveInvalidFriends,
}

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: MockOp,
    /// Artifact the call was about
    pub artifact: Option<PathBuf>,
    /// Referenced artifact (fix_reference only)
    pub target: Option<PathBuf>,
}

/// A stored reference from one artifact to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockReference {
    /// Referenced module name (file name, matched case-insensitively)
    pub name: String,
    /// Where the stored identity says the module lives
    pub target: PathBuf,
    /// Whether the stored identity includes a public key token
    pub signed: bool,
}

/// A friend-access grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendDeclaration {
    pub assembly: String,
    pub public_key: Option<String>,
}

impl FriendDeclaration {
    pub fn new(assembly: impl Into<String>, public_key: Option<&str>) -> Self {
        Self {
            assembly: assembly.into(),
            public_key: public_key.map(str::to_string),
        }
    }
}

/// A module known to the mock provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockArtifact {
    pub path: PathBuf,
    pub signed: bool,
    /// Not a valid module; every operation reports it unreadable
    pub malformed: bool,
    /// Key the artifact was signed with by this provider
    pub signed_with: Option<PathBuf>,
    pub references: Vec<MockReference>,
    pub friends: Vec<FriendDeclaration>,
}

impl MockArtifact {
    pub fn new(path: impl Into<PathBuf>, signed: bool) -> Self {
        Self {
            path: path.into(),
            signed,
            malformed: false,
            signed_with: None,
            references: Vec::new(),
            friends: Vec::new(),
        }
    }

    pub fn identity(&self) -> ArtifactIdentity {
        ArtifactIdentity::new(self.path.clone(), self.signed)
    }

    /// Module name used when other artifacts reference this one
    pub fn module_name(&self) -> String {
        module_name(&self.path)
    }

    /// Stored reference to the module named like `path`, if any
    pub fn reference_to(&self, path: &Path) -> Option<&MockReference> {
        let name = module_name(path);
        self.references
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(&name))
    }
}

pub(crate) fn module_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// All mock provider state
#[derive(Debug, Default)]
pub struct MockState {
    pub artifacts: HashMap<PathKey, MockArtifact>,
    pub calls: Vec<MockCall>,
    /// Number of key pairs generated so far
    pub keys_generated: u32,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, artifact: MockArtifact) {
        self.artifacts
            .insert(PathKey::from_path(&artifact.path), artifact);
    }

    pub fn get(&self, path: &Path) -> Option<&MockArtifact> {
        self.artifacts.get(&PathKey::from_path(path))
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut MockArtifact> {
        self.artifacts.get_mut(&PathKey::from_path(path))
    }

    pub fn record(&mut self, op: MockOp, artifact: Option<&Path>, target: Option<&Path>) {
        self.calls.push(MockCall {
            op,
            artifact: artifact.map(Path::to_path_buf),
            target: target.map(Path::to_path_buf),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_lookup_by_module_name() {
        let mut artifact = MockArtifact::new("/in/A.dll", false);
        artifact.references.push(MockReference {
            name: "B.dll".to_string(),
            target: PathBuf::from("/in/B.dll"),
            signed: false,
        });

        assert!(artifact.reference_to(Path::new("/out/b.DLL")).is_some());
        assert!(artifact.reference_to(Path::new("/out/C.dll")).is_none());
    }

    #[test]
    fn test_state_lookup_ignores_case() {
        let mut state = MockState::new();
        state.insert(MockArtifact::new("/in/A.dll", true));

        assert!(state.get(Path::new("/IN/a.dll")).is_some());
        assert_eq!(state.get(Path::new("/in/A.dll")).unwrap().module_name(), "A.dll");
    }
}
