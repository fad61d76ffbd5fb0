//! Mock Provider Implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sn_provider::{ArtifactIdentity, ErrorCode, ProviderError, ProviderResult, SigningProvider};

use super::failure::{FailureConfig, FailureInjector};
use super::state::{module_name, FriendDeclaration, MockArtifact, MockCall, MockOp, MockReference, MockState};

/// Configurable in-memory signing provider for testing
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    /// Mutable state (wrapped for interior mutability)
    state: Arc<Mutex<MockState>>,
    /// Failure injector
    failures: Arc<Mutex<FailureInjector>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- universe setup -----

    pub fn add_artifact(&self, artifact: MockArtifact) {
        self.state.lock().unwrap().insert(artifact);
    }

    pub fn add_unsigned(&self, path: impl Into<PathBuf>) {
        self.add_artifact(MockArtifact::new(path, false));
    }

    pub fn add_signed(&self, path: impl Into<PathBuf>) {
        self.add_artifact(MockArtifact::new(path, true));
    }

    /// Register a path that exists but is not a valid module
    pub fn add_malformed(&self, path: impl Into<PathBuf>) {
        let mut artifact = MockArtifact::new(path, false);
        artifact.malformed = true;
        self.add_artifact(artifact);
    }

    /// Make `from` reference `to`, storing `to`'s current identity
    pub fn add_reference(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        let to = to.as_ref();
        let signed = state.get(to).map(|a| a.signed).unwrap_or(false);
        if let Some(artifact) = state.get_mut(from.as_ref()) {
            artifact.references.push(MockReference {
                name: module_name(to),
                target: to.to_path_buf(),
                signed,
            });
        }
    }

    /// Add a friend declaration to `artifact`
    pub fn add_friend(&self, artifact: impl AsRef<Path>, assembly: &str, public_key: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        if let Some(artifact) = state.get_mut(artifact.as_ref()) {
            artifact.friends.push(FriendDeclaration::new(assembly, public_key));
        }
    }

    // ----- failure injection -----

    pub fn inject(&self, op: MockOp, path: Option<&Path>, config: FailureConfig) {
        self.failures.lock().unwrap().inject(op, path, config);
    }

    pub fn fail_key_generation(&self, message: &str) {
        self.inject(
            MockOp::GenerateKeyPair,
            None,
            FailureConfig::error(ErrorCode::KeyGenerationFailed, message),
        );
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    // ----- inspection -----

    pub fn artifact(&self, path: impl AsRef<Path>) -> Option<MockArtifact> {
        self.state.lock().unwrap().get(path.as_ref()).cloned()
    }

    /// Stored reference from `from` to the module named like `to`
    pub fn reference(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Option<MockReference> {
        self.artifact(from)
            .and_then(|a| a.reference_to(to.as_ref()).cloned())
    }

    pub fn friends(&self, artifact: impl AsRef<Path>) -> Vec<FriendDeclaration> {
        self.artifact(artifact).map(|a| a.friends).unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, op: MockOp) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    pub fn sign_calls(&self) -> usize {
        self.calls_for(MockOp::Sign)
    }

    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    // ----- helpers -----

    fn begin(&self, op: MockOp, artifact: Option<&Path>, target: Option<&Path>) -> ProviderResult<()> {
        self.state.lock().unwrap().record(op, artifact, target);
        match self.failures.lock().unwrap().check(op, artifact) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn readable(state: &MockState, path: &Path) -> ProviderResult<MockArtifact> {
        match state.get(path) {
            None => Err(ProviderError::unreadable(path, "file not found")),
            Some(a) if a.malformed => Err(ProviderError::unreadable(
                path,
                "format of the executable (.exe) or library (.dll) is invalid",
            )),
            Some(a) => Ok(a.clone()),
        }
    }
}

impl SigningProvider for MockProvider {
    fn inspect(&self, path: &Path) -> ProviderResult<ArtifactIdentity> {
        self.begin(MockOp::Inspect, Some(path), None)?;
        let state = self.state.lock().unwrap();
        Ok(Self::readable(&state, path)?.identity())
    }

    fn generate_key_pair(&self) -> ProviderResult<Vec<u8>> {
        self.begin(MockOp::GenerateKeyPair, None, None)?;
        let mut state = self.state.lock().unwrap();
        state.keys_generated += 1;
        Ok(format!("mock-key-pair-{}", state.keys_generated).into_bytes())
    }

    fn sign(
        &self,
        path: &Path,
        key_path: &Path,
        output_dir: &Path,
        _probing_paths: &[PathBuf],
    ) -> ProviderResult<ArtifactIdentity> {
        self.begin(MockOp::Sign, Some(path), None)?;
        let mut state = self.state.lock().unwrap();
        let artifact = Self::readable(&state, path)?;

        if artifact.signed {
            return Ok(artifact.identity());
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| ProviderError::signing_failed(path, "path has no file name"))?;

        let mut signed = artifact;
        signed.path = output_dir.join(file_name);
        signed.signed = true;
        signed.signed_with = Some(key_path.to_path_buf());
        let identity = signed.identity();
        state.insert(signed);

        Ok(identity)
    }

    fn fix_reference(
        &self,
        artifact: &Path,
        referenced: &Path,
        _key_path: &Path,
        _probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        self.begin(MockOp::FixReference, Some(artifact), Some(referenced))?;
        let mut state = self.state.lock().unwrap();
        Self::readable(&state, artifact)?;
        let target = state
            .get(referenced)
            .map(MockArtifact::identity)
            .ok_or_else(|| {
                ProviderError::Operation(format!("cannot resolve '{}'", referenced.display()))
            })?;

        let Some(owner) = state.get_mut(artifact) else {
            return Ok(false);
        };
        let name = module_name(&target.path);
        let Some(reference) = owner
            .references
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(&name))
        else {
            return Ok(false);
        };

        if target.is_at(&reference.target) && reference.signed == target.is_signed {
            return Ok(false);
        }

        reference.target = target.path;
        reference.signed = target.is_signed;
        Ok(true)
    }

    fn remove_invalid_friend_declarations(
        &self,
        artifact: &Path,
        _key_path: &Path,
        _probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        self.begin(MockOp::RemoveInvalidFriends, Some(artifact), None)?;
        let mut state = self.state.lock().unwrap();
        Self::readable(&state, artifact)?;

        let Some(owner) = state.get_mut(artifact) else {
            return Ok(false);
        };
        let before = owner.friends.len();
        owner.friends.retain(|f| f.public_key.is_some());
        Ok(owner.friends.len() != before)
    }
}
