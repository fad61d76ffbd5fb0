//! The signing provider trait.

use std::path::{Path, PathBuf};

use crate::error::ProviderResult;
use crate::identity::ArtifactIdentity;

/// Binary inspection and transform primitives the batch engine relies on.
///
/// Implementations own the binary format and the signing algorithm. The batch
/// engine only sequences these calls.
pub trait SigningProvider {
    /// Read the identity state of the module at `path`.
    ///
    /// Fails with `ProviderError::UnreadableArtifact` if `path` is not a valid
    /// module. Must not modify anything.
    fn inspect(&self, path: &Path) -> ProviderResult<ArtifactIdentity>;

    /// Generate a fresh key pair blob.
    fn generate_key_pair(&self) -> ProviderResult<Vec<u8>>;

    /// Sign the module at `path` with the key at `key_path`, writing the result
    /// into `output_dir`. `probing_paths` help locate dependencies.
    fn sign(
        &self,
        path: &Path,
        key_path: &Path,
        output_dir: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<ArtifactIdentity>;

    /// Rewrite `artifact`'s reference to `referenced` so it matches
    /// `referenced`'s current identity. No-op (returns `false`) when `artifact`
    /// does not reference it.
    fn fix_reference(
        &self,
        artifact: &Path,
        referenced: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool>;

    /// Remove friend declarations that carry no public key. Returns whether
    /// anything was removed.
    fn remove_invalid_friend_declarations(
        &self,
        artifact: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool>;
}

impl<P: SigningProvider + ?Sized> SigningProvider for &P {
    fn inspect(&self, path: &Path) -> ProviderResult<ArtifactIdentity> {
        (**self).inspect(path)
    }

    fn generate_key_pair(&self) -> ProviderResult<Vec<u8>> {
        (**self).generate_key_pair()
    }

    fn sign(
        &self,
        path: &Path,
        key_path: &Path,
        output_dir: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<ArtifactIdentity> {
        (**self).sign(path, key_path, output_dir, probing_paths)
    }

    fn fix_reference(
        &self,
        artifact: &Path,
        referenced: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        (**self).fix_reference(artifact, referenced, key_path, probing_paths)
    }

    fn remove_invalid_friend_declarations(
        &self,
        artifact: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        (**self).remove_invalid_friend_declarations(artifact, key_path, probing_paths)
    }
}

impl<P: SigningProvider + ?Sized> SigningProvider for Box<P> {
    fn inspect(&self, path: &Path) -> ProviderResult<ArtifactIdentity> {
        (**self).inspect(path)
    }

    fn generate_key_pair(&self) -> ProviderResult<Vec<u8>> {
        (**self).generate_key_pair()
    }

    fn sign(
        &self,
        path: &Path,
        key_path: &Path,
        output_dir: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<ArtifactIdentity> {
        (**self).sign(path, key_path, output_dir, probing_paths)
    }

    fn fix_reference(
        &self,
        artifact: &Path,
        referenced: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        (**self).fix_reference(artifact, referenced, key_path, probing_paths)
    }

    fn remove_invalid_friend_declarations(
        &self,
        artifact: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        (**self).remove_invalid_friend_declarations(artifact, key_path, probing_paths)
    }
}
