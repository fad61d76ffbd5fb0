//! Shared signing key provisioning.
//!
//! One key-pair file serves every signing operation in a batch. An existing
//! file is always reused: replacing it would break reference fixups against
//! artifacts signed in earlier batches.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sn_provider::{ProviderError, SigningProvider};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from key provisioning
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key generation failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("empty key pair for '{}'", .0.display())]
    EmptyKey(PathBuf),

    #[error("I/O error on key file '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Handle to the provisioned key file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    /// Location of the key-pair file
    pub path: PathBuf,

    /// SHA-256 of the key-pair bytes (hex)
    pub fingerprint: String,

    /// True if this invocation created the file
    pub created: bool,
}

impl SigningKey {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Ensure a key pair exists at `path`, generating one through `provider` if
/// absent. Never overwrites an existing file.
///
/// A new key is staged in a temporary file next to `path` and published with
/// a no-clobber rename, so readers never see a partial key.
pub fn ensure_key<P: SigningProvider + ?Sized>(
    provider: &P,
    path: &Path,
) -> Result<SigningKey, KeyError> {
    let io_err = |source: io::Error| KeyError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.is_file() {
        debug!(key = %path.display(), "Reusing existing key pair");
        return read_existing(path);
    }

    let bytes = provider.generate_key_pair()?;
    if bytes.is_empty() {
        return Err(KeyError::EmptyKey(path.to_path_buf()));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".sn-key-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    staged.write_all(&bytes).map_err(io_err)?;
    staged.as_file().sync_all().map_err(io_err)?;

    match staged.persist_noclobber(path) {
        Ok(_) => {
            info!(key = %path.display(), "Generated new key pair");
            Ok(SigningKey {
                path: path.to_path_buf(),
                fingerprint: compute_key_fingerprint(&bytes),
                created: true,
            })
        }
        // Another process published first; its key is the one to use.
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            debug!(key = %path.display(), "Key pair provisioned concurrently");
            read_existing(path)
        }
        Err(e) => Err(io_err(e.error)),
    }
}

fn read_existing(path: &Path) -> Result<SigningKey, KeyError> {
    let bytes = fs::read(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(KeyError::EmptyKey(path.to_path_buf()));
    }
    Ok(SigningKey {
        path: path.to_path_buf(),
        fingerprint: compute_key_fingerprint(&bytes),
        created: false,
    })
}

/// SHA-256 fingerprint of raw key-pair bytes
pub fn compute_key_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockOp, MockProvider};
    use tempfile::TempDir;

    #[test]
    fn test_creates_key_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys").join("StrongNameSigner.snk");
        let provider = MockProvider::new();

        let key = ensure_key(&provider, &path).unwrap();

        assert!(key.created);
        assert!(path.is_file());
        assert_eq!(key.fingerprint.len(), 64);
        assert_eq!(provider.calls_for(MockOp::GenerateKeyPair), 1);
    }

    #[test]
    fn test_reuses_existing_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("StrongNameSigner.snk");
        fs::write(&path, b"existing-key").unwrap();
        let provider = MockProvider::new();

        let key = ensure_key(&provider, &path).unwrap();

        assert!(!key.created);
        assert_eq!(key.fingerprint, compute_key_fingerprint(b"existing-key"));
        assert_eq!(fs::read(&path).unwrap(), b"existing-key");
        assert_eq!(provider.calls_for(MockOp::GenerateKeyPair), 0);
    }

    #[test]
    fn test_second_call_reuses_first_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("StrongNameSigner.snk");
        let provider = MockProvider::new();

        let first = ensure_key(&provider, &path).unwrap();
        let second = ensure_key(&provider, &path).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn test_empty_existing_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("StrongNameSigner.snk");
        fs::write(&path, b"").unwrap();
        let provider = MockProvider::new();

        let err = ensure_key(&provider, &path).unwrap_err();

        assert!(matches!(err, KeyError::EmptyKey(ref p) if p == &path));
        assert_eq!(provider.calls_for(MockOp::GenerateKeyPair), 0);
        assert!(fs::read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_new_key_leaves_no_staging_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("StrongNameSigner.snk");
        let provider = MockProvider::new();

        ensure_key(&provider, &path).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("StrongNameSigner.snk")]);
    }

    #[test]
    fn test_generation_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("StrongNameSigner.snk");
        let provider = MockProvider::new();
        provider.fail_key_generation("no entropy");

        let err = ensure_key(&provider, &path).unwrap_err();

        assert!(matches!(err, KeyError::Generation(_)));
        assert!(!path.exists());
    }
}
