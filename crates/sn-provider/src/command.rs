//! Subprocess signing provider.
//!
//! Spawns a helper executable once per operation. The request is a single JSON
//! line on stdin; the response is a single JSON document on stdout.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use base64::Engine;

use crate::error::{ProviderError, ProviderResult};
use crate::identity::ArtifactIdentity;
use crate::provider::SigningProvider;
use crate::request::{Operation, ProviderRequest};
use crate::response::{ChangedPayload, KeyPairPayload, ProviderResponse};

/// `SigningProvider` backed by an external helper process
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Fixed arguments passed before the request is written
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run one request/response exchange
    pub fn call(&self, request: &ProviderRequest) -> ProviderResult<ProviderResponse> {
        let request_json = serde_json::to_string(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ProviderError::Protocol(format!("failed to spawn '{}': {}", self.program, e))
            })?;

        // Closing stdin (drop) signals end of request. A helper that exits
        // early makes this fail; it is still reaped below.
        let written = match child.stdin.take() {
            Some(mut stdin) => writeln!(stdin, "{}", request_json).and_then(|_| stdin.flush()),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;

        // A provider may exit non-zero after writing a well-formed error response.
        match serde_json::from_slice::<ProviderResponse>(&output.stdout) {
            Ok(response) => Ok(response),
            Err(_) if written.is_err() || !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let write_error = written
                    .err()
                    .map(|e| format!(" [request not delivered: {}]", e))
                    .unwrap_or_default();
                Err(ProviderError::Protocol(format!(
                    "'{}' {} ({} {}){}: {}",
                    self.program,
                    output.status,
                    request.operation.name(),
                    request
                        .operation
                        .subject()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    write_error,
                    stderr.trim()
                )))
            }
            Err(e) => Err(ProviderError::Protocol(format!(
                "invalid response JSON from '{}': {}",
                self.program, e
            ))),
        }
    }

    fn exchange<T: serde::de::DeserializeOwned>(&self, operation: Operation) -> ProviderResult<T> {
        let subject = operation.subject().map(Path::to_path_buf);
        let request = ProviderRequest::new(operation);
        self.call(&request)?.into_result(subject)
    }
}

impl SigningProvider for CommandProvider {
    fn inspect(&self, path: &Path) -> ProviderResult<ArtifactIdentity> {
        self.exchange(Operation::Inspect {
            path: path.to_path_buf(),
        })
    }

    fn generate_key_pair(&self) -> ProviderResult<Vec<u8>> {
        let payload: KeyPairPayload = self.exchange(Operation::GenerateKeyPair)?;
        base64::engine::general_purpose::STANDARD
            .decode(payload.key_pair.as_bytes())
            .map_err(|e| ProviderError::KeyGeneration(format!("invalid base64 key pair: {}", e)))
    }

    fn sign(
        &self,
        path: &Path,
        key_path: &Path,
        output_dir: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<ArtifactIdentity> {
        self.exchange(Operation::Sign {
            path: path.to_path_buf(),
            key_path: key_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            probing_paths: probing_paths.to_vec(),
        })
    }

    fn fix_reference(
        &self,
        artifact: &Path,
        referenced: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        let payload: ChangedPayload = self.exchange(Operation::FixReference {
            artifact: artifact.to_path_buf(),
            referenced: referenced.to_path_buf(),
            key_path: key_path.to_path_buf(),
            probing_paths: probing_paths.to_vec(),
        })?;
        Ok(payload.changed)
    }

    fn remove_invalid_friend_declarations(
        &self,
        artifact: &Path,
        key_path: &Path,
        probing_paths: &[PathBuf],
    ) -> ProviderResult<bool> {
        let payload: ChangedPayload = self.exchange(Operation::RemoveInvalidFriends {
            artifact: artifact.to_path_buf(),
            key_path: key_path.to_path_buf(),
            probing_paths: probing_paths.to_vec(),
        })?;
        Ok(payload.changed)
    }
}
