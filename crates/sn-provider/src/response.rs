//! Provider response envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ProviderError, ProviderResult, WireError};

/// Response read from a subprocess provider's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Success payload (present when ok=true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error details (present when ok=false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

/// Payload of `generate_key_pair`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPairPayload {
    /// Base64-encoded key pair blob
    pub key_pair: String,
}

/// Payload of `fix_reference` and `remove_invalid_friends`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChangedPayload {
    pub changed: bool,
}

impl ProviderResponse {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(error: WireError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error),
        }
    }

    /// Decode the payload, or turn the error payload into a `ProviderError`.
    pub fn into_result<T: DeserializeOwned>(self, subject: Option<PathBuf>) -> ProviderResult<T> {
        if !self.ok {
            let error = self.error.ok_or_else(|| {
                ProviderError::Protocol("ok=false response without error".to_string())
            })?;
            return Err(ProviderError::from_wire(error, subject));
        }

        let result = self
            .result
            .ok_or_else(|| ProviderError::Protocol("ok=true response without result".to_string()))?;
        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::identity::ArtifactIdentity;
    use serde_json::json;

    #[test]
    fn test_success_decodes_identity() {
        let response: ProviderResponse = serde_json::from_value(json!({
            "ok": true,
            "result": { "path": "/out/A.dll", "is_signed": true }
        }))
        .unwrap();

        let identity: ArtifactIdentity = response.into_result(None).unwrap();
        assert_eq!(identity, ArtifactIdentity::signed("/out/A.dll"));
    }

    #[test]
    fn test_error_maps_to_provider_error() {
        let response = ProviderResponse::error(WireError::new(
            ErrorCode::SigningFailed,
            "file is locked",
        ));

        let err = response
            .into_result::<ChangedPayload>(Some(PathBuf::from("/in/A.dll")))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SigningFailed);
        assert_eq!(err.reason(), "file is locked");
    }

    #[test]
    fn test_missing_result_is_protocol_error() {
        let response = ProviderResponse {
            ok: true,
            result: None,
            error: None,
        };

        let err = response.into_result::<ChangedPayload>(None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProtocolError);
    }
}
