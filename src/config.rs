//! Issuer configuration loaded from JSON.

use crate::error::IssueError;
use crate::secret::SecretKey;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_POLICY_QUERY_KEY: &str = "policy";
pub const DEFAULT_SIGNATURE_QUERY_KEY: &str = "signature";

fn default_policy_query_key() -> String {
    DEFAULT_POLICY_QUERY_KEY.to_string()
}

fn default_signature_query_key() -> String {
    DEFAULT_SIGNATURE_QUERY_KEY.to_string()
}

/// Settings for a [`crate::PolicyIssuer`].
///
/// ```json
/// {
///   "base_url": "wss://edge01.example.com/app/stream",
///   "secret_key_file": "/etc/edge/policy.key",
///   "policy_query_key": "policy",
///   "signature_query_key": "signature"
/// }
/// ```
///
/// Exactly one of `secret_key` and `secret_key_file` should be set; an inline
/// `secret_key` wins when both are present.
#[derive(Deserialize, Clone)]
pub struct IssuerConfig {
    #[serde(default)]
    pub base_url: String,

    /// Inline shared secret.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// File holding the shared secret.
    #[serde(default)]
    pub secret_key_file: Option<PathBuf>,

    #[serde(default = "default_policy_query_key")]
    pub policy_query_key: String,

    #[serde(default = "default_signature_query_key")]
    pub signature_query_key: String,
}

impl std::fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerConfig")
            .field("base_url", &self.base_url)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key_file", &self.secret_key_file)
            .field("policy_query_key", &self.policy_query_key)
            .field("signature_query_key", &self.signature_query_key)
            .finish()
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            secret_key: None,
            secret_key_file: None,
            policy_query_key: default_policy_query_key(),
            signature_query_key: default_signature_query_key(),
        }
    }
}

impl IssuerConfig {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret_key: Some(secret_key.into()),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, IssueError> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            IssueError::Configuration(format!("failed to read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&s)
            .map_err(|e| IssueError::Configuration(format!("invalid config JSON: {}", e)))
    }

    /// Resolve the secret from the inline value or the key file.
    pub fn secret(&self) -> Result<SecretKey, IssueError> {
        match (&self.secret_key, &self.secret_key_file) {
            (Some(key), _) => Ok(SecretKey::from(key.as_str())),
            (None, Some(path)) => SecretKey::from_file(path),
            (None, None) => Err(IssueError::Configuration(
                "no secret_key or secret_key_file configured".to_string(),
            )),
        }
    }
}
