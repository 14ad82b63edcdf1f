//! Error taxonomy for policy issuing.

use thiserror::Error;

/// Errors returned while building an issuer or issuing a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError {
    /// The issuer was built from an unusable secret, base URL or query key.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The policy could not be serialized, or an encoded policy could not be read back.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A caller-supplied value cannot be expressed on the wire.
    #[error("input error: {0}")]
    Input(String),
}
