//! Shared secret used to sign policies.

use crate::error::IssueError;
use std::fmt;
use std::path::Path;

/// Raw HMAC key material. Held in memory only; `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Load key bytes from a file. A single trailing newline is dropped so that
    /// keys written with `echo` sign the same as keys passed on the command line.
    pub fn from_file(path: &Path) -> Result<Self, IssueError> {
        let mut bytes = std::fs::read(path).map_err(|e| {
            IssueError::Configuration(format!(
                "failed to read secret key {}: {}",
                path.display(),
                e
            ))
        })?;
        if bytes.ends_with(b"\r\n") {
            bytes.truncate(bytes.len() - 2);
        } else if bytes.ends_with(b"\n") {
            bytes.truncate(bytes.len() - 1);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SecretKey {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for SecretKey {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}
