//! Access constraints carried in the `policy` query parameter.
//!
//! On the wire the policy is compact JSON with a fixed key order:
//!
//! ```text
//! {"url_expire":1399721581000,"url_activate":1399721576000,"stream_expire":1399731576000,"allow_ip":"192.168.100.5/32"}
//! ```
//!
//! Timestamps are integer milliseconds since the Unix epoch. Keys for absent
//! constraints are left out entirely.

use crate::crypto::{decode_unpadded, encode_unpadded};
use crate::error::IssueError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Constraints attached to an issued URL.
///
/// Timestamps keep their full precision here but are truncated to whole
/// milliseconds when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// The URL is rejected after this instant.
    pub url_expire: DateTime<Utc>,
    /// The URL is rejected before this instant.
    pub url_activate: Option<DateTime<Utc>>,
    /// Independent expiry for the stream once playback has started.
    pub stream_expire: Option<DateTime<Utc>>,
    /// IP address or CIDR block of the connecting client. Not validated here.
    pub allow_ip: Option<String>,
    /// IP address or CIDR block of the real client behind a proxy. Not validated here.
    pub real_ip: Option<String>,
}

/// Serialized form. Field declaration order is the wire order and must not change:
/// the signature covers these exact bytes.
#[derive(Debug, Serialize, Deserialize)]
struct WirePolicy {
    url_expire: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_activate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stream_expire: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    real_ip: Option<String>,
}

fn to_epoch_millis(field: &str, at: &DateTime<Utc>) -> Result<u64, IssueError> {
    u64::try_from(at.timestamp_millis()).map_err(|_| {
        IssueError::Input(format!(
            "{} ({}) is before the Unix epoch and cannot be sent as epoch milliseconds",
            field,
            at.to_rfc3339()
        ))
    })
}

fn from_epoch_millis(field: &str, ms: u64) -> Result<DateTime<Utc>, IssueError> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| IssueError::Encoding(format!("{} {} is out of range", field, ms)))
}

impl Policy {
    pub fn new(url_expire: DateTime<Utc>) -> Self {
        Self {
            url_expire,
            url_activate: None,
            stream_expire: None,
            allow_ip: None,
            real_ip: None,
        }
    }

    pub fn activate_at(mut self, at: DateTime<Utc>) -> Self {
        self.url_activate = Some(at);
        self
    }

    pub fn stream_expire_at(mut self, at: DateTime<Utc>) -> Self {
        self.stream_expire = Some(at);
        self
    }

    pub fn allow_ip(mut self, cidr: impl Into<String>) -> Self {
        self.allow_ip = Some(cidr.into());
        self
    }

    pub fn real_ip(mut self, cidr: impl Into<String>) -> Self {
        self.real_ip = Some(cidr.into());
        self
    }

    fn to_wire(&self) -> Result<WirePolicy, IssueError> {
        Ok(WirePolicy {
            url_expire: to_epoch_millis("url_expire", &self.url_expire)?,
            url_activate: self
                .url_activate
                .as_ref()
                .map(|t| to_epoch_millis("url_activate", t))
                .transpose()?,
            stream_expire: self
                .stream_expire
                .as_ref()
                .map(|t| to_epoch_millis("stream_expire", t))
                .transpose()?,
            allow_ip: self.allow_ip.clone(),
            real_ip: self.real_ip.clone(),
        })
    }

    /// Canonical compact JSON. Identical policies always produce identical bytes.
    pub fn to_json(&self) -> Result<String, IssueError> {
        let wire = self.to_wire()?;
        serde_json::to_string(&wire)
            .map_err(|e| IssueError::Encoding(format!("failed to serialize policy: {}", e)))
    }

    /// Value of the `policy` query parameter.
    pub fn encode(&self) -> Result<String, IssueError> {
        Ok(encode_unpadded(self.to_json()?.as_bytes()))
    }

    /// Read a `policy` query parameter back. Does not check the signature or any timestamp.
    pub fn decode(encoded: &str) -> Result<Self, IssueError> {
        let bytes = decode_unpadded(encoded)?;
        let wire: WirePolicy = serde_json::from_slice(&bytes)
            .map_err(|e| IssueError::Encoding(format!("invalid policy JSON: {}", e)))?;
        Ok(Self {
            url_expire: from_epoch_millis("url_expire", wire.url_expire)?,
            url_activate: wire
                .url_activate
                .map(|ms| from_epoch_millis("url_activate", ms))
                .transpose()?,
            stream_expire: wire
                .stream_expire
                .map(|ms| from_epoch_millis("stream_expire", ms))
                .transpose()?,
            allow_ip: wire.allow_ip,
            real_ip: wire.real_ip,
        })
    }
}
