//! Policy issuing: serialize constraints, encode, sign, assemble the URL.

use crate::config::{IssuerConfig, DEFAULT_POLICY_QUERY_KEY, DEFAULT_SIGNATURE_QUERY_KEY};
use crate::crypto::sign_url;
use crate::error::IssueError;
use crate::policy::Policy;
use crate::secret::SecretKey;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Issues signed policy URLs for a single resource.
///
/// The output for a given policy is fully deterministic. There is no nonce,
/// so an issued URL can be replayed until it expires.
#[derive(Debug, Clone)]
pub struct PolicyIssuer {
    base_url: String,
    secret_key: SecretKey,
    policy_query_key: String,
    signature_query_key: String,
}

fn has_query_key(url: &str, key: &str) -> bool {
    let Some((_, query)) = url.split_once('?') else {
        return false;
    };
    query
        .split('&')
        .any(|pair| pair.split('=').next() == Some(key))
}

impl PolicyIssuer {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<SecretKey>) -> Result<Self, IssueError> {
        let issuer = Self {
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            policy_query_key: DEFAULT_POLICY_QUERY_KEY.to_string(),
            signature_query_key: DEFAULT_SIGNATURE_QUERY_KEY.to_string(),
        };
        issuer.validate()?;
        Ok(issuer)
    }

    pub fn from_config(config: &IssuerConfig) -> Result<Self, IssueError> {
        Self::new(config.base_url.clone(), config.secret()?)?
            .with_query_keys(&config.policy_query_key, &config.signature_query_key)
    }

    /// Use query parameter names other than `policy` and `signature`. They must
    /// match the names configured on the edge.
    pub fn with_query_keys(mut self, policy: &str, signature: &str) -> Result<Self, IssueError> {
        self.policy_query_key = policy.to_string();
        self.signature_query_key = signature.to_string();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), IssueError> {
        if self.base_url.is_empty() {
            return Err(IssueError::Configuration("base URL is empty".to_string()));
        }
        if self.secret_key.is_empty() {
            return Err(IssueError::Configuration("secret key is empty".to_string()));
        }
        for key in [&self.policy_query_key, &self.signature_query_key] {
            if key.is_empty() || key.contains(['?', '&', '=', '#']) {
                return Err(IssueError::Configuration(format!(
                    "invalid query key name {:?}",
                    key
                )));
            }
        }
        if self.policy_query_key == self.signature_query_key {
            return Err(IssueError::Configuration(format!(
                "policy and signature query keys are both {:?}",
                self.policy_query_key
            )));
        }
        for key in [&self.policy_query_key, &self.signature_query_key] {
            if has_query_key(&self.base_url, key) {
                return Err(IssueError::Configuration(format!(
                    "base URL {} already carries a {} query parameter",
                    self.base_url, key
                )));
            }
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL the signature is computed over: `{base_url}?policy={encoded_policy}`.
    /// A base URL that already has a query string gets the policy appended with `&`.
    fn candidate_url(&self, encoded_policy: &str) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            self.base_url, separator, self.policy_query_key, encoded_policy
        )
    }

    /// Issue a signed URL carrying `policy`.
    pub fn issue(&self, policy: &Policy) -> Result<String, IssueError> {
        let encoded_policy = policy.encode()?;
        let candidate = self.candidate_url(&encoded_policy);
        let signature = sign_url(&self.secret_key, &candidate);
        debug!(
            base_url = %self.base_url,
            url_expire = %policy.url_expire.to_rfc3339(),
            url_activate = policy.url_activate.is_some(),
            stream_expire = policy.stream_expire.is_some(),
            allow_ip = policy.allow_ip.is_some(),
            real_ip = policy.real_ip.is_some(),
            "issued signed policy"
        );
        Ok(format!(
            "{}&{}={}",
            candidate, self.signature_query_key, signature
        ))
    }

    /// Four-constraint form of [`PolicyIssuer::issue`].
    pub fn issue_with(
        &self,
        url_expire: DateTime<Utc>,
        url_activate: Option<DateTime<Utc>>,
        stream_expire: Option<DateTime<Utc>>,
        allow_ip: Option<&str>,
    ) -> Result<String, IssueError> {
        let policy = Policy {
            url_expire,
            url_activate,
            stream_expire,
            allow_ip: allow_ip.map(str::to_string),
            real_ip: None,
        };
        self.issue(&policy)
    }
}
