//! signed_policy: issue HMAC-SHA1 signed access policy URLs for streaming edge servers.
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use signed_policy::{Policy, PolicyIssuer};
//!
//! let issuer = PolicyIssuer::new("wss://edge01.example.com/app/stream", "secret")?;
//! let policy = Policy::new(Utc::now() + Duration::hours(1)).allow_ip("192.168.0.0/24");
//! println!("{}", issuer.issue(&policy)?);
//! # Ok::<(), signed_policy::IssueError>(())
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod issuer;
pub mod policy;
pub mod secret;

pub use config::IssuerConfig;
pub use error::IssueError;
pub use issuer::PolicyIssuer;
pub use policy::Policy;
pub use secret::SecretKey;
