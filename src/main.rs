//! signed_policy: issue a signed policy URL for a streaming edge.

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use signed_policy::{IssueError, IssuerConfig, Policy, PolicyIssuer};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: signed_policy <SECRET_KEY> <BASE_URL> <EXPIRE_HOURS>\n\
Example: signed_policy mysecret wss://edge01.example.com/app/stream 1";

#[derive(Parser)]
#[command(name = "signed_policy")]
#[command(about = "Issue HMAC-SHA1 signed policy URLs for streaming edge servers")]
struct Cli {
    /// Shared secret configured on the edge.
    #[arg(value_name = "SECRET_KEY")]
    secret_key: Option<String>,

    /// Unsigned resource URL, e.g. wss://edge01.example.com/app/stream.
    #[arg(value_name = "BASE_URL")]
    base_url: Option<String>,

    /// Hours from now until the URL expires.
    #[arg(value_name = "EXPIRE_HOURS", allow_negative_numbers = true)]
    expire_hours: Option<i64>,

    /// Hours from now until the URL expires (use with --config instead of the positionals).
    #[arg(long, conflicts_with = "expire_hours")]
    hours: Option<i64>,

    /// Hours from now before the URL becomes valid.
    #[arg(long)]
    activate_after_hours: Option<i64>,

    /// Hours from now until an established stream is cut off.
    #[arg(long)]
    stream_expire_hours: Option<i64>,

    /// Restrict the client address to this IP or CIDR block.
    #[arg(long)]
    allow_ip: Option<String>,

    /// Restrict the real client address behind a proxy to this IP or CIDR block.
    #[arg(long)]
    real_ip: Option<String>,

    /// Issuer configuration JSON (base URL, secret, query key names).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the JSON carried in an encoded policy value and exit.
    #[arg(long, value_name = "POLICY")]
    decode: Option<String>,

    /// Log filter directive (logs go to stderr).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn hours_from(now: DateTime<Utc>, hours: i64, what: &str) -> anyhow::Result<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| {
            IssueError::Input(format!("{} of {} hours is out of range", what, hours)).into()
        })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    if let Some(encoded) = cli.decode.as_deref() {
        let policy = Policy::decode(encoded).context("Failed to decode policy")?;
        println!("{}", policy.to_json()?);
        return Ok(());
    }

    let expire_hours = cli.expire_hours.or(cli.hours);
    let have_issuer_inputs =
        cli.config.is_some() || (cli.secret_key.is_some() && cli.base_url.is_some());
    let Some(expire_hours) = expire_hours.filter(|_| have_issuer_inputs) else {
        // No arguments is a request for help, not an error.
        println!("{}", USAGE);
        return Ok(());
    };

    let mut config = match cli.config.as_deref() {
        Some(path) => IssuerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => IssuerConfig::default(),
    };
    if let Some(secret_key) = cli.secret_key {
        config.secret_key = Some(secret_key);
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    tracing::debug!(?config, "resolved issuer configuration");

    let issuer = PolicyIssuer::from_config(&config).context("Invalid issuer configuration")?;

    let now = Utc::now();
    let mut policy = Policy::new(hours_from(now, expire_hours, "url_expire")?);
    if let Some(hours) = cli.activate_after_hours {
        policy = policy.activate_at(hours_from(now, hours, "url_activate")?);
    }
    if let Some(hours) = cli.stream_expire_hours {
        policy = policy.stream_expire_at(hours_from(now, hours, "stream_expire")?);
    }
    if let Some(cidr) = cli.allow_ip {
        policy = policy.allow_ip(cidr);
    }
    if let Some(cidr) = cli.real_ip {
        policy = policy.real_ip(cidr);
    }

    let url = issuer.issue(&policy).context("Failed to issue policy")?;
    println!("{}", url);
    Ok(())
}
