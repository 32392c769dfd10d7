use std::{env, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8081";
const DEFAULT_FRONTEND_ORIGIN: &str = "http://127.0.0.1:8080";
const DEFAULT_POLL_INTERVAL: u64 = 5; // s
const DEFAULT_REQUEST_TIMEOUT: u64 = 10; // s

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// JSON endpoint of the `sensor_readings` node. Without it the backend
    /// keeps the snapshot in memory and accepts pushes over HTTP.
    pub feed_url: Option<String>,
    pub poll_interval: Duration,
    /// Upper bound for one poll, connect included.
    pub request_timeout: Duration,
    pub http_bind: String,
    pub frontend_origin: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            feed_url: lookup("SENSOR_FEED_URL").filter(|url| !url.trim().is_empty()),
            poll_interval: seconds(&lookup, "FEED_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL)?,
            request_timeout: seconds(&lookup, "FEED_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT)?,
            http_bind: lookup("HTTP_BIND").unwrap_or_else(|| DEFAULT_HTTP_BIND.to_owned()),
            frontend_origin: lookup("FRONTEND_ORIGIN")
                .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGIN.to_owned()),
        })
    }
}

// whole seconds, at least 1
fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match lookup(key) {
        Some(secs) => secs
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} is not a number: {secs:?}"))?,
        None => default,
    };
    if secs == 0 {
        anyhow::bail!("{key} must be at least 1");
    }
    Ok(Duration::from_secs(secs))
}
