use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub federation: FederationConfig,
    pub polls: PollsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Upper bound on requests handled at once.
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            max_concurrent_requests: 512,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/murmur.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    pub enabled: bool,
    /// Public host name of this instance, used as the signing origin.
    pub local_domain: String,
    pub signing_key_hex: Option<String>,
    pub signing_key_path: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            local_domain: "localhost".into(),
            signing_key_hex: None,
            signing_key_path: None,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollsConfig {
    /// Remote polls fetched more recently than this are served from storage.
    pub stale_after_seconds: i64,
}

impl Default for PollsConfig {
    fn default() -> Self {
        Self {
            stale_after_seconds: murmur_core::DEFAULT_POLL_STALE_AFTER_SECONDS,
        }
    }
}

impl PollsConfig {
    /// `stale_after_seconds` as a duration. Negative or unrepresentable values are rejected.
    pub fn stale_after(&self) -> Result<Duration> {
        if self.stale_after_seconds < 0 {
            bail!(
                "polls.stale_after_seconds must not be negative (got {})",
                self.stale_after_seconds
            );
        }
        Duration::try_seconds(self.stale_after_seconds).with_context(|| {
            format!(
                "polls.stale_after_seconds is out of range (got {})",
                self.stale_after_seconds
            )
        })
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply `MURMUR_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::parse(&raw).with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::warn!("Config file {:?} not found, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.polls.stale_after()?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = lookup("MURMUR_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = lookup("MURMUR_DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = lookup("MURMUR_LOCAL_DOMAIN") {
            self.federation.local_domain = v;
        }
        if let Some(v) = lookup("MURMUR_FEDERATION_SIGNING_KEY_HEX") {
            self.federation.signing_key_hex = Some(v);
        }
        if let Some(v) = lookup("MURMUR_FEDERATION_ENABLED") {
            self.federation.enabled = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Signing key hex from the inline setting or, failing that, the key file.
    pub fn signing_key_hex(&self) -> Result<Option<String>> {
        if let Some(hex) = &self.federation.signing_key_hex {
            return Ok(Some(hex.trim().to_string()));
        }
        match &self.federation.signing_key_path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("reading signing key {path}"))?;
                Ok(Some(contents.trim().to_string()))
            }
            None => Ok(None),
        }
    }
}
