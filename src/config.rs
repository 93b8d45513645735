use std::env;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// The default lifetime of a session cookie, in days.
pub const DEFAULT_SESSION_DURATION_DAYS: i64 = 30;
/// Accepted values for `SESSION_DURATION_DAYS`.
pub const SESSION_DURATION_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    /// The secret the session key is derived from.
    pub session_secret: Zeroizing<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates a new `Config` from any variable source.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value of a variable, if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_secret = lookup("SESSION_SECRET")
            .context("SESSION_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if session_secret.trim().is_empty() {
            anyhow::bail!("SESSION_SECRET must not be empty");
        }

        if session_secret.len() < 32 {
            tracing::warn!("⚠️  SESSION_SECRET is shorter than 32 characters");
        }

        let session_duration_days: i64 = lookup("SESSION_DURATION_DAYS")
            .unwrap_or_else(|| DEFAULT_SESSION_DURATION_DAYS.to_string())
            .parse()
            .context("Invalid SESSION_DURATION_DAYS")?;

        if !SESSION_DURATION_DAYS_RANGE.contains(&session_duration_days) {
            anyhow::bail!(
                "SESSION_DURATION_DAYS must be between {} and {}",
                SESSION_DURATION_DAYS_RANGE.start(),
                SESSION_DURATION_DAYS_RANGE.end()
            );
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            bind_addr: lookup("BIND_ADDR")
                .unwrap_or_else(|| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            session_duration_days,
            secure_cookies: lookup("APP_ENV")
                .unwrap_or_else(|| "development".to_string()) == "production",
            session_secret: Zeroizing::new(session_secret),
        })
    }
}
