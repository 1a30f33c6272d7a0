use anyhow::{Context, Result};

use crate::assessment::scoring::Aggregation;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cors_origin: String,
    pub score_aggregation: Aggregation,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            token_ttl_hours: optional_env("TOKEN_TTL_HOURS", "24")
                .parse::<i64>()
                .context("TOKEN_TTL_HOURS must be a whole number of hours")?,
            cors_origin: optional_env("CORS_ORIGIN", "http://localhost:5173"),
            score_aggregation: optional_env("SCORE_AGGREGATION", "sum")
                .parse::<Aggregation>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("SCORE_AGGREGATION must be 'sum' or 'average'")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
