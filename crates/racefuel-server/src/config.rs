//! Configuration management

use racefuel_common::gpx::{GpxParser, GpxParserOptions, DEFAULT_ELEVATION_NOISE_THRESHOLD_M};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/racefuel";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// GPX Ingestion Constants
// ============================================================================

/// Bucket holding admin-curated catalog GPX files.
pub const DEFAULT_CATALOG_GPX_BUCKET: &str = "race-gpx";

/// Bucket holding per-user plan GPX copies.
pub const DEFAULT_PLAN_GPX_BUCKET: &str = "gpx-files";

/// Largest accepted GPX upload (10 MiB).
pub const DEFAULT_GPX_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub gpx: GpxConfig,
    pub plans: PlanConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// GPX ingestion settings shared by the catalog and plan flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpxConfig {
    pub catalog_bucket: String,
    pub plan_bucket: String,
    pub max_upload_bytes: usize,
    pub elevation_noise_threshold_m: f64,
    /// Delete the previous catalog blob once an update has been persisted
    pub prune_superseded: bool,
}

impl GpxConfig {
    /// Parser configured with this deployment's noise threshold
    pub fn parser(&self) -> GpxParser {
        GpxParser::new(GpxParserOptions {
            elevation_noise_threshold_m: self.elevation_noise_threshold_m,
        })
    }
}

impl Default for GpxConfig {
    fn default() -> Self {
        Self {
            catalog_bucket: DEFAULT_CATALOG_GPX_BUCKET.to_string(),
            plan_bucket: DEFAULT_PLAN_GPX_BUCKET.to_string(),
            max_upload_bytes: DEFAULT_GPX_MAX_UPLOAD_BYTES,
            elevation_noise_threshold_m: DEFAULT_ELEVATION_NOISE_THRESHOLD_M,
            prune_superseded: true,
        }
    }
}

/// Plan entitlement settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanConfig {
    /// `None` means unlimited
    pub max_per_user: Option<u32>,
}

/// Parsed value of `key`; unset or blank is `None`, anything unparseable is an error
fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e| anyhow::anyhow!("Invalid value {:?} for {}: {}", raw, key, e))
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_parse(key)?.unwrap_or(default))
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_string("RACEFUEL_HOST", DEFAULT_SERVER_HOST),
                port: env_or("RACEFUEL_PORT", DEFAULT_SERVER_PORT)?,
                shutdown_timeout_secs: env_or(
                    "RACEFUEL_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                )?,
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                )?,
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                )?,
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                )?,
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true)?,
            },
            gpx: GpxConfig {
                catalog_bucket: env_string("CATALOG_GPX_BUCKET", DEFAULT_CATALOG_GPX_BUCKET),
                plan_bucket: env_string("PLAN_GPX_BUCKET", DEFAULT_PLAN_GPX_BUCKET),
                max_upload_bytes: env_or("GPX_MAX_UPLOAD_BYTES", DEFAULT_GPX_MAX_UPLOAD_BYTES)?,
                elevation_noise_threshold_m: env_or(
                    "GPX_ELEVATION_NOISE_THRESHOLD_M",
                    DEFAULT_ELEVATION_NOISE_THRESHOLD_M,
                )?,
                prune_superseded: env_or("GPX_PRUNE_SUPERSEDED", true)?,
            },
            plans: PlanConfig {
                max_per_user: env_parse("PLAN_MAX_PER_USER")?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.gpx.catalog_bucket.is_empty() || self.gpx.plan_bucket.is_empty() {
            anyhow::bail!("GPX bucket names cannot be empty");
        }

        if self.gpx.max_upload_bytes == 0 {
            anyhow::bail!("GPX_MAX_UPLOAD_BYTES must be greater than 0");
        }

        if !self.gpx.elevation_noise_threshold_m.is_finite()
            || self.gpx.elevation_noise_threshold_m < 0.0
        {
            anyhow::bail!(
                "GPX elevation noise threshold must be a non-negative number, got {}",
                self.gpx.elevation_noise_threshold_m
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            gpx: GpxConfig::default(),
            plans: PlanConfig::default(),
        }
    }
}
