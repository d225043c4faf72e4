//! API configuration.

use std::time::Duration;

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Socket address to bind
    pub bind_addr: String,
    /// Base path prepended to every object key (may be empty)
    pub key_base: String,
    /// Lifetime of presigned upload URLs
    pub presign_put_ttl: Duration,
    /// Lifetime of presigned download URLs
    pub presign_get_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            key_base: String::new(),
            presign_put_ttl: Duration::from_secs(15 * 60),
            presign_get_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("API_BIND_ADDR").unwrap_or(defaults.bind_addr),
            key_base: std::env::var("S3_KEY_BASE").unwrap_or_default(),
            presign_put_ttl: Duration::from_secs(
                std::env::var("S3_PRESIGN_PUT_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15 * 60),
            ),
            presign_get_ttl: Duration::from_secs(
                std::env::var("S3_PRESIGN_GET_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30 * 60),
            ),
        }
    }
}
