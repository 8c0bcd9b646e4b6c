//! API Configuration Module
//!
//! This module provides configuration for CORS, rate limiting, the bind
//! address, and the autosave debounce window. Configuration is loaded from
//! environment variables with sensible defaults for development.

use std::time::Duration;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS, rate limiting, and production hardening.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://counsel.example.edu,https://admin.counsel.example.edu"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    /// Whether rate limiting is enabled.
    pub rate_limit_enabled: bool,

    /// Rate limit for unauthenticated requests (per IP, per minute).
    pub rate_limit_unauthenticated: u32,

    /// Rate limit for authenticated requests (per account, per minute).
    pub rate_limit_authenticated: u32,

    /// Burst capacity (allow this many requests beyond the limit temporarily).
    pub rate_limit_burst: u32,

    // ========================================================================
    // Autosave Configuration
    // ========================================================================
    /// Debounce window for the session-notes autosave worker.
    pub autosave_debounce: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),

            // CORS defaults: permissive for development
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours

            // Rate limiting defaults: enabled with reasonable limits
            rate_limit_enabled: true,
            rate_limit_unauthenticated: 100, // 100 req/min per IP
            rate_limit_authenticated: 1000,  // 1000 req/min per account
            rate_limit_burst: 10,

            autosave_debounce: Duration::from_millis(1000),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `COUNSEL_BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
    /// - `COUNSEL_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `COUNSEL_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `COUNSEL_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `COUNSEL_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `COUNSEL_RATE_LIMIT_UNAUTHENTICATED`: Requests per minute per IP (default: 100)
    /// - `COUNSEL_RATE_LIMIT_AUTHENTICATED`: Requests per minute per account (default: 1000)
    /// - `COUNSEL_RATE_LIMIT_BURST`: Burst capacity (default: 10)
    /// - `COUNSEL_AUTOSAVE_DEBOUNCE_MS`: Autosave debounce window (default: 1000)
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("COUNSEL_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let cors_origins = std::env::var("COUNSEL_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("COUNSEL_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("COUNSEL_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let rate_limit_enabled = std::env::var("COUNSEL_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit_unauthenticated = std::env::var("COUNSEL_RATE_LIMIT_UNAUTHENTICATED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let rate_limit_authenticated = std::env::var("COUNSEL_RATE_LIMIT_AUTHENTICATED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let rate_limit_burst = std::env::var("COUNSEL_RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let autosave_debounce = std::env::var("COUNSEL_AUTOSAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(1000));

        Self {
            bind_addr,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            rate_limit_enabled,
            rate_limit_unauthenticated,
            rate_limit_authenticated,
            rate_limit_burst,
            autosave_debounce,
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Support wildcard subdomains: *.counsel.example.edu
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(pattern)
                        || origin_domain == pattern.strip_prefix('.').unwrap_or(pattern);
                }
            }
            false
        })
    }
}
