//! HTTP client settings.
//!
//! This module provides the timeout and connection pool configuration applied to
//! the HTTP client that talks to the Cloud Controller.

use std::time::Duration;

/// Default timeout for Cloud Controller requests (seconds)
pub const CLOUD_CONTROLLER_DEFAULT_TIMEOUT: u64 = 30;

/// Default connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// HTTP client configuration.
///
/// Requests are never retried; a failed call is reported to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Enable request logging
    pub enable_logging: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(CLOUD_CONTROLLER_DEFAULT_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_logging: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable logging.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
