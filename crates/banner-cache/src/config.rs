use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default channel carrying delete-by-feature-tag requests.
pub const DEFAULT_DELETE_CHANNEL: &str = "redis_deleter_job_delayer";

/// Upper bound for every duration setting, in seconds (one year).
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Banner lookup cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Delete propagation channel configuration
    #[serde(default)]
    pub delete_channel: DeleteChannelConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Redis validations
        if self.redis.enabled && self.redis.url.trim().is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        if self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        if self.redis.timeout_ms == 0 {
            return Err("redis.timeout_ms must be > 0".into());
        }
        // Cache validations
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.cache.write_timeout_secs == 0 {
            return Err("cache.write_timeout_secs must be > 0".into());
        }
        let durations = [
            ("cache.ttl_secs", Some(self.cache.ttl_secs)),
            ("cache.write_timeout_secs", Some(self.cache.write_timeout_secs)),
            ("delete_channel.delete_timeout_secs", self.delete_channel.delete_timeout_secs),
            ("delete_channel.max_backoff_secs", Some(self.delete_channel.max_backoff_secs)),
        ];
        for (name, secs) in durations {
            if secs.is_some_and(|s| s > MAX_DURATION_SECS) {
                return Err(format!("{name} must be <= {MAX_DURATION_SECS}"));
            }
        }
        // Delete channel validations
        if self.delete_channel.channel.trim().is_empty() {
            return Err("delete_channel.channel must not be empty".into());
        }
        if self.delete_channel.delete_timeout_secs == Some(0) {
            return Err("delete_channel.delete_timeout_secs must be > 0 when set".into());
        }
        if self.delete_channel.max_backoff_secs == 0 {
            return Err("delete_channel.max_backoff_secs must be > 0".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Redis configuration for multi-instance deployments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (local cache and local pub/sub only)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Banner lookup cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of cached lookups (positive and negative) in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound for a detached cache write in seconds
    #[serde(default = "default_cache_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_cache_write_timeout_secs() -> u64 {
    20
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            write_timeout_secs: default_cache_write_timeout_secs(),
        }
    }
}

/// Delete-by-feature-tag propagation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteChannelConfig {
    /// Pub/sub channel shared by all instances of a deployment
    #[serde(default = "default_delete_channel")]
    pub channel: String,

    /// Upper bound for one delete task in seconds. Unbounded when unset.
    #[serde(default)]
    pub delete_timeout_secs: Option<u64>,

    /// Re-subscribe after the subscription stream closes
    /// Default: false (stream closure stops propagation on this instance)
    #[serde(default)]
    pub reconnect: bool,

    /// Cap for the exponential reconnect backoff in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_delete_channel() -> String {
    DEFAULT_DELETE_CHANNEL.to_string()
}

fn default_max_backoff_secs() -> u64 {
    300 // 5 minutes max
}

impl Default for DeleteChannelConfig {
    fn default() -> Self {
        Self {
            channel: default_delete_channel(),
            delete_timeout_secs: None,
            reconnect: false,
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("banner-cache.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., BANNER__CACHE__TTL_SECS=60
        builder = builder.add_source(
            Environment::with_prefix("BANNER")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
