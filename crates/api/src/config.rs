use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret, which must always be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub realtime: RealtimeConfig,
    pub import: ImportConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs = env_u64("SHUTDOWN_TIMEOUT_SECS", 30);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            realtime: RealtimeConfig::from_env(),
            import: ImportConfig::from_env(),
        }
    }
}

/// Realtime delivery settings.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Events held per offline user before the oldest is dropped.
    pub offline_buffer_capacity: usize,
    /// Age after which a buffered event is discarded undelivered.
    pub offline_buffer_ttl_secs: u64,
    /// Lifetime of equipment id <-> device code cache entries.
    pub equipment_cache_ttl_secs: u64,
    pub heartbeat_interval_secs: u64,
}

impl RealtimeConfig {
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `WS_OFFLINE_BUFFER_CAPACITY`  | `100`   |
    /// | `WS_OFFLINE_BUFFER_TTL_SECS`  | `86400` |
    /// | `EQUIPMENT_CACHE_TTL_SECS`    | `3600`  |
    /// | `WS_HEARTBEAT_INTERVAL_SECS`  | `30`    |
    pub fn from_env() -> Self {
        Self {
            offline_buffer_capacity: env_u64("WS_OFFLINE_BUFFER_CAPACITY", 100) as usize,
            offline_buffer_ttl_secs: env_u64("WS_OFFLINE_BUFFER_TTL_SECS", 86_400),
            equipment_cache_ttl_secs: env_u64("EQUIPMENT_CACHE_TTL_SECS", 3600),
            heartbeat_interval_secs: env_u64("WS_HEARTBEAT_INTERVAL_SECS", 30),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            offline_buffer_capacity: 100,
            offline_buffer_ttl_secs: 86_400,
            equipment_cache_ttl_secs: 3600,
            heartbeat_interval_secs: 30,
        }
    }
}

/// Batch import settings.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Rows per chunk transaction (`IMPORT_CHUNK_SIZE`, default `1000`).
    pub chunk_size: usize,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        let chunk_size = env_u64(
            "IMPORT_CHUNK_SIZE",
            shipwatch_pipeline::DEFAULT_CHUNK_SIZE as u64,
        ) as usize;
        assert!(chunk_size > 0, "IMPORT_CHUNK_SIZE must be positive");
        Self { chunk_size }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: shipwatch_pipeline::DEFAULT_CHUNK_SIZE,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|e| panic!("{name} must be a valid u64: {e}"))
}
