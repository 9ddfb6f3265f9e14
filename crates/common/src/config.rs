//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Relationship graph policy.
    #[serde(default)]
    pub relationships: RelationshipConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Follow-request and visibility policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipConfig {
    /// When `true`, only a pending request blocks a new one between the same
    /// pair. When `false`, any request ever sent between the pair (accepted or
    /// rejected included) blocks new requests forever.
    #[serde(default = "default_true")]
    pub allow_request_after_resolution: bool,
    /// Upper bound for page sizes on relationship and discovery listings.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            allow_request_after_resolution: true,
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_max_page_size() -> u64 {
    100
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `SOCIALX_ENV`)
    /// 4. Environment variables with `SOCIALX_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("SOCIALX_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SOCIALX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = from_toml(
            r#"
            [server]
            [database]
            url = "postgres://localhost/socialx"
            "#,
        );

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.database.min_connections, 5);
        assert!(config.relationships.allow_request_after_resolution);
        assert_eq!(config.relationships.max_page_size, 100);
    }

    #[test]
    fn test_strict_request_policy() {
        let config = from_toml(
            r#"
            [server]
            port = 8080
            [database]
            url = "postgres://localhost/socialx"
            [relationships]
            allow_request_after_resolution = false
            "#,
        );

        assert_eq!(config.server.port, 8080);
        assert!(!config.relationships.allow_request_after_resolution);
    }
}
