use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "config/local.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub env: Environment,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub redirect: RedirectConfig,
    pub cache: CacheConfig,
    pub geoip: GeoIpConfig,
}

/// Deployment environment, selects the log format and default level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Dev,
    Prod,
}

impl Environment {
    pub fn default_log_level(self) -> &'static str {
        match self {
            Environment::Local | Environment::Dev => "debug",
            Environment::Prod => "info",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Jwt,
    Basic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    #[serde(default)]
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Use 400/404/500 on redirect-path errors instead of 200 with an error body
    pub strict_status_codes: bool,
    pub alias_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoIpProvider {
    None,
    IpApi,
    Maxmind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    pub provider: GeoIpProvider,
    pub ip_api_url: String,
    pub timeout_ms: u64,
    /// Total time a visit listing may spend enriching
    pub enrich_budget_ms: u64,
    #[serde(default)]
    pub mmdb_path: Option<String>,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Precedence: `WAYPOINT__SECTION__KEY` environment variables, then the file
    /// named by `CONFIG_PATH` (default `config/local.toml`, may be absent), then
    /// built-in defaults. A `.env` file is read first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self::load()?;
        config.validate()?;

        Ok(config)
    }

    /// Same sources as [`Config::from_env`] without the server-level checks.
    /// Used by tooling that only touches the database.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::load_from(&path)
    }

    fn load_from(path: &str) -> anyhow::Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("WAYPOINT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to assemble configuration sources")?;

        settings
            .try_deserialize()
            .context("failed to deserialize configuration")
    }

    fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = config::Config::builder()
            .set_default("env", "local")?
            .set_default("database.url", "sqlite://./waypoint.db")?
            .set_default("database.max_connections", 5)?
            .set_default("server.address", "0.0.0.0:8080")?
            .set_default("server.timeout_secs", 5)?
            .set_default("server.shutdown_grace_secs", 10)?
            .set_default("auth.mode", "jwt")?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.token_ttl_hours", 72)?
            .set_default("redirect.strict_status_codes", false)?
            .set_default("redirect.alias_length", 6)?
            .set_default("cache.enabled", false)?
            .set_default("cache.max_entries", 10_000)?
            .set_default("cache.ttl_secs", 300)?
            .set_default("geoip.provider", "ip-api")?
            .set_default("geoip.ip_api_url", "http://ip-api.com")?
            .set_default("geoip.timeout_ms", 1500)?
            .set_default("geoip.enrich_budget_ms", 2000)?;

        Ok(builder)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.auth.mode == AuthMode::Jwt && self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must be set when auth.mode = jwt");
        }

        if self.auth.token_ttl_hours <= 0 {
            bail!("auth.token_ttl_hours must be positive");
        }

        if !(4..=32).contains(&self.redirect.alias_length) {
            bail!(
                "redirect.alias_length must be between 4 and 32, got {}",
                self.redirect.alias_length
            );
        }

        if self.geoip.provider == GeoIpProvider::Maxmind && self.geoip.mmdb_path.is_none() {
            bail!("geoip.mmdb_path must be set when geoip.provider = maxmind");
        }

        if self.geoip.enrich_budget_ms >= self.server.timeout_secs.saturating_mul(1000) {
            bail!(
                "geoip.enrich_budget_ms ({}) must be below server.timeout_secs ({}s)",
                self.geoip.enrich_budget_ms,
                self.server.timeout_secs
            );
        }

        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }

        Ok(())
    }
}
