use crate::application_impl::{HashConfig, JwtConfig};
use anyhow::{Result, anyhow};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub storage: Storage,
}

#[derive(Deserialize)]
pub struct Auth {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub issuer: String,
    pub audience: String,
    #[serde(default)]
    pub leeway_secs: u64,
    pub hash: Hash,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("access_token_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .field("hash", &self.hash)
            .finish()
    }
}

impl Auth {
    pub fn jwt_config(&self) -> Result<JwtConfig> {
        Ok(JwtConfig {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            access_ttl: ttl("access_token_ttl_secs", self.access_token_ttl_secs)?,
            refresh_ttl: ttl("refresh_token_ttl_secs", self.refresh_token_ttl_secs)?,
            access_secret: self.access_token_secret.clone().into_bytes(),
            refresh_secret: self.refresh_token_secret.clone().into_bytes(),
            leeway_secs: self.leeway_secs,
        })
    }

    pub fn hash_config(&self) -> HashConfig {
        HashConfig {
            memory_cost_kib: self.hash.memory_cost_kib,
            time_cost: self.hash.time_cost,
            parallelism: self.hash.parallelism,
        }
    }
}

fn ttl(name: &str, secs: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_seconds(secs)
        .ok_or_else(|| anyhow!("auth.{name} is out of range: {secs}"))
}

/// Argon2id work factor.
#[derive(Debug, Deserialize)]
pub struct Hash {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub backend: String, // "memory" or "mysql"
    pub mysql_dsn: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides look like `TESSERA__AUTH__REFRESH_TOKEN_SECRET`.
const ENV_PREFIX: &str = "TESSERA";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    build(Config::builder().add_source(File::with_name(path)))
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
