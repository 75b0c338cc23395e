use std::{
    collections::HashSet, env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration,
};

use payloads::{BIO_IDS, parse_bio_ids};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreKind::Redis),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store '{other}', expected redis or memory")),
        }
    }
}

/// Credentials for the admin account created at startup.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub redis_url: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub hash_memory_kib: u32,
    pub admin: Option<AdminSeed>,
    pub bio_ids: HashSet<String>,
}

impl Config {
    /// Defaults for everything except the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            port: 5000,
            store: StoreKind::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::from_secs(60 * 60),
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            admin: None,
            bio_ids: BIO_IDS.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        let jwt_secret = read_secret("JWT_SECRET").ok_or(ConfigError::MissingSecret("JWT_SECRET"))?;

        let admin = match (read_secret("ADMIN_EMAIL"), read_secret("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => {
                warn!("Only one of ADMIN_EMAIL/ADMIN_PASSWORD is set, skipping admin seed");
                None
            }
        };

        let bio_ids = match env::var("BIO_ID_FILE") {
            Ok(path) => load_bio_ids(&path)?,
            Err(_) => {
                info!("BIO_ID_FILE not set, using the built-in BioID list");
                BIO_IDS.iter().map(|id| id.to_string()).collect()
            }
        };

        Ok(Self {
            port: try_load("RUST_PORT", "5000")?,
            store: try_load("STORE", "redis")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            jwt_secret,
            token_ttl: Duration::from_secs(try_load("TOKEN_TTL_SECS", "3600")?),
            hash_memory_kib: try_load("HASH_MEMORY_KIB", &DEFAULT_HASH_MEMORY_KIB.to_string())?,
            admin,
            bio_ids,
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            warn!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

/// Docker secret first, then the plain environment.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("Secret {secret_name} not mounted ({e}), checking environment");
        })
        .or_else(|_| env::var(secret_name).map(|s| s.trim().to_string()))
        .ok()
        .filter(|s| !s.is_empty())
}

fn load_bio_ids(path: &str) -> Result<HashSet<String>, ConfigError> {
    let contents = read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;

    let ids = parse_bio_ids(&contents);
    if ids.is_empty() {
        return Err(ConfigError::Invalid {
            key: "BIO_ID_FILE",
            reason: format!("{path} contains no BioIDs"),
        });
    }

    info!("Loaded {} BioIDs from {path}", ids.len());
    Ok(ids)
}
