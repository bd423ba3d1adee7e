use chrono::{Duration, Utc};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::services::password_service::HashCost;

const DEV_JWT_SECRET: &str = "development-secret-key-change-in-production";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub hash_cost: HashCost,
    pub addr: SocketAddr,
}

impl Config {
    /// Read configuration from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let defaults = HashCost::default();

        let database = DatabaseConfig {
            user: vars.required("DB_USER")?,
            password: vars.required("DB_PASSWORD")?,
            host: vars.required("DB_HOST")?,
            port: vars.required_parsed("DB_PORT")?,
            name: vars.required("DB_NAME")?,
            max_connections: vars.parsed_or("DB_MAX_CONNECTIONS", 10)?,
        };

        let jwt_secret = match vars.get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set, falling back to the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let ttl_hours: i64 = vars.parsed_or("JWT_TTL_HOURS", 72)?;
        // Every issued `exp` must stay representable as a timestamp.
        let token_ttl = Duration::try_hours(ttl_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or(ConfigError::Invalid {
                name: "JWT_TTL_HOURS",
                value: ttl_hours.to_string(),
            })?;

        Ok(Self {
            database,
            jwt_secret,
            token_ttl,
            hash_cost: HashCost {
                memory_kib: vars.parsed_or("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
                iterations: vars.parsed_or("PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
                parallelism: vars.parsed_or("PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
            },
            addr: vars.parsed_or("APP_ADDR", SocketAddr::from(([0, 0, 0, 0], 1323)))?,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn required_parsed<T: FromStr>(&self, name: &'static str) -> Result<T, ConfigError> {
        let value = self.required(name)?;
        parse(name, value)
    }

    fn parsed_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(value) => parse(name, value),
            None => Ok(default),
        }
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
