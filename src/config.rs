use dotenv::dotenv;
use crate::errors::{ErrorKind, Result, ResultExt};
use std::env;
use tracing::warn;

const DEFAULT_DATABASE_URL: &str = "conduit.db";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;
const DEFAULT_POOL_SIZE: u32 = 8;
const DEVELOPMENT_SECRET: &str = "conduit-development-secret";

/// Settings read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub pool_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if cfg!(debug_assertions) => {
                warn!("JWT_SECRET is not set, signing tokens with the development secret");
                DEVELOPMENT_SECRET.to_owned()
            }
            Err(_) => bail!(ErrorKind::MissingSecret),
        };

        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .chain_err(|| format!("TOKEN_TTL_HOURS is not a number: {}", raw))?,
            Err(_) => DEFAULT_TOKEN_TTL_HOURS,
        };

        let pool_size = match env::var("DATABASE_POOL_SIZE") {
            Ok(raw) => raw
                .parse::<u32>()
                .chain_err(|| format!("DATABASE_POOL_SIZE is not a number: {}", raw))?,
            Err(_) => DEFAULT_POOL_SIZE,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            token_ttl_hours,
            pool_size,
        })
    }

    /// Configuration pointing at the given database file, used by tests and tooling.
    pub fn with_database(database_url: &str) -> Config {
        Config {
            database_url: database_url.to_owned(),
            jwt_secret: DEVELOPMENT_SECRET.to_owned(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}
