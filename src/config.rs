use crate::utils::AppError;
use std::env;

/// Fixed origin of the local development frontend, always allowed next to `CLIENT_URL`.
pub const DEV_ORIGIN: &str = "http://localhost:3000";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DATABASE_URL: &str = "mongodb://localhost:27017/expense_tracker";
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const MAX_SESSION_TTL_SECS: u64 = 31_536_000;

/// Process configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub client_url: String,
    pub database_url: String,
    pub bcrypt_cost: u32,
    pub session_ttl_secs: u64,
    pub session_cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Required keys are checked in the order `PORT`, `SESSION_SECRET`,
    /// `CLIENT_URL`; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required =
            |key: &str| optional(key).ok_or_else(|| AppError::ConfigMissing(key.to_string()));

        let port_raw = required("PORT")?;
        let session_secret = required("SESSION_SECRET")?;
        let client_url = required("CLIENT_URL")?;

        let port = port_raw
            .parse::<u16>()
            .map_err(|e| invalid("PORT", e.to_string()))?;

        let bcrypt_cost = match optional("BCRYPT_COST") {
            Some(raw) => {
                let cost = raw
                    .parse::<u32>()
                    .map_err(|e| invalid("BCRYPT_COST", e.to_string()))?;
                if !(4..=31).contains(&cost) {
                    return Err(invalid("BCRYPT_COST", "must be between 4 and 31".to_string()));
                }
                cost
            }
            None => bcrypt::DEFAULT_COST,
        };

        let session_ttl_secs = match optional("SESSION_TTL_SECS") {
            Some(raw) => {
                let ttl = raw
                    .parse::<u64>()
                    .map_err(|e| invalid("SESSION_TTL_SECS", e.to_string()))?;
                if ttl == 0 || ttl > MAX_SESSION_TTL_SECS {
                    return Err(invalid(
                        "SESSION_TTL_SECS",
                        format!("must be between 1 and {}", MAX_SESSION_TTL_SECS),
                    ));
                }
                ttl
            }
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let session_cookie_secure = match optional("SESSION_COOKIE_SECURE") {
            Some(raw) => raw
                .parse::<bool>()
                .map_err(|_| invalid("SESSION_COOKIE_SECURE", "expected true or false".to_string()))?,
            None => false,
        };

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            session_secret,
            client_url,
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bcrypt_cost,
            session_ttl_secs,
            session_cookie_secure,
        })
    }
}

fn invalid(var: &str, reason: String) -> AppError {
    AppError::ConfigInvalid {
        var: var.to_string(),
        reason,
    }
}
