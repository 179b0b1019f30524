//! Runtime settings read from the environment (and `.env` via `dotenv`).

use chrono::FixedOffset;
use log::warn;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::WritePolicy;
use crate::schedule::offset_from_hours;

/// Longest accepted token lifetime, one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Superuser created at startup when `ADMIN_*` variables are present.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Offset of the stations' local time from UTC.
    pub utc_offset: FixedOffset,
    pub write_policy: WritePolicy,
    pub seed_data: bool,
    pub force_seed: bool,
    pub admin: Option<AdminAccount>,
}

fn parse<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match raw {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError {
                key,
                value,
                reason: e.to_string(),
            })
        }
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET is not set, falling back to an insecure default");
            "secret".to_string()
        });

        let offset_hours: i32 = parse("UTC_OFFSET_HOURS", lookup("UTC_OFFSET_HOURS"), 3)?;
        let utc_offset = offset_from_hours(offset_hours).ok_or_else(|| ConfigError {
            key: "UTC_OFFSET_HOURS",
            value: offset_hours.to_string(),
            reason: "offset must be between -23 and 23 hours".to_string(),
        })?;

        let token_ttl_hours: i64 = parse("TOKEN_TTL_HOURS", lookup("TOKEN_TTL_HOURS"), 24)?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&token_ttl_hours) {
            return Err(ConfigError {
                key: "TOKEN_TTL_HOURS",
                value: token_ttl_hours.to_string(),
                reason: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS} hours"),
            });
        }

        let admin = match (
            lookup("ADMIN_USERNAME"),
            lookup("ADMIN_EMAIL"),
            lookup("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminAccount {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Ok(Config {
            mongodb_uri: lookup("MONGODB_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "bus_stations".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse("PORT", lookup("PORT"), 8080)?,
            jwt_secret,
            token_ttl_hours,
            utc_offset,
            write_policy: parse(
                "API_WRITE_POLICY",
                lookup("API_WRITE_POLICY"),
                WritePolicy::Superuser,
            )?,
            seed_data: parse("SEED_DATA", lookup("SEED_DATA"), true)?,
            force_seed: parse("FORCE_SEED", lookup("FORCE_SEED"), false)?,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.database_name, "bus_stations");
        assert_eq!(cfg.utc_offset.local_minus_utc(), 3 * 3600);
        assert_eq!(cfg.write_policy, WritePolicy::Superuser);
        assert!(cfg.seed_data);
        assert!(!cfg.force_seed);
        assert!(cfg.admin.is_none());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("PORT", "9000"),
            ("UTC_OFFSET_HOURS", "-5"),
            ("API_WRITE_POLICY", "staff"),
            ("FORCE_SEED", "true"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "change-me-please"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.utc_offset.local_minus_utc(), -5 * 3600);
        assert_eq!(cfg.write_policy, WritePolicy::Staff);
        assert!(cfg.force_seed);
        assert_eq!(cfg.admin.unwrap().username, "root");
    }

    #[test]
    fn rejects_malformed_values() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.key, "PORT");
        assert!(config(&[("UTC_OFFSET_HOURS", "24")]).is_err());
        assert!(config(&[("API_WRITE_POLICY", "everyone")]).is_err());
        assert!(config(&[("TOKEN_TTL_HOURS", "0")]).is_err());
    }

    #[test]
    fn token_lifetime_is_capped() {
        let cfg = config(&[("TOKEN_TTL_HOURS", "8760")]).unwrap();
        assert_eq!(cfg.token_ttl_hours, MAX_TOKEN_TTL_HOURS);
        for value in ["8761", "9223372036854775807"] {
            let err = config(&[("TOKEN_TTL_HOURS", value)]).unwrap_err();
            assert_eq!(err.key, "TOKEN_TTL_HOURS");
        }
    }
}
