//! Typed process configuration read from the environment.
//!
//! `Settings::from_env` loads a `.env` file first (if present) via `dotenvy`.
//! Parsing goes through `from_lookup` so it can be exercised without touching
//! the real environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use stockroom_observability::LogFormat;

/// HS256 secret used when neither RSA keys nor `JWT_SECRET` are configured.
pub const DEV_JWT_SECRET: &str = "stockroom-dev-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{key} requires {requires} to be set as well")]
    Incomplete {
        key: &'static str,
        requires: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtSigning {
    /// RS256 with PEM key files.
    Rsa {
        private_key_path: PathBuf,
        public_key_path: PathBuf,
    },
    /// HS256 shared secret.
    Hmac { secret: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtSettings {
    pub signing: JwtSigning,
    pub issuer: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl JwtSettings {
    /// True when tokens are signed with [`DEV_JWT_SECRET`].
    pub fn uses_dev_secret(&self) -> bool {
        matches!(&self.signing, JwtSigning::Hmac { secret } if secret == DEV_JWT_SECRET)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// `None` selects in-memory repositories.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt: JwtSettings,
    /// `None` selects the in-memory object store.
    pub upload_dir: Option<PathBuf>,
    pub public_base_url: String,
    pub mail_from: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            database_max_connections: 10,
            jwt: JwtSettings {
                signing: JwtSigning::Hmac {
                    secret: DEV_JWT_SECRET.to_string(),
                },
                issuer: "stockroom".to_string(),
                access_ttl_secs: 15 * 60,
                refresh_ttl_secs: 7 * 24 * 60 * 60,
            },
            upload_dir: None,
            public_base_url: "http://localhost:8080".to_string(),
            mail_from: "no-reply@stockroom.local".to_string(),
            bootstrap_admin: None,
            log_format: LogFormat::Json,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let bind_addr = match get("STOCKROOM_BIND_ADDR") {
            Some(v) => v
                .parse::<SocketAddr>()
                .map_err(|e| invalid("STOCKROOM_BIND_ADDR", e))?,
            None => defaults.bind_addr,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => parse_positive("DATABASE_MAX_CONNECTIONS", &v)? as u32,
            None => defaults.database_max_connections,
        };

        let signing = match (get("JWT_PRIVATE_KEY_PATH"), get("JWT_PUBLIC_KEY_PATH")) {
            (Some(private), Some(public)) => JwtSigning::Rsa {
                private_key_path: private.into(),
                public_key_path: public.into(),
            },
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    key: "JWT_PRIVATE_KEY_PATH",
                    requires: "JWT_PUBLIC_KEY_PATH",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    key: "JWT_PUBLIC_KEY_PATH",
                    requires: "JWT_PRIVATE_KEY_PATH",
                });
            }
            (None, None) => match get("JWT_SECRET") {
                Some(secret) => JwtSigning::Hmac { secret },
                None => defaults.jwt.signing,
            },
        };

        let access_ttl_secs = match get("JWT_ACCESS_TTL_SECS") {
            Some(v) => parse_positive("JWT_ACCESS_TTL_SECS", &v)?,
            None => defaults.jwt.access_ttl_secs,
        };
        let refresh_ttl_secs = match get("JWT_REFRESH_TTL_SECS") {
            Some(v) => parse_positive("JWT_REFRESH_TTL_SECS", &v)?,
            None => defaults.jwt.refresh_ttl_secs,
        };
        if refresh_ttl_secs <= access_ttl_secs {
            return Err(ConfigError::Invalid {
                key: "JWT_REFRESH_TTL_SECS",
                message: "must be longer than the access token lifetime".to_string(),
            });
        }

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_USERNAME"), lookup("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !password.is_empty() => {
                Some(BootstrapAdmin { username, password })
            }
            (Some(_), _) => {
                return Err(ConfigError::Incomplete {
                    key: "BOOTSTRAP_ADMIN_USERNAME",
                    requires: "BOOTSTRAP_ADMIN_PASSWORD",
                });
            }
            (None, _) => None,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v.parse::<LogFormat>().map_err(|e| invalid("LOG_FORMAT", e))?,
            None => defaults.log_format,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            jwt: JwtSettings {
                signing,
                issuer: get("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
                access_ttl_secs,
                refresh_ttl_secs,
            },
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from),
            public_base_url: get("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            mail_from: get("MAIL_FROM").unwrap_or(defaults.mail_from),
            bootstrap_admin,
            log_format,
        })
    }
}

fn invalid(key: &'static str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: err.to_string(),
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<i64, ConfigError> {
    let value: i64 = raw.parse().map_err(|e| invalid(key, e))?;
    if value <= 0 || value > u32::MAX as i64 {
        return Err(invalid(key, "must be a positive integer"));
    }
    Ok(value)
}
