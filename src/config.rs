use secrecy::Secret;
use std::net::SocketAddr;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            _ => Environment::Production,
        }
    }
}

/// Runtime configuration read from the process environment (after `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub secret_token: Secret<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<Secret<String>>,
    pub environment: Environment,
    pub cookie_domain: Option<String>,
}

impl Config {
    #[tracing::instrument(name = "Load configuration")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_token = lookup("SECRET_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("SECRET_TOKEN"))?;

        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => 3001,
        };

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                value: raw,
            })?,
            None => 5,
        };

        let environment = Environment::parse(
            &lookup("ENVIRONMENT").unwrap_or_else(|| "production".to_string()),
        );

        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://mundo_musical.db?mode=rwc".to_string()),
            db_max_connections,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            secret_token: Secret::new(secret_token),
            admin_email: lookup("ADMIN_EMAIL").filter(|v| !v.is_empty()),
            admin_password: lookup("ADMIN_PASSWORD")
                .filter(|v| !v.is_empty())
                .map(Secret::new),
            environment,
            cookie_domain: lookup("COOKIE_DOMAIN").filter(|v| !v.is_empty()),
        })
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: raw,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
