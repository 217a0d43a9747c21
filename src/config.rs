use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub links: LinksConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Base of the public short links, e.g. `https://pay.example.com`.
    pub public_base_url: String,
    /// Shared token internal callers must present; unset disables the check.
    pub internal_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// Default short-link TTL when the caller does not send one.
    pub default_ttl_minutes: i64,
    /// Lifetime of idempotency records.
    pub idempotency_ttl_secs: u64,
    /// Redis stream the normalized payment events are published to.
    pub event_stream: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL").context("PUBLIC_BASE_URL not set")?,
            internal_token: env::var("PAY_INTERNAL_TOKEN").ok().filter(|t| !t.is_empty()),
        };

        let redis = RedisConfig {
            url: env::var("REDIS_URL").context("REDIS_URL not set")?,
        };

        let links = LinksConfig {
            default_ttl_minutes: env::var("PAY_LINK_TTL_MINUTES")
                .unwrap_or_else(|_| "1440".to_string())
                .parse()
                .context("PAY_LINK_TTL_MINUTES must be a valid number")?,
            idempotency_ttl_secs: env::var("IDEMP_TTL_SEC")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .context("IDEMP_TTL_SEC must be a valid number")?,
            event_stream: env::var("EVENT_STREAM")
                .unwrap_or_else(|_| "payments.events".to_string()),
        };

        let config = Config {
            server,
            redis,
            links,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.redis.url.trim().is_empty() {
            return Err(anyhow!("REDIS_URL cannot be empty"));
        }

        if self.server.public_base_url.trim().is_empty() {
            return Err(anyhow!("PUBLIC_BASE_URL cannot be empty"));
        }
        if !self.server.public_base_url.starts_with("http") {
            return Err(anyhow!(
                "PUBLIC_BASE_URL must be an absolute URL, got {}",
                self.server.public_base_url
            ));
        }

        if self.links.default_ttl_minutes < 1 {
            return Err(anyhow!("PAY_LINK_TTL_MINUTES must be at least 1"));
        }
        if self.links.idempotency_ttl_secs == 0 {
            return Err(anyhow!("IDEMP_TTL_SEC must be greater than 0"));
        }
        if self.links.event_stream.trim().is_empty() {
            return Err(anyhow!("EVENT_STREAM cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                environment: "development".to_string(),
                public_base_url: "https://pay.example.com".to_string(),
                internal_token: Some("secret".to_string()),
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            links: LinksConfig {
                default_ttl_minutes: 1440,
                idempotency_ttl_secs: 86400,
                event_stream: "payments.events".to_string(),
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_environment() {
        let mut config = base_config();
        config.server.environment = "qa".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_relative_public_base_url() {
        let mut config = base_config();
        config.server.public_base_url = "pay.example.com".to_string();
        assert!(config.validate().is_err());
    }
}
