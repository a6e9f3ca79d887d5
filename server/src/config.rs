use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result, anyhow};
use optitalent_api::auth::AuthConfig;
use platform_db::DatabaseSettings;
use platform_genai::GenAiSettings;
use tracing::warn;

const DEV_JWT_SECRET: &str = "optitalent-dev-secret-change-me-0123456789";
const MIN_JWT_SECRET_LEN: usize = 32;

/// Fixed-window limits applied per client address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub dev_mode: bool,
    pub database: DatabaseSettings,
    pub auth: AuthConfig,
    pub genai: GenAiSettings,
    /// Hosts `<slug>.<base_domain>` name tenant `<slug>`.
    pub base_domain: String,
    pub default_tenant_name: String,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let dev_mode = env_string("APP_ENV", "dev").eq_ignore_ascii_case("dev");
        let bind = env_string("BIND", "127.0.0.1:8080")
            .parse()
            .context("BIND must be a socket address such as 0.0.0.0:8080")?;
        let database = DatabaseSettings::from_env()?;

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if dev_mode => {
                warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            Err(_) => return Err(anyhow!("JWT_SECRET is required outside APP_ENV=dev")),
        };
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow!(
                "JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes"
            ));
        }
        let session_ttl_minutes = env_parse("SESSION_TTL_MINUTES", 480i64)?;
        if session_ttl_minutes <= 0 {
            return Err(anyhow!("SESSION_TTL_MINUTES must be positive"));
        }
        let default_tenant_slug = env_string("DEFAULT_TENANT_SLUG", "default").to_lowercase();
        let auth = AuthConfig {
            jwt_secret,
            session_ttl_minutes,
            default_tenant_slug,
            secure_cookies: !dev_mode,
        };

        let rate_limit = RateLimitConfig {
            max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", 100u32)?,
            window: Duration::from_secs(env_parse("RATE_LIMIT_WINDOW_SECS", 60u64)?),
        };
        if rate_limit.max_requests == 0 || rate_limit.window.is_zero() {
            return Err(anyhow!("rate limit settings must be positive"));
        }

        Ok(Self {
            bind,
            dev_mode,
            database,
            auth,
            genai: GenAiSettings::from_env(),
            base_domain: env_string("BASE_DOMAIN", "localhost").to_lowercase(),
            default_tenant_name: env_string("DEFAULT_TENANT_NAME", "Default"),
            cors_allowed_origins: split_list(&env_string(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000",
            )),
            rate_limit,
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_lists_skip_blanks() {
        assert_eq!(
            split_list(" http://a.test, ,http://b.test ,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn default_rate_limit_is_a_hundred_per_minute() {
        let limits = RateLimitConfig::default();
        assert_eq!(limits.max_requests, 100);
        assert_eq!(limits.window, Duration::from_secs(60));
    }
}
