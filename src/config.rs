use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Connection bootstrap knobs for the Postgres store.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    /// Upper bound on a single connection attempt.
    pub connect_timeout_ms: u64,
    /// `None` retries forever.
    pub retry_max_attempts: Option<u32>,
}

impl DbConfig {
    /// Delay before retry number `attempt` (1-based): `base * attempt`, capped at `max`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let step = self.retry_base_ms.saturating_mul(u64::from(attempt.max(1)));
        Duration::from_millis(step.min(self.retry_max_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdminConfig {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub member_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Absent means the in-memory store is used.
    pub db: Option<DbConfig>,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
    pub seed_admin: Option<SeedAdminConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(DbConfig {
                url,
                max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
                retry_base_ms: env_parse("DB_RETRY_BASE_MS").unwrap_or(5_000),
                retry_max_ms: env_parse("DB_RETRY_MAX_MS").unwrap_or(60_000),
                connect_timeout_ms: env_parse("DB_CONNECT_TIMEOUT_MS").unwrap_or(10_000),
                retry_max_attempts: env_parse("DB_RETRY_MAX_ATTEMPTS"),
            }),
            _ => None,
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "messmate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "messmate-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 30),
        };

        let seed_admin = match (
            std::env::var("SEED_ADMIN_EMAIL"),
            std::env::var("SEED_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(SeedAdminConfig {
                email,
                password,
                name: std::env::var("SEED_ADMIN_NAME").unwrap_or_else(|_| "Mess Admin".into()),
                phone: std::env::var("SEED_ADMIN_PHONE").unwrap_or_else(|_| "9999999999".into()),
                member_number: std::env::var("SEED_ADMIN_MEMBER_NUMBER")
                    .unwrap_or_else(|_| "ADMIN001".into()),
            }),
            _ => None,
        };

        Ok(Self {
            db,
            jwt,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8080),
            seed_admin,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(base: u64, max: u64) -> DbConfig {
        DbConfig {
            url: "postgres://localhost/messmate".into(),
            max_connections: 1,
            retry_base_ms: base,
            retry_max_ms: max,
            connect_timeout_ms: 1_000,
            retry_max_attempts: None,
        }
    }

    #[test]
    fn retry_delay_grows_linearly() {
        let cfg = db(5_000, 60_000);
        assert_eq!(cfg.retry_delay(1), Duration::from_secs(5));
        assert_eq!(cfg.retry_delay(2), Duration::from_secs(10));
        assert_eq!(cfg.retry_delay(5), Duration::from_secs(25));
    }

    #[test]
    fn retry_delay_is_capped() {
        let cfg = db(5_000, 60_000);
        assert_eq!(cfg.retry_delay(12), Duration::from_secs(60));
        assert_eq!(cfg.retry_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn retry_delay_treats_zero_as_first_attempt() {
        let cfg = db(250, 1_000);
        assert_eq!(cfg.retry_delay(0), Duration::from_millis(250));
    }
}
