use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetConfig {
    pub token_ttl_seconds: i64,
    /// Return the raw token from forgot-password. Only meant for local setups without mail.
    pub expose_token: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub password_reset: PasswordResetConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "equipres".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "equipres-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let password_reset = PasswordResetConfig {
            token_ttl_seconds: env_parse("PASSWORD_RESET_TTL_SECONDS").unwrap_or(3600),
            expose_token: std::env::var("PASSWORD_RESET_EXPOSE_TOKEN")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        };
        Ok(Self {
            database_url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8080),
            jwt,
            password_reset,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
