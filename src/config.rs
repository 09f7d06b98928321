use axum::http::HeaderValue;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "samarthan-dev-secret";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Who we accept identity tokens from at login.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub client_id: Option<String>,
    pub issuer: String,
    /// HS256 key for identity tokens; RS256 provider verification is not wired.
    pub secret: Option<String>,
    pub demo_login: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub frontend_origin: Option<HeaderValue>,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} is required in production")]
    Missing(&'static str),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = get("APP_ENV").unwrap_or_else(|| "development".into());
        let production = environment == "production";

        let port = parse_or("APP_PORT", get("APP_PORT"), 3000u16)?;

        let frontend_origin = match get("FRONTEND_URL") {
            Some(url) => Some(
                HeaderValue::from_str(&url)
                    .map_err(|_| ConfigError::Invalid { key: "FRONTEND_URL", value: url })?,
            ),
            None => None,
        };

        let secret = match get("JWT_SECRET") {
            Some(s) => s,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => {
                tracing::warn!("JWT_SECRET not set; using development secret");
                DEV_JWT_SECRET.into()
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "samarthan".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "samarthan-app".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", get("JWT_TTL_MINUTES"), 60 * 24 * 7)?,
        };

        let identity = IdentityConfig {
            client_id: get("IDP_CLIENT_ID"),
            issuer: get("IDP_ISSUER").unwrap_or_else(|| "https://accounts.google.com".into()),
            secret: get("IDP_SECRET"),
            demo_login: parse_or("DEMO_LOGIN", get("DEMO_LOGIN"), !production)?,
        };

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            environment,
            frontend_origin,
            database_url: get("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            jwt,
            identity,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
