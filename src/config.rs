use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL missing")]
    MissingDatabaseUrl,
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Allowed cross-origin callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    Disabled,
    AnyOrigin,
    Origins(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub cors: CorsPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "DB_MAX_CONNECTIONS",
                        value: raw,
                    })
                }
            },
            None => 10,
        };

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| {
            let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let cors = parse_cors(lookup("CORS_ORIGINS").as_deref());

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
            cors,
        })
    }
}

fn parse_cors(raw: Option<&str>) -> CorsPolicy {
    let Some(raw) = raw else {
        return CorsPolicy::Disabled;
    };
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.iter().any(|o| o == "*") {
        CorsPolicy::AnyOrigin
    } else if origins.is_empty() {
        CorsPolicy::Disabled
    } else {
        CorsPolicy::Origins(origins)
    }
}
