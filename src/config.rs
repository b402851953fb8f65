use serde::Deserialize;

use crate::auth::password::PasswordScheme;
use crate::i18n::Locale;

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Process-wide settings. Re-read on every invocation; nothing here is cached.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub password_scheme: PasswordScheme,
    pub locale: Locale,
    pub http: HttpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let password_scheme = match std::env::var("PASSWORD_SCHEME") {
            Ok(v) => v.parse()?,
            Err(_) => PasswordScheme::default(),
        };
        let locale = match std::env::var("APP_LOCALE") {
            Ok(v) => v.parse()?,
            Err(_) => Locale::default(),
        };
        let http = HttpConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        };
        Ok(Self {
            database_url,
            password_scheme,
            locale,
            http,
        })
    }

    /// Connection string for the relational store; required only once a handler
    /// actually needs the store.
    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            password_scheme: PasswordScheme::default(),
            locale: Locale::default(),
            http: HttpConfig {
                host: "0.0.0.0".into(),
                port: 8080,
            },
        }
    }
}
