use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub journal: JournalConfig,
    pub auth: AuthConfig,
    pub embeddings: EmbeddingsConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Named reference timezone for "today" (IANA id, e.g. `America/New_York`).
    pub timezone: Tz,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl JournalConfig {
    pub fn reference_timezone(&self) -> Tz {
        self.timezone
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Endpoint that (re)generates embeddings after a journal write. Unset disables the trigger.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Journal overrides
        if let Ok(v) = env::var("JOURNAL_TIMEZONE") {
            match v.trim().parse::<Tz>() {
                Ok(tz) => self.journal.timezone = tz,
                Err(e) => tracing::warn!("Ignoring invalid JOURNAL_TIMEZONE '{}': {}", v, e),
            }
        }
        if let Ok(v) = env::var("JOURNAL_DEFAULT_LIMIT") {
            self.journal.default_limit = v.parse().unwrap_or(self.journal.default_limit);
        }
        if let Ok(v) = env::var("JOURNAL_MAX_LIMIT") {
            self.journal.max_limit = v.parse().unwrap_or(self.journal.max_limit);
        }

        // Auth overrides
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("SUPABASE_JWT_AUDIENCE") {
            self.auth.jwt_audience = Some(v).filter(|s| !s.is_empty());
        }

        // Embeddings overrides
        if let Ok(v) = env::var("EMBEDDINGS_URL") {
            match url::Url::parse(&v) {
                Ok(_) => self.embeddings.url = Some(v),
                Err(e) => tracing::warn!("Ignoring invalid EMBEDDINGS_URL '{}': {}", v, e),
            }
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        self.journal.default_limit = self.journal.default_limit.clamp(1, self.journal.max_limit.max(1));
        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            journal: JournalConfig {
                timezone: Tz::America__New_York,
                default_limit: 10,
                max_limit: 1000,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
            },
            embeddings: EmbeddingsConfig { url: None },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string(), "http://localhost:3000".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            journal: JournalConfig {
                timezone: Tz::America__New_York,
                default_limit: 10,
                max_limit: 500,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
            },
            embeddings: EmbeddingsConfig { url: None },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            journal: JournalConfig {
                timezone: Tz::America__New_York,
                default_limit: 10,
                max_limit: 100,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
            },
            embeddings: EmbeddingsConfig { url: None },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}
