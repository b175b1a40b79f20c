use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 8080)
    pub port: u16,
    /// GitHub OAuth app client id (QUILL_GITHUB_CLIENT_ID or GITHUB_CLIENT_ID)
    pub github_client_id: String,
    /// GitHub OAuth app client secret (QUILL_GITHUB_CLIENT_SECRET or GITHUB_CLIENT_SECRET)
    pub github_client_secret: String,
    /// Secret used to sign identity tokens
    pub jwt_secret: String,
    /// SQLite database URL
    pub database_url: String,
    /// Log level (default: info)
    pub log_level: String,
    /// CORS allowed origins (comma-separated, default: *)
    pub cors_origins: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// The GitHub credentials accept either the QUILL_-prefixed variable or
    /// the plain one, with the prefixed name taking precedence.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            github_client_id: env::var("QUILL_GITHUB_CLIENT_ID")
                .or_else(|_| env::var("GITHUB_CLIENT_ID"))
                .map_err(|_| ConfigError::MissingEnvVar("QUILL_GITHUB_CLIENT_ID"))?,
            github_client_secret: env::var("QUILL_GITHUB_CLIENT_SECRET")
                .or_else(|_| env::var("GITHUB_CLIENT_SECRET"))
                .map_err(|_| ConfigError::MissingEnvVar("QUILL_GITHUB_CLIENT_SECRET"))?,
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingEnvVar("JWT_SECRET"))?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/quill.db".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cors_origins: env::var("FRONTEND_URL").unwrap_or_else(|_| "*".to_string()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid port number")]
    InvalidPort,
}
