//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden by
//! `MAINBLOG_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration (SQLite)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database path or `sqlite:` URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/mainblog.db".to_string()
}

/// Outgoing mail configuration.
///
/// When `enabled` is false messages are only written to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Sender address used for every account notification
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// Implicit-TLS SMTP port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default, skip_serializing)]
    pub smtp_password: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from_address: default_from_address(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
        }
    }
}

fn default_from_address() -> String {
    "no-reply@mainblog.local".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_expiration_days")]
    pub session_expiration_days: i64,
    /// Superuser created at startup when it does not exist yet
    #[serde(default)]
    pub superuser: Option<SuperuserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_expiration_days: default_session_expiration_days(),
            superuser: None,
        }
    }
}

fn default_session_expiration_days() -> i64 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperuserConfig {
    pub username: String,
    pub nick: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

const ENV_VARS: &[&str] = &[
    "MAINBLOG_SERVER_HOST",
    "MAINBLOG_SERVER_PORT",
    "MAINBLOG_SERVER_CORS_ORIGIN",
    "MAINBLOG_DATABASE_URL",
    "MAINBLOG_EMAIL_ENABLED",
    "MAINBLOG_EMAIL_FROM",
    "MAINBLOG_SMTP_HOST",
    "MAINBLOG_SMTP_PORT",
    "MAINBLOG_SMTP_USERNAME",
    "MAINBLOG_SMTP_PASSWORD",
    "MAINBLOG_SESSION_EXPIRATION_DAYS",
];

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. Invalid
    /// YAML is reported with its line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, then apply `MAINBLOG_*` overrides
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Names of every environment variable consulted by [`Config::load_with_env`]
    pub fn env_var_names() -> &'static [&'static str] {
        ENV_VARS
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MAINBLOG_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed::<u16>("MAINBLOG_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("MAINBLOG_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("MAINBLOG_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(enabled) = std::env::var("MAINBLOG_EMAIL_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.email.enabled = true,
                "0" | "false" | "no" => self.email.enabled = false,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(from) = std::env::var("MAINBLOG_EMAIL_FROM") {
            self.email.from_address = from;
        }
        if let Ok(host) = std::env::var("MAINBLOG_SMTP_HOST") {
            self.email.smtp_host = host;
        }
        if let Some(port) = env_parsed::<u16>("MAINBLOG_SMTP_PORT") {
            self.email.smtp_port = port;
        }
        if let Ok(username) = std::env::var("MAINBLOG_SMTP_USERNAME") {
            self.email.smtp_username = username;
        }
        if let Ok(password) = std::env::var("MAINBLOG_SMTP_PASSWORD") {
            self.email.smtp_password = password;
        }

        if let Some(days) = env_parsed::<i64>("MAINBLOG_SESSION_EXPIRATION_DAYS") {
            if days > 0 {
                self.auth.session_expiration_days = days;
            }
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        for key in Config::env_var_names() {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_mainblog_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/mainblog.db");
        assert!(!config.email.enabled);
        assert_eq!(config.email.smtp_port, 465);
        assert_eq!(config.auth.session_expiration_days, 7);
        assert!(config.auth.superuser.is_none());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.email.from_address, "no-reply@mainblog.local");
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "email:\n  enabled: true\n  smtp_host: smtp.example.com\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert!(config.email.enabled);
        assert_eq!(config.email.smtp_host, "smtp.example.com");
        assert_eq!(config.email.smtp_port, 465);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
database:
  url: "blog.db"
email:
  enabled: true
  from_address: "blog@example.com"
  smtp_host: "smtp.example.com"
  smtp_port: 2465
  smtp_username: "mailer"
  smtp_password: "secret"
auth:
  session_expiration_days: 30
  superuser:
    username: "root"
    nick: "rootnick"
    email: "root@example.com"
    password: "changeme123"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "blog.db");
        assert_eq!(config.email.from_address, "blog@example.com");
        assert_eq!(config.email.smtp_port, 2465);
        assert_eq!(config.email.smtp_username, "mailer");
        assert_eq!(config.email.smtp_password, "secret");
        assert_eq!(config.auth.session_expiration_days, 30);
        let superuser = config.auth.superuser.unwrap();
        assert_eq!(superuser.username, "root");
        assert_eq!(superuser.password, "changeme123");
    }

    #[test]
    fn test_smtp_password_is_not_serialized() {
        let mut config = Config::default();
        config.email.smtp_password = "hunter22".to_string();

        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(!yaml.contains("hunter22"));
    }

    #[test]
    fn test_load_invalid_yaml_reports_location() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err().to_string();

        assert!(err.contains("Failed to parse config file"));
        assert!(err.contains("line"));
    }

    #[test]
    fn test_load_malformed_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: [invalid yaml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_env_override_server_and_database() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("MAINBLOG_SERVER_HOST", "192.168.1.1");
        std::env::set_var("MAINBLOG_SERVER_PORT", "4000");
        std::env::set_var("MAINBLOG_DATABASE_URL", "other.db");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.url, "other.db");

        clear_env();
    }

    #[test]
    fn test_env_override_email() {
        let _guard = lock_env();
        clear_env();

        let file = NamedTempFile::new().unwrap();

        std::env::set_var("MAINBLOG_EMAIL_ENABLED", "true");
        std::env::set_var("MAINBLOG_EMAIL_FROM", "team@example.com");
        std::env::set_var("MAINBLOG_SMTP_HOST", "mail.example.com");
        std::env::set_var("MAINBLOG_SMTP_PORT", "587");
        std::env::set_var("MAINBLOG_SMTP_USERNAME", "user");
        std::env::set_var("MAINBLOG_SMTP_PASSWORD", "pass");

        let config = Config::load_with_env(file.path()).unwrap();

        assert!(config.email.enabled);
        assert_eq!(config.email.from_address, "team@example.com");
        assert_eq!(config.email.smtp_host, "mail.example.com");
        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.email.smtp_username, "user");
        assert_eq!(config.email.smtp_password, "pass");

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8081\nemail:\n  enabled: true\n").unwrap();

        std::env::set_var("MAINBLOG_SERVER_PORT", "not_a_number");
        std::env::set_var("MAINBLOG_EMAIL_ENABLED", "maybe");
        std::env::set_var("MAINBLOG_SESSION_EXPIRATION_DAYS", "-3");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8081);
        assert!(config.email.enabled);
        assert_eq!(config.auth.session_expiration_days, 7);

        clear_env();
    }
}
