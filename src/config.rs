//! Configuration management for the SQL Server Doctor server.
//!
//! Configuration is loaded from environment variables once at startup,
//! following the 12-factor app pattern, and passed down explicitly; no
//! module reads the environment after `Config::from_env` returns.

use crate::constants::{
    DEFAULT_APPLICATION_NAME, DEFAULT_DATABASE, DEFAULT_MAX_RESULT_ROWS, DEFAULT_PORT,
    DEFAULT_RECONNECT_ATTEMPTS,
};
use crate::error::ServerError;
use serde::{Deserialize, Serialize};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration.
    pub database: DatabaseConfig,

    /// Query execution configuration.
    pub query: QueryConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQL Server hostname or IP address.
    pub host: String,

    /// SQL Server port (default: 1433).
    pub port: u16,

    /// Database to connect to (default: master).
    pub database: String,

    /// Authentication configuration.
    pub auth: AuthConfig,

    /// Enable TLS encryption on the TDS stream.
    pub encrypt: bool,

    /// Trust server certificate (for self-signed certs).
    pub trust_server_certificate: bool,

    /// Application name sent to SQL Server.
    pub application_name: String,

    /// How many times a broken handle is re-established and the failed
    /// statement retried before the error is surfaced.
    pub reconnect_attempts: u32,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuthConfig {
    /// SQL Server authentication (username/password).
    SqlServer { username: String, password: String },

    /// Windows integrated authentication, used when no credentials are set.
    #[cfg(windows)]
    Integrated,
}

/// Query execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum result rows returned per query.
    pub max_result_rows: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// ## Required
    /// - `SQL_SERVER_HOST`: SQL Server hostname
    ///
    /// ## Optional
    /// - `SQL_SERVER_PORT`: Port number (default: 1433)
    /// - `SQL_SERVER_DATABASE`: Database name (default: master)
    /// - `SQL_SERVER_USER` / `SQL_SERVER_PASSWORD`: SQL authentication pair;
    ///   when absent, integrated authentication is used (Windows only)
    /// - `SQL_SERVER_ENCRYPT`: Enable TLS (default: false)
    /// - `SQL_SERVER_TRUST_CERT`: Trust server certificate (default: true)
    /// - `SQL_SERVER_APP_NAME`: Application name (default: sqlserver-doctor)
    /// - `SQL_SERVER_RECONNECT_ATTEMPTS`: Reconnect retries (default: 1)
    /// - `SQL_SERVER_MAX_ROWS`: Maximum result rows (default: 10000)
    pub fn from_env() -> Result<Self, ServerError> {
        let host = std::env::var("SQL_SERVER_HOST")
            .map_err(|_| ServerError::config("SQL_SERVER_HOST environment variable is required"))?;

        let port = parse_env("SQL_SERVER_PORT", DEFAULT_PORT)?;

        let database =
            std::env::var("SQL_SERVER_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        let username = std::env::var("SQL_SERVER_USER").ok();
        let password = std::env::var("SQL_SERVER_PASSWORD").ok();

        let auth = match (username, password) {
            (Some(username), Some(password)) => AuthConfig::SqlServer { username, password },
            (Some(_), None) => {
                return Err(ServerError::config(
                    "SQL_SERVER_PASSWORD is required when SQL_SERVER_USER is set",
                ))
            }
            (None, Some(_)) => {
                return Err(ServerError::config(
                    "SQL_SERVER_USER is required when SQL_SERVER_PASSWORD is set",
                ))
            }
            (None, None) => {
                #[cfg(windows)]
                {
                    AuthConfig::Integrated
                }
                #[cfg(not(windows))]
                {
                    return Err(ServerError::config(
                        "SQL_SERVER_USER and SQL_SERVER_PASSWORD are required: \
                         integrated authentication is only available on Windows",
                    ));
                }
            }
        };

        let encrypt = env_flag("SQL_SERVER_ENCRYPT", false);
        let trust_server_certificate = env_flag("SQL_SERVER_TRUST_CERT", true);

        let application_name = std::env::var("SQL_SERVER_APP_NAME")
            .unwrap_or_else(|_| DEFAULT_APPLICATION_NAME.to_string());

        let reconnect_attempts =
            parse_env("SQL_SERVER_RECONNECT_ATTEMPTS", DEFAULT_RECONNECT_ATTEMPTS)?;
        let max_result_rows = parse_env("SQL_SERVER_MAX_ROWS", DEFAULT_MAX_RESULT_ROWS)?;

        Ok(Config {
            database: DatabaseConfig {
                host,
                port,
                database,
                auth,
                encrypt,
                trust_server_certificate,
                application_name,
                reconnect_attempts,
            },
            query: QueryConfig { max_result_rows },
        })
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_result_rows: DEFAULT_MAX_RESULT_ROWS,
        }
    }
}

/// Parse an optional environment variable, failing on malformed values.
///
/// A variable that is set but unparseable is a startup error rather than a
/// silent fallback to the default.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ServerError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ServerError::config(format!("{} has an invalid value: {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Read a boolean flag ("true"/"1" vs anything else).
fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| {
            let v = v.to_lowercase();
            v == "true" || v == "1" || v == "yes"
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: &[&str] = &[
        "SQL_SERVER_HOST",
        "SQL_SERVER_PORT",
        "SQL_SERVER_DATABASE",
        "SQL_SERVER_USER",
        "SQL_SERVER_PASSWORD",
        "SQL_SERVER_ENCRYPT",
        "SQL_SERVER_TRUST_CERT",
        "SQL_SERVER_APP_NAME",
        "SQL_SERVER_RECONNECT_ATTEMPTS",
        "SQL_SERVER_MAX_ROWS",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn from_env_requires_host() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("SQL_SERVER_HOST"));
    }

    #[test]
    #[serial]
    fn from_env_defaults() {
        clear_env();
        std::env::set_var("SQL_SERVER_HOST", "db.example.com");
        std::env::set_var("SQL_SERVER_USER", "doctor");
        std::env::set_var("SQL_SERVER_PASSWORD", "secret");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database.host, "db.example.com");
        assert_eq!(config.database.port, 1433);
        assert_eq!(config.database.database, "master");
        assert!(!config.database.encrypt);
        assert!(config.database.trust_server_certificate);
        assert_eq!(config.database.application_name, "sqlserver-doctor");
        assert_eq!(config.database.reconnect_attempts, 1);
        assert_eq!(config.query.max_result_rows, 10_000);
        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        clear_env();
        std::env::set_var("SQL_SERVER_HOST", "db.example.com");
        std::env::set_var("SQL_SERVER_PORT", "14330");
        std::env::set_var("SQL_SERVER_DATABASE", "tempdb");
        std::env::set_var("SQL_SERVER_USER", "doctor");
        std::env::set_var("SQL_SERVER_PASSWORD", "secret");
        std::env::set_var("SQL_SERVER_ENCRYPT", "true");
        std::env::set_var("SQL_SERVER_RECONNECT_ATTEMPTS", "3");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database.port, 14330);
        assert_eq!(config.database.database, "tempdb");
        assert!(config.database.encrypt);
        assert_eq!(config.database.reconnect_attempts, 3);
        assert!(matches!(
            config.database.auth,
            AuthConfig::SqlServer { ref username, .. } if username == "doctor"
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_rejects_malformed_port() {
        clear_env();
        std::env::set_var("SQL_SERVER_HOST", "db.example.com");
        std::env::set_var("SQL_SERVER_USER", "doctor");
        std::env::set_var("SQL_SERVER_PASSWORD", "secret");
        std::env::set_var("SQL_SERVER_PORT", "not-a-port");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("SQL_SERVER_PORT"));
        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_rejects_user_without_password() {
        clear_env();
        std::env::set_var("SQL_SERVER_HOST", "db.example.com");
        std::env::set_var("SQL_SERVER_USER", "doctor");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("SQL_SERVER_PASSWORD"));
        clear_env();
    }

    #[cfg(not(windows))]
    #[test]
    #[serial]
    fn from_env_rejects_missing_credentials_off_windows() {
        clear_env();
        std::env::set_var("SQL_SERVER_HOST", "db.example.com");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("integrated authentication"));
        clear_env();
    }
}
