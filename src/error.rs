//! Error types for the SQL Server Doctor MCP server.
//!
//! All database-driver errors are translated into this module's taxonomy
//! before they reach the protocol boundary; no tiberius error type crosses
//! the tool surface.

use rmcp::ErrorData;
use thiserror::Error;

/// Errors surfaced by the diagnostic server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Required environment configuration is missing or malformed.
    /// Fatal at startup; the server never serves tool calls in this state.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A database session could not be established or re-established,
    /// or an established session was lost mid-operation.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The session is live but a specific statement failed.
    #[error("Query error: {message}")]
    Query {
        message: String,
        sql_error_code: Option<i32>,
    },
}

impl ServerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            sql_error_code: None,
        }
    }

    /// Create a query error carrying the SQL Server error number.
    pub fn query_with_code(msg: impl Into<String>, code: i32) -> Self {
        Self::Query {
            message: msg.into(),
            sql_error_code: Some(code),
        }
    }

    /// Whether this error indicates the managed connection handle is broken.
    ///
    /// Connectivity-class errors are the only ones that trigger the
    /// discard-and-reconnect path; query errors never do.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Map a SQL Server error number onto the local taxonomy.
///
/// Numbers that describe a dead or unreachable session become connection
/// errors; everything else stays a query error with the original message.
pub fn from_sql_error(code: i32, message: &str) -> ServerError {
    match code {
        // Login and database-access failures: the session is unusable.
        18456 => ServerError::connection(format!("Login failed: {}", message)),
        4060 => ServerError::connection(format!("Cannot open database: {}", message)),

        // Transport-level failures reported as server errors.
        -1 => ServerError::connection("Connection broken"),
        53 => ServerError::connection("Server not found or not accessible"),
        233 | 596 => ServerError::connection(format!("Session terminated: {}", message)),
        10053 | 10054 | 10060 => {
            ServerError::connection(format!("Network failure ({}): {}", code, message))
        }

        // Permission errors.
        229 | 230 => ServerError::query_with_code(format!("Permission denied: {}", message), code),

        // Missing objects (e.g. a DMV absent on this edition).
        208 => ServerError::query_with_code(format!("Invalid object: {}", message), code),
        2812 => ServerError::query_with_code(format!("Procedure not found: {}", message), code),

        // Syntax or version mismatch in a catalog query.
        102 => ServerError::query_with_code(format!("Syntax error: {}", message), code),
        207 => ServerError::query_with_code(format!("Invalid column: {}", message), code),

        _ => ServerError::query_with_code(message, code),
    }
}

impl From<tiberius::error::Error> for ServerError {
    fn from(e: tiberius::error::Error) -> Self {
        use tiberius::error::Error;

        match e {
            Error::Server(token) => from_sql_error(token.code() as i32, token.message()),
            Error::Io { .. } => ServerError::connection_with_source("IO error", e),
            Error::Tls(_) => ServerError::connection_with_source("TLS error", e),
            Error::Protocol(_) => ServerError::connection_with_source("Protocol error", e),
            Error::Routing { .. } => {
                ServerError::connection_with_source("Server requested rerouting", e)
            }
            other => ServerError::query(other.to_string()),
        }
    }
}

/// Convert into an MCP protocol error for the tool-call boundary.
///
/// Tool callers see the human-readable message, never the driver error.
impl From<ServerError> for ErrorData {
    fn from(e: ServerError) -> Self {
        match e {
            ServerError::Config(msg) => ErrorData::invalid_request(msg, None),
            other => ErrorData::internal_error(other.to_string(), None),
        }
    }
}
