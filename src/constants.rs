//! Centralized defaults for the SQL Server Doctor server.

/// Default SQL Server TCP port.
pub const DEFAULT_PORT: u16 = 1433;

/// Default database to connect to when none is configured.
pub const DEFAULT_DATABASE: &str = "master";

/// Application name reported to SQL Server in session metadata.
pub const DEFAULT_APPLICATION_NAME: &str = "sqlserver-doctor";

/// Number of reconnect-and-retry attempts after a broken handle is detected.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 1;

/// Default maximum result rows per query.
pub const DEFAULT_MAX_RESULT_ROWS: usize = 10_000;
