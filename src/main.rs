//! SQL Server Doctor entry point.
//!
//! Starts the MCP server on stdio transport for integration with Claude
//! Desktop and other MCP clients. Configuration comes from SQL_SERVER_*
//! environment variables; a missing or malformed configuration aborts
//! startup before any tool call is served.

use anyhow::Result;
use rmcp::ServiceExt;
use sqlserver_doctor::{Config, SqlDoctorServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging goes to stderr; stdout is reserved for JSON-RPC.
    init_logging();

    let version = env!("CARGO_PKG_VERSION");
    eprintln!("SQL Server Doctor v{version} starting...");
    eprintln!("Transport: stdio");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] {}", info);
    }));

    // Configuration errors are fatal: the process refuses to serve.
    let config = Config::from_env()?;
    info!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.database,
        "Configuration loaded"
    );

    // The database connection is established lazily by the first tool call.
    let server = SqlDoctorServer::new(config);
    let metrics = server.metrics().clone();
    eprintln!("Server initialized. Ready to accept requests...");

    let service = server.serve(rmcp::transport::stdio()).await?;

    match service.waiting().await {
        Ok(reason) => eprintln!("Service stopped: {reason:?}"),
        Err(e) => eprintln!("Service error: {e}"),
    }

    info!(metrics = ?metrics.snapshot(), "Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber with stderr output.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,sqlserver_doctor=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
