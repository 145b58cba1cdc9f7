//! ServerHandler implementation for the SQL Server Doctor server.
//!
//! The `#[tool_handler]` macro wires up tool routing automatically,
//! generating the `list_tools` and `call_tool` implementations from the
//! router built in the tools module.

use crate::server::SqlDoctorServer;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{tool_handler, ServerHandler};
use tracing::info;

#[tool_handler]
impl ServerHandler for SqlDoctorServer {
    /// Server identification, sent during the initialization handshake.
    fn get_info(&self) -> ServerInfo {
        info!("MCP client requesting server info");

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,

            capabilities: ServerCapabilities::builder().enable_tools().build(),

            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("SQL Server Doctor".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },

            instructions: Some(build_instructions(self)),
        }
    }
}

/// Build the instructions text shown to MCP clients.
fn build_instructions(server: &SqlDoctorServer) -> String {
    format!(
        "# SQL Server Doctor\n\n\
         Read-only health diagnostics for the SQL Server instance at `{}:{}` \
         (database `{}`).\n\n\
         ## Tools\n\
         - `get_server_version`: version, edition, and instance information\n\
         - `list_databases`: database inventory with state, recovery model, \
         and compatibility level\n\
         - `get_active_sessions`: currently executing requests with SQL text, \
         CPU/IO counters, waits, and blocking chains\n\
         - `get_scheduler_stats`: CPU pressure reading from the scheduler \
         queues\n\n\
         All tools take no arguments and never modify server state. Start \
         with `get_server_version` to confirm connectivity, then \
         `get_active_sessions` when investigating a slow or blocked workload.",
        server.config().database.host,
        server.config().database.port,
        server.config().database.database,
    )
}
