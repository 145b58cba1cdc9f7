//! MCP tools exposing the diagnostic catalog.
//!
//! Four read-only tools, none of which take arguments:
//!
//! - `get_server_version`: version, edition, and instance information
//! - `list_databases`: inventory of databases visible to the login
//! - `get_active_sessions`: currently executing requests with wait and
//!   blocking detail
//! - `get_scheduler_stats`: CPU pressure across visible schedulers

use crate::database::{ActiveSession, DatabaseInfo, SchedulerReport, ServerVersionInfo};
use crate::server::SqlDoctorServer;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::{tool, tool_router, ErrorData as McpError, Json};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::info;

/// Build the tool router dispatching to the methods below.
pub fn create_tool_router() -> ToolRouter<SqlDoctorServer> {
    SqlDoctorServer::tool_router()
}

/// Output for the `get_server_version` tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ServerVersionResponse {
    /// Version and instance information for the connected server.
    #[serde(flatten)]
    pub info: ServerVersionInfo,
}

/// Output for the `list_databases` tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct DatabaseListResponse {
    /// One record per visible database, in server order.
    pub databases: Vec<DatabaseInfo>,
    /// Number of databases returned.
    pub count: usize,
}

/// Output for the `get_active_sessions` tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ActiveSessionsResponse {
    /// One record per executing request, excluding this server's own session.
    pub sessions: Vec<ActiveSession>,
    /// Number of sessions returned.
    pub count: usize,
}

/// Output for the `get_scheduler_stats` tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SchedulerStatsResponse {
    /// Per-scheduler counts and the aggregated pressure reading.
    #[serde(flatten)]
    pub report: SchedulerReport,
}

#[tool_router]
impl SqlDoctorServer {
    #[tool(
        description = "Get SQL Server version, edition, and instance information for the connected server."
    )]
    pub async fn get_server_version(&self) -> Result<Json<ServerVersionResponse>, McpError> {
        info!("Tool called: get_server_version");
        self.metrics().record_tool_call();

        let info = self.diagnostics().server_version().await?;
        Ok(Json(ServerVersionResponse { info }))
    }

    #[tool(
        description = "List all databases on the server with state, recovery model, and compatibility level."
    )]
    pub async fn list_databases(&self) -> Result<Json<DatabaseListResponse>, McpError> {
        info!("Tool called: list_databases");
        self.metrics().record_tool_call();

        let databases = self.diagnostics().list_databases().await?;
        let count = databases.len();
        Ok(Json(DatabaseListResponse { databases, count }))
    }

    #[tool(
        description = "List currently executing sessions with SQL text, CPU, IO, wait, and blocking detail. Excludes this monitoring connection."
    )]
    pub async fn get_active_sessions(&self) -> Result<Json<ActiveSessionsResponse>, McpError> {
        info!("Tool called: get_active_sessions");
        self.metrics().record_tool_call();

        let sessions = self.diagnostics().active_sessions().await?;
        let count = sessions.len();
        Ok(Json(ActiveSessionsResponse { sessions, count }))
    }

    #[tool(
        description = "Report per-scheduler task counts and whether the server shows CPU pressure (tasks waiting for CPU)."
    )]
    pub async fn get_scheduler_stats(&self) -> Result<Json<SchedulerStatsResponse>, McpError> {
        info!("Tool called: get_scheduler_stats");
        self.metrics().record_tool_call();

        let report = self.diagnostics().scheduler_stats().await?;
        Ok(Json(SchedulerStatsResponse { report }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SchedulerStat;

    #[test]
    fn database_list_serializes_with_count() {
        let response = DatabaseListResponse {
            databases: vec![DatabaseInfo {
                name: "master".to_string(),
                database_id: 1,
                create_date: Some("2024-01-01 00:00:00.000".to_string()),
                state: "ONLINE".to_string(),
                recovery_model: "SIMPLE".to_string(),
                compatibility_level: 150,
            }],
            count: 1,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["databases"][0]["name"], "master");
        assert_eq!(json["databases"][0]["compatibility_level"], 150);
    }

    #[test]
    fn version_response_flattens_fields() {
        let response = ServerVersionResponse {
            info: ServerVersionInfo {
                version: Some("Microsoft SQL Server 2022".to_string()),
                product_version: Some("16.0.1000.6".to_string()),
                product_level: Some("RTM".to_string()),
                edition: Some("Developer Edition".to_string()),
                instance_name: None,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["version"], "Microsoft SQL Server 2022");
        assert_eq!(json["edition"], "Developer Edition");
        assert!(json["instance_name"].is_null());
    }

    #[test]
    fn scheduler_response_flattens_report() {
        let response = SchedulerStatsResponse {
            report: SchedulerReport {
                schedulers: vec![SchedulerStat {
                    scheduler_id: 0,
                    current_tasks_count: 4,
                    runnable_tasks_count: 0,
                    work_queue_count: 0,
                    pending_disk_io_count: 0,
                }],
                scheduler_count: 1,
                total_runnable_tasks: 0,
                avg_runnable_per_scheduler: 0.0,
                cpu_pressure_detected: false,
                interpretation: "No CPU pressure detected: all runnable queues are empty."
                    .to_string(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["scheduler_count"], 1);
        assert_eq!(json["cpu_pressure_detected"], false);
        assert_eq!(json["schedulers"][0]["scheduler_id"], 0);
    }

    #[test]
    fn empty_sessions_serialize_to_empty_sequence() {
        let response = ActiveSessionsResponse {
            sessions: Vec::new(),
            count: 0,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["count"], 0);
        assert!(json["sessions"].as_array().unwrap().is_empty());
    }
}
