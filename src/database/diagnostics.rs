//! The diagnostic query catalog.
//!
//! Each operation pairs one fixed read-only statement against the system
//! catalog/DMV surface with a shaping step that populates an explicit record
//! type field by field. Columns a server returns beyond the declared set are
//! logged and dropped, never passed through to the protocol boundary.

use crate::database::query::{QueryResult, ResultRow};
use crate::database::types::SqlValue;
use crate::database::ConnectionManager;
use crate::error::ServerError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Version and edition information for the connected instance.
///
/// All fields are nullable; a server may decline to report any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ServerVersionInfo {
    /// Full `@@VERSION` banner.
    pub version: Option<String>,
    /// Product version number, e.g. `16.0.1000.6`.
    pub product_version: Option<String>,
    /// Servicing level, e.g. `RTM` or `CU12`.
    pub product_level: Option<String>,
    /// Edition, e.g. `Developer Edition (64-bit)`.
    pub edition: Option<String>,
    /// Instance name as reported by `@@SERVERNAME`.
    pub instance_name: Option<String>,
}

/// One database visible to the connected login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseInfo {
    /// Database name.
    pub name: String,
    /// Database ID.
    pub database_id: i32,
    /// Creation timestamp in ODBC canonical form.
    pub create_date: Option<String>,
    /// Database state, e.g. `ONLINE`, `OFFLINE`, `RECOVERING`.
    pub state: String,
    /// Recovery model: `SIMPLE`, `FULL`, or `BULK_LOGGED`.
    pub recovery_model: String,
    /// Compatibility level, e.g. 150.
    pub compatibility_level: i32,
}

/// A currently executing request on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActiveSession {
    /// Session ID of the request.
    pub session_id: i32,
    /// Request status, e.g. `running` or `suspended`.
    pub status: String,
    /// Command type, e.g. `SELECT`.
    pub command: String,
    /// Statement text, when the plan cache entry is still available.
    pub sql_text: Option<String>,
    /// Database the request is running in.
    pub database_name: Option<String>,
    /// CPU time consumed, in milliseconds.
    pub cpu_time_ms: i64,
    /// Wall-clock time since the request started, in milliseconds.
    pub elapsed_time_ms: i64,
    /// Logical (buffer cache) reads.
    pub logical_reads: i64,
    /// Physical (disk) reads.
    pub physical_reads: i64,
    /// Time spent waiting, in milliseconds.
    pub wait_time_ms: i64,
    /// Most recent wait type, when the request has waited.
    pub wait_type: Option<String>,
    /// Session holding the lock this request waits on; absent when the
    /// request is not blocked.
    pub blocking_session_id: Option<i32>,
    /// Client host name.
    pub host_name: Option<String>,
    /// Client program name.
    pub program_name: Option<String>,
    /// Login that owns the session.
    pub login_name: Option<String>,
}

/// Task counts for one visible scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchedulerStat {
    /// Scheduler ID.
    pub scheduler_id: i32,
    /// Tasks currently assigned to the scheduler.
    pub current_tasks_count: i32,
    /// Tasks ready to run and waiting for CPU.
    pub runnable_tasks_count: i32,
    /// Tasks waiting in the scheduler's work queue.
    pub work_queue_count: i64,
    /// Pending disk IO operations.
    pub pending_disk_io_count: i32,
}

/// Aggregated CPU-pressure report across all visible schedulers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchedulerReport {
    /// Per-scheduler task counts.
    pub schedulers: Vec<SchedulerStat>,
    /// Number of visible schedulers.
    pub scheduler_count: usize,
    /// Sum of runnable tasks across schedulers.
    pub total_runnable_tasks: i64,
    /// Average runnable tasks per scheduler.
    pub avg_runnable_per_scheduler: f64,
    /// Whether any tasks are waiting for CPU.
    pub cpu_pressure_detected: bool,
    /// Human-readable reading of the numbers.
    pub interpretation: String,
}

/// The fixed catalog of diagnostic operations.
pub struct DiagnosticQueries {
    manager: Arc<ConnectionManager>,
}

impl DiagnosticQueries {
    /// Create the catalog over an injected connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Get version, edition, and instance information.
    pub async fn server_version(&self) -> Result<ServerVersionInfo, ServerError> {
        // SERVERPROPERTY() returns sql_variant, which must be cast explicitly.
        let query = r#"
            SELECT
                @@VERSION AS version,
                CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS product_version,
                CAST(SERVERPROPERTY('ProductLevel') AS NVARCHAR(128)) AS product_level,
                CAST(SERVERPROPERTY('Edition') AS NVARCHAR(128)) AS edition,
                @@SERVERNAME AS instance_name
        "#;

        let result = self.manager.execute(query, &[]).await?;
        check_expected_columns(
            "get_server_version",
            &result,
            &[
                "version",
                "product_version",
                "product_level",
                "edition",
                "instance_name",
            ],
        );
        shape_server_version(&result)
    }

    /// List every database visible to the connected login.
    ///
    /// Rows come back in whatever order the engine produces them; the
    /// catalog does not sort.
    pub async fn list_databases(&self) -> Result<Vec<DatabaseInfo>, ServerError> {
        let query = r#"
            SELECT
                name,
                database_id,
                CONVERT(VARCHAR(23), create_date, 121) AS create_date,
                state_desc,
                recovery_model_desc,
                compatibility_level
            FROM sys.databases
        "#;

        let result = self.manager.execute(query, &[]).await?;
        check_expected_columns(
            "list_databases",
            &result,
            &[
                "name",
                "database_id",
                "create_date",
                "state_desc",
                "recovery_model_desc",
                "compatibility_level",
            ],
        );
        Ok(result.rows.iter().map(shape_database).collect())
    }

    /// List currently executing requests, excluding this server's own
    /// monitoring session.
    pub async fn active_sessions(&self) -> Result<Vec<ActiveSession>, ServerError> {
        let query = r#"
            SELECT
                r.session_id,
                r.status,
                r.command,
                t.text AS sql_text,
                DB_NAME(r.database_id) AS database_name,
                r.cpu_time AS cpu_time_ms,
                r.total_elapsed_time AS elapsed_time_ms,
                r.logical_reads,
                r.reads AS physical_reads,
                r.wait_time AS wait_time_ms,
                r.last_wait_type AS wait_type,
                NULLIF(r.blocking_session_id, 0) AS blocking_session_id,
                s.host_name,
                s.program_name,
                s.login_name
            FROM sys.dm_exec_requests r
            INNER JOIN sys.dm_exec_sessions s ON r.session_id = s.session_id
            OUTER APPLY sys.dm_exec_sql_text(r.sql_handle) t
            WHERE s.is_user_process = 1
              AND r.session_id <> @@SPID
        "#;

        let result = self.manager.execute(query, &[]).await?;
        check_expected_columns(
            "get_active_sessions",
            &result,
            &[
                "session_id",
                "status",
                "command",
                "sql_text",
                "database_name",
                "cpu_time_ms",
                "elapsed_time_ms",
                "logical_reads",
                "physical_reads",
                "wait_time_ms",
                "wait_type",
                "blocking_session_id",
                "host_name",
                "program_name",
                "login_name",
            ],
        );
        Ok(result.rows.iter().map(shape_session).collect())
    }

    /// Read per-scheduler task counts and summarize CPU pressure.
    pub async fn scheduler_stats(&self) -> Result<SchedulerReport, ServerError> {
        // scheduler_id >= 255 are hidden/DAC schedulers.
        let query = r#"
            SELECT
                scheduler_id,
                current_tasks_count,
                runnable_tasks_count,
                work_queue_count,
                pending_disk_io_count
            FROM sys.dm_os_schedulers
            WHERE scheduler_id < 255
        "#;

        let result = self.manager.execute(query, &[]).await?;
        check_expected_columns(
            "get_scheduler_stats",
            &result,
            &[
                "scheduler_id",
                "current_tasks_count",
                "runnable_tasks_count",
                "work_queue_count",
                "pending_disk_io_count",
            ],
        );
        let schedulers: Vec<SchedulerStat> = result.rows.iter().map(shape_scheduler).collect();
        Ok(summarize_schedulers(schedulers))
    }
}

/// Log any columns the server returned beyond the declared set.
fn check_expected_columns(tool: &str, result: &QueryResult, expected: &[&str]) {
    for name in result.column_names() {
        if !expected.contains(&name) {
            warn!(
                "{}: dropping unexpected column {:?} returned by the server",
                tool, name
            );
        }
    }
}

fn shape_server_version(result: &QueryResult) -> Result<ServerVersionInfo, ServerError> {
    let row = result
        .rows
        .first()
        .ok_or_else(|| ServerError::query("No results returned from version query"))?;

    Ok(ServerVersionInfo {
        version: extract_string(row, "version"),
        product_version: extract_string(row, "product_version"),
        product_level: extract_string(row, "product_level"),
        edition: extract_string(row, "edition"),
        instance_name: extract_string(row, "instance_name"),
    })
}

fn shape_database(row: &ResultRow) -> DatabaseInfo {
    DatabaseInfo {
        name: extract_string(row, "name").unwrap_or_default(),
        database_id: extract_i32(row, "database_id").unwrap_or(0),
        create_date: extract_string(row, "create_date"),
        state: extract_string(row, "state_desc").unwrap_or_default(),
        recovery_model: extract_string(row, "recovery_model_desc").unwrap_or_default(),
        compatibility_level: extract_i32(row, "compatibility_level").unwrap_or(0),
    }
}

fn shape_session(row: &ResultRow) -> ActiveSession {
    ActiveSession {
        session_id: extract_i32(row, "session_id").unwrap_or(0),
        status: extract_string(row, "status").unwrap_or_default(),
        command: extract_string(row, "command").unwrap_or_default(),
        sql_text: extract_string(row, "sql_text"),
        database_name: extract_string(row, "database_name"),
        cpu_time_ms: extract_i64(row, "cpu_time_ms").unwrap_or(0),
        elapsed_time_ms: extract_i64(row, "elapsed_time_ms").unwrap_or(0),
        logical_reads: extract_i64(row, "logical_reads").unwrap_or(0),
        physical_reads: extract_i64(row, "physical_reads").unwrap_or(0),
        wait_time_ms: extract_i64(row, "wait_time_ms").unwrap_or(0),
        wait_type: extract_string(row, "wait_type"),
        blocking_session_id: extract_i32(row, "blocking_session_id"),
        host_name: extract_string(row, "host_name"),
        program_name: extract_string(row, "program_name"),
        login_name: extract_string(row, "login_name"),
    }
}

fn shape_scheduler(row: &ResultRow) -> SchedulerStat {
    SchedulerStat {
        scheduler_id: extract_i32(row, "scheduler_id").unwrap_or(0),
        current_tasks_count: extract_i32(row, "current_tasks_count").unwrap_or(0),
        runnable_tasks_count: extract_i32(row, "runnable_tasks_count").unwrap_or(0),
        work_queue_count: extract_i64(row, "work_queue_count").unwrap_or(0),
        pending_disk_io_count: extract_i32(row, "pending_disk_io_count").unwrap_or(0),
    }
}

fn summarize_schedulers(schedulers: Vec<SchedulerStat>) -> SchedulerReport {
    let scheduler_count = schedulers.len();
    let total_runnable_tasks: i64 = schedulers
        .iter()
        .map(|s| i64::from(s.runnable_tasks_count))
        .sum();
    let avg_runnable_per_scheduler = if scheduler_count == 0 {
        0.0
    } else {
        total_runnable_tasks as f64 / scheduler_count as f64
    };
    let cpu_pressure_detected = total_runnable_tasks > 0;

    let interpretation = if cpu_pressure_detected {
        format!(
            "CPU PRESSURE DETECTED: {} task(s) waiting for CPU across {} scheduler(s). \
             Investigate expensive queries or add CPU capacity.",
            total_runnable_tasks, scheduler_count
        )
    } else {
        "No CPU pressure detected: all runnable queues are empty.".to_string()
    };

    SchedulerReport {
        schedulers,
        scheduler_count,
        total_runnable_tasks,
        avg_runnable_per_scheduler,
        cpu_pressure_detected,
        interpretation,
    }
}

// Helper functions to extract values from result rows.

fn extract_string(row: &ResultRow, column: &str) -> Option<String> {
    match row.get(column)? {
        SqlValue::String(s) => Some(s.clone()),
        SqlValue::Null => None,
        other => Some(other.to_display_string()),
    }
}

fn extract_i32(row: &ResultRow, column: &str) -> Option<i32> {
    match row.get(column)? {
        SqlValue::I32(v) => Some(*v),
        SqlValue::I16(v) => Some(i32::from(*v)),
        SqlValue::I64(v) => i32::try_from(*v).ok(),
        _ => None,
    }
}

fn extract_i64(row: &ResultRow, column: &str) -> Option<i64> {
    match row.get(column)? {
        SqlValue::I64(v) => Some(*v),
        SqlValue::I32(v) => Some(i64::from(*v)),
        SqlValue::I16(v) => Some(i64::from(*v)),
        _ => None,
    }
}
