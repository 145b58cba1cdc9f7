//! MCP server struct definition and initialization.

use crate::config::Config;
use crate::database::{ConnectionManager, DiagnosticQueries};
use crate::error::ServerError;
use crate::telemetry::{new_shared_metrics, SharedMetrics};
use rmcp::handler::server::tool::ToolRouter;
use std::sync::Arc;

/// The SQL Server Doctor MCP server instance.
///
/// The struct is cloned per request; inner state is shared via `Arc`. The
/// connection manager and diagnostic catalog are constructed here and
/// injected, so tests can build the same pieces against their own
/// configuration.
#[derive(Clone)]
pub struct SqlDoctorServer {
    /// Connection manager owning the single database handle.
    manager: Arc<ConnectionManager>,

    /// The diagnostic query catalog.
    diagnostics: Arc<DiagnosticQueries>,

    /// Configuration loaded at startup.
    config: Arc<Config>,

    /// Server metrics counters.
    metrics: SharedMetrics,

    /// Tool router for dispatching tool calls.
    pub(crate) tool_router: ToolRouter<Self>,
}

impl SqlDoctorServer {
    /// Create a new server instance with the given configuration.
    ///
    /// The database connection is not opened here; it is established lazily
    /// by the first tool call.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let metrics = new_shared_metrics();

        let manager = Arc::new(ConnectionManager::new(
            Arc::new(config.database.clone()),
            config.query.max_result_rows,
            metrics.clone(),
        ));
        let diagnostics = Arc::new(DiagnosticQueries::new(manager.clone()));

        Self {
            manager,
            diagnostics,
            config,
            metrics,
            tool_router: crate::tools::create_tool_router(),
        }
    }

    /// Create a server from environment variables.
    pub fn from_env() -> Result<Self, ServerError> {
        let config = Config::from_env()?;
        Ok(Self::new(config))
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the connection manager.
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Get a reference to the diagnostic catalog.
    pub fn diagnostics(&self) -> &DiagnosticQueries {
        &self.diagnostics
    }

    /// Get a reference to the metrics collector.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }
}
