//! Database connectivity, query execution, and the diagnostic catalog.

mod connection;
pub mod diagnostics;
mod query;
pub mod types;

pub use connection::{ConnectionManager, RawConnection};
pub use diagnostics::{
    ActiveSession, DatabaseInfo, DiagnosticQueries, SchedulerReport, SchedulerStat,
    ServerVersionInfo,
};
pub use query::{ColumnInfo, QueryResult, ResultRow};
pub use types::SqlValue;
