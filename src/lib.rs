//! # SQL Server Doctor
//!
//! An MCP (Model Context Protocol) server exposing a small, fixed catalog of
//! read-only SQL Server diagnostic queries as callable tools: server
//! version, database inventory, active session monitoring, and scheduler
//! (CPU pressure) statistics.
//!
//! ## Architecture
//!
//! - A connection manager owns one lazily-established TDS connection and
//!   re-establishes it once when it is found broken
//! - A diagnostic catalog maps each tool to a fixed query and an explicit
//!   record type
//! - The MCP layer registers the catalog as tools over stdio transport

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod handlers;
pub mod server;
pub mod telemetry;
pub mod tools;

pub use config::Config;
pub use error::ServerError;
pub use server::SqlDoctorServer;
