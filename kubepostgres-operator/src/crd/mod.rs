//! Custom Resource Definitions for the KubePostgres operator.
//!
//! - [`Database`]: a PostgreSQL instance backed by a StatefulSet and a Service

mod database;

pub use database::{Database, DatabaseSpec};
