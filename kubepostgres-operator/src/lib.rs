//! KubePostgres Kubernetes Operator
//!
//! This crate provides a Kubernetes operator that runs a PostgreSQL instance
//! for every `Database` resource.
//!
//! # Custom Resource Definitions
//!
//! - **Database**: Backed by a single-replica StatefulSet and a Service named
//!   `<database>-postgres`, both owned by the Database
//!
//! Children are created once and never updated. Deleting the Database
//! leaves their removal to the Kubernetes garbage collector.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: db.kubepostgres.dev/v1alpha1
//! kind: Database
//! metadata:
//!   name: db1
//!   namespace: default
//! spec:
//!   containerImage: postgres
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod ownership;
pub mod resources;
pub mod store;
pub mod telemetry;

pub use config::OperatorConfig;
pub use crd::{Database, DatabaseSpec};
pub use error::{OperatorError, OperatorResult};
