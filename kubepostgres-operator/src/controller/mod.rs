//! Kubernetes controllers for KubePostgres resources.
//!
//! - [`DatabaseController`]: Manages Database resources
//!
//! # Usage with kube-runtime
//!
//! The controller runtime requires both a reconcile function and an error policy:
//!
//! ```ignore
//! use kubepostgres_operator::controller::{database_error_policy, reconcile_database};
//!
//! Controller::new(databases, watcher_config)
//!     .owns(statefulsets, watcher_config.clone())
//!     .owns(services, watcher_config)
//!     .run(reconcile_database, database_error_policy, context)
//!     .for_each(|_| futures::future::ready(()))
//!     .await;
//! ```

mod database;

pub use database::{
    DatabaseController, error_policy as database_error_policy, reconcile as reconcile_database,
};

use kube::runtime::controller::Action;
use std::time::Duration;

/// Shared context for controllers.
pub struct ControllerContext<S> {
    /// Database reconciler.
    pub controller: DatabaseController<S>,
    /// Delay before a failed reconciliation is retried.
    pub error_requeue: Duration,
}

impl<S> ControllerContext<S> {
    /// Create a new controller context.
    pub fn new(controller: DatabaseController<S>, error_requeue: Duration) -> Self {
        Self {
            controller,
            error_requeue,
        }
    }
}

/// Result type for reconciliation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Don't requeue; wait for the next change to the Database or its children.
    Done,
}

impl From<ReconcileAction> for Action {
    fn from(action: ReconcileAction) -> Self {
        match action {
            ReconcileAction::Done => Action::await_change(),
        }
    }
}
