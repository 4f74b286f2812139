//! Operator configuration.

use crate::error::{OperatorError, OperatorResult};
use std::env;
use std::time::Duration;

/// Default field manager recorded on every write.
pub const DEFAULT_FIELD_MANAGER: &str = "kubepostgres-operator";

/// Default delay before a failed reconciliation is retried.
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Runtime configuration of the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace to watch; all namespaces when unset.
    pub watch_namespace: Option<String>,
    /// Field manager name used for creates and patches.
    pub field_manager: String,
    /// Requeue delay applied by the error policy.
    pub error_requeue: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            error_requeue: DEFAULT_ERROR_REQUEUE,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `KUBEPOSTGRES_WATCH_NAMESPACE`: namespace to watch
    /// - `KUBEPOSTGRES_FIELD_MANAGER`: field manager for writes
    /// - `KUBEPOSTGRES_ERROR_REQUEUE_SECS`: retry delay after a failed reconcile
    pub fn from_env() -> OperatorResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> OperatorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let error_requeue = match non_empty("KUBEPOSTGRES_ERROR_REQUEUE_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    OperatorError::InvalidConfig(format!(
                        "KUBEPOSTGRES_ERROR_REQUEUE_SECS must be a whole number of seconds, got {raw:?}"
                    ))
                })?;
                if secs == 0 {
                    return Err(OperatorError::InvalidConfig(
                        "KUBEPOSTGRES_ERROR_REQUEUE_SECS must be at least 1".into(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.error_requeue,
        };

        Ok(Self {
            watch_namespace: non_empty("KUBEPOSTGRES_WATCH_NAMESPACE"),
            field_manager: non_empty("KUBEPOSTGRES_FIELD_MANAGER")
                .unwrap_or(defaults.field_manager),
            error_requeue,
        })
    }
}
