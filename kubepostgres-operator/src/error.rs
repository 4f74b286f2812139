//! Error types for the KubePostgres operator.

use thiserror::Error;

/// Errors that can occur during operator operations.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Resource not found.
    #[error("Resource not found: {kind}/{name} in namespace {namespace}")]
    NotFound {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
        /// Resource namespace.
        namespace: String,
    },

    /// Resource already exists.
    #[error("Resource already exists: {kind}/{name} in namespace {namespace}")]
    AlreadyExists {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
        /// Resource namespace.
        namespace: String,
    },

    /// The write was based on a stale resource version.
    #[error("Conflicting write to {kind}/{name} in namespace {namespace}")]
    Conflict {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
        /// Resource namespace.
        namespace: String,
    },

    /// The child is already controlled by a different owner.
    #[error("{kind}/{name} is already controlled by {owner_kind}/{owner_name}")]
    AlreadyOwned {
        /// Child kind.
        kind: String,
        /// Child name.
        name: String,
        /// Kind of the existing controller.
        owner_kind: String,
        /// Name of the existing controller.
        owner_name: String,
    },

    /// A required metadata field is missing from an object.
    #[error("Object is missing required key {0}")]
    MissingObjectKey(&'static str),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// API error reported by a non-Kubernetes store backend.
    #[error("API error: {0}")]
    ApiError(String),

    /// The surrounding reconciliation was cancelled.
    #[error("Reconciliation cancelled")]
    Cancelled,
}

impl OperatorError {
    /// Whether the error means the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::KubeError(kube::Error::Api(err)) => err.code == 404,
            _ => false,
        }
    }

    /// Whether the error means a create collided with an existing object.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::AlreadyExists { .. } => true,
            Self::KubeError(kube::Error::Api(err)) => {
                err.code == 409 && err.reason == "AlreadyExists"
            }
            _ => false,
        }
    }
}

/// Result type for operator operations.
pub type OperatorResult<T> = Result<T, OperatorError>;

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        OperatorError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for OperatorError {
    fn from(err: serde_yaml::Error) -> Self {
        OperatorError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> OperatorError {
        OperatorError::KubeError(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: reason.to_string(),
            code,
        }))
    }

    #[test]
    fn not_found_classification() {
        let err = OperatorError::NotFound {
            kind: "Service".into(),
            name: "db1-postgres".into(),
            namespace: "default".into(),
        };
        assert!(err.is_not_found());
        assert!(api_error(404, "NotFound").is_not_found());
        assert!(!api_error(500, "InternalError").is_not_found());
        assert!(!OperatorError::Cancelled.is_not_found());
    }

    #[test]
    fn already_exists_classification() {
        assert!(api_error(409, "AlreadyExists").is_already_exists());
        assert!(!api_error(409, "Conflict").is_already_exists());
        assert!(!api_error(404, "NotFound").is_already_exists());
    }

    #[test]
    fn messages_name_the_object() {
        let err = OperatorError::AlreadyOwned {
            kind: "StatefulSet".into(),
            name: "db1-postgres".into(),
            owner_kind: "Database".into(),
            owner_name: "other".into(),
        };
        assert_eq!(
            err.to_string(),
            "StatefulSet/db1-postgres is already controlled by Database/other"
        );
    }
}
