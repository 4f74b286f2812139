//! Database Custom Resource Definition.
//!
//! Declares a single PostgreSQL instance. The operator backs it with a
//! StatefulSet and a Service of the same derived name.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Database is the Schema for the databases API.
///
/// The spec is read-only to the operator; no status is written back.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "db.kubepostgres.dev",
    version = "v1alpha1",
    kind = "Database",
    plural = "databases",
    shortname = "pgdb",
    namespaced,
    printcolumn = r#"{"name":"Image", "type":"string", "jsonPath":".spec.containerImage"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Container image for the PostgreSQL server (e.g. `postgres:16`).
    pub container_image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::{CustomResourceExt, Resource};

    #[test]
    fn spec_uses_camel_case() {
        let spec = DatabaseSpec {
            container_image: "postgres".to_string(),
        };
        let json = serde_json::to_value(&spec).expect("Failed to serialize DatabaseSpec");
        assert_eq!(json, serde_json::json!({ "containerImage": "postgres" }));
    }

    #[test]
    fn crd_identity() {
        let crd = Database::crd();
        assert_eq!(crd.spec.group, "db.kubepostgres.dev");
        assert_eq!(crd.spec.names.kind, "Database");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(Database::api_version(&()), "db.kubepostgres.dev/v1alpha1");
    }
}
