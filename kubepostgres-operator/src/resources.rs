//! Desired child resources for a [`Database`].
//!
//! Builders are pure: the same Database always yields the same objects, so
//! repeated reconciliation recomputes identical descriptors. Owner
//! references are not set here; see [`crate::ownership`].

use crate::crd::Database;
use crate::error::{OperatorError, OperatorResult};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Port PostgreSQL listens on, exposed by both the pod and the Service.
pub const POSTGRES_PORT: i32 = 5432;

/// Name of the PostgreSQL container in the pod template.
pub const CONTAINER_NAME: &str = "postgres";

/// Environment variable carrying the initial superuser password.
pub const PASSWORD_ENV: &str = "POSTGRES_PASSWORD";

// Literal initial password. Credential generation is not handled by the operator.
const INITIAL_PASSWORD: &str = "password";

const NAME_SUFFIX: &str = "-postgres";
const APP_LABEL: &str = "app";

/// Name shared by the StatefulSet and Service of a Database.
pub fn child_name(database_name: &str) -> String {
    format!("{database_name}{NAME_SUFFIX}")
}

/// Labels applied to, and selected by, every child of a Database.
pub fn labels(database_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), database_name.to_string())])
}

fn identity(database: &Database) -> OperatorResult<(&str, &str)> {
    let name = database
        .metadata
        .name
        .as_deref()
        .ok_or(OperatorError::MissingObjectKey(".metadata.name"))?;
    let namespace = database
        .metadata
        .namespace
        .as_deref()
        .ok_or(OperatorError::MissingObjectKey(".metadata.namespace"))?;
    Ok((name, namespace))
}

fn child_metadata(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(child_name(name)),
        namespace: Some(namespace.to_string()),
        labels: Some(labels(name)),
        ..Default::default()
    }
}

/// Build the singleton PostgreSQL StatefulSet for a Database.
pub fn build_statefulset(database: &Database) -> OperatorResult<StatefulSet> {
    let (name, namespace) = identity(database)?;

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(database.spec.container_image.clone()),
        ports: Some(vec![ContainerPort {
            container_port: POSTGRES_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env: Some(vec![EnvVar {
            name: PASSWORD_ENV.to_string(),
            value: Some(INITIAL_PASSWORD.to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Ok(StatefulSet {
        metadata: child_metadata(name, namespace),
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels(name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(child_metadata(name, namespace)),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Build the Service fronting the PostgreSQL StatefulSet of a Database.
pub fn build_service(database: &Database) -> OperatorResult<Service> {
    let (name, namespace) = identity(database)?;

    Ok(Service {
        metadata: child_metadata(name, namespace),
        spec: Some(ServiceSpec {
            selector: Some(labels(name)),
            ports: Some(vec![ServicePort {
                name: Some(child_name(name)),
                port: POSTGRES_PORT,
                protocol: Some("TCP".to_string()),
                target_port: Some(IntOrString::Int(POSTGRES_PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    })
}
