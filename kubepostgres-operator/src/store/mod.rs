//! Object store abstraction used by the reconciler.
//!
//! The reconciler only needs three operations against the cluster: read an
//! object by key, create an object, and record an owner reference on an
//! existing object. [`KubeStore`] implements them against the Kubernetes
//! API; [`MemoryStore`] keeps everything in process.

mod kubernetes;
mod memory;

pub use kubernetes::KubeStore;
pub use memory::{MemoryStore, StoreOperation, StoreStats};

use crate::error::{OperatorError, OperatorResult};
use kube::{Resource, ResourceExt};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Type alias for async store futures.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = OperatorResult<T>> + Send + 'a>>;

/// Namespaced objects the store can read and write.
pub trait StoredObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoredObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Namespace and name identifying an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Object namespace.
    pub namespace: String,
    /// Object name.
    pub name: String,
}

impl ObjectKey {
    /// Create a key from namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object.
    pub fn for_resource<K: Resource>(obj: &K) -> OperatorResult<Self> {
        let namespace = obj
            .namespace()
            .ok_or(OperatorError::MissingObjectKey(".metadata.namespace"))?;
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or(OperatorError::MissingObjectKey(".metadata.name"))?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Backing store for Databases and their children.
///
/// Implementations must report a missing object as an error for which
/// [`OperatorError::is_not_found`] holds and a create collision as one for
/// which [`OperatorError::is_already_exists`] holds. Every other failure is
/// passed through untouched; the store never retries.
pub trait ObjectStore: Send + Sync {
    /// Read the object of kind `K` at `key`.
    fn get<K: StoredObject>(&self, key: &ObjectKey) -> StoreFuture<'_, K>;

    /// Create `object`, returning the stored version.
    fn create<K: StoredObject>(&self, object: &K) -> StoreFuture<'_, K>;

    /// Record `owner` as the controller of `child` so the garbage collector
    /// removes `child` when the owner is deleted.
    ///
    /// The write is guarded by the resource version of `child`. A reference
    /// that is already present causes no write.
    fn link_for_cascade_deletion<K: StoredObject>(
        &self,
        child: &K,
        owner: &OwnerReference,
    ) -> StoreFuture<'_, K>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn key_from_resource() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("db1-postgres".into()),
                namespace: Some("default".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let key = ObjectKey::for_resource(&svc).unwrap();
        assert_eq!(key, ObjectKey::new("default", "db1-postgres"));
        assert_eq!(key.to_string(), "default/db1-postgres");
    }

    #[test]
    fn key_requires_namespace() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("db1-postgres".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ObjectKey::for_resource(&svc),
            Err(OperatorError::MissingObjectKey(".metadata.namespace"))
        ));
    }
}
