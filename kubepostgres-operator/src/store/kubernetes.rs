//! [`ObjectStore`] backed by the Kubernetes API server.

use super::{ObjectKey, ObjectStore, StoreFuture, StoredObject};
use crate::error::OperatorError;
use crate::ownership;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};

/// Store that reads and writes through a [`kube::Client`].
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    /// Create a store writing as `field_manager`.
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api<K: StoredObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn kind_of<K: StoredObject>() -> String {
    K::kind(&()).into_owned()
}

impl ObjectStore for KubeStore {
    fn get<K: StoredObject>(&self, key: &ObjectKey) -> StoreFuture<'_, K> {
        let key = key.clone();
        Box::pin(async move {
            match self.api::<K>(&key.namespace).get(&key.name).await {
                Ok(obj) => Ok(obj),
                Err(kube::Error::Api(err)) if err.code == 404 => Err(OperatorError::NotFound {
                    kind: kind_of::<K>(),
                    name: key.name,
                    namespace: key.namespace,
                }),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn create<K: StoredObject>(&self, object: &K) -> StoreFuture<'_, K> {
        let object = object.clone();
        Box::pin(async move {
            let key = ObjectKey::for_resource(&object)?;
            let params = PostParams {
                field_manager: Some(self.field_manager.clone()),
                ..Default::default()
            };
            match self.api::<K>(&key.namespace).create(&params, &object).await {
                Ok(created) => Ok(created),
                Err(kube::Error::Api(err)) if err.code == 409 => {
                    Err(OperatorError::AlreadyExists {
                        kind: kind_of::<K>(),
                        name: key.name,
                        namespace: key.namespace,
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn link_for_cascade_deletion<K: StoredObject>(
        &self,
        child: &K,
        owner: &OwnerReference,
    ) -> StoreFuture<'_, K> {
        let child = child.clone();
        let owner = owner.clone();
        Box::pin(async move {
            let key = ObjectKey::for_resource(&child)?;
            let mut meta = child.meta().clone();
            if !ownership::attach(&mut meta, &kind_of::<K>(), &owner)? {
                return Ok(child);
            }

            // A merge patch replaces the whole list, so send every reference
            // and pin the resource version to fail on concurrent edits.
            let patch = serde_json::json!({
                "metadata": {
                    "ownerReferences": meta.owner_references,
                    "resourceVersion": child.resource_version(),
                }
            });
            let params = PatchParams {
                field_manager: Some(self.field_manager.clone()),
                ..Default::default()
            };

            match self
                .api::<K>(&key.namespace)
                .patch(&key.name, &params, &Patch::Merge(&patch))
                .await
            {
                Ok(patched) => Ok(patched),
                Err(kube::Error::Api(err)) if err.code == 409 => Err(OperatorError::Conflict {
                    kind: kind_of::<K>(),
                    name: key.name,
                    namespace: key.namespace,
                }),
                Err(kube::Error::Api(err)) if err.code == 404 => Err(OperatorError::NotFound {
                    kind: kind_of::<K>(),
                    name: key.name,
                    namespace: key.namespace,
                }),
                Err(e) => Err(e.into()),
            }
        })
    }
}
