//! In-memory object store for tests and local development.
//!
//! Objects are kept as JSON, keyed by kind, namespace and name, and behave
//! like API server objects in the ways the reconciler can observe: creates
//! assign a `uid` and `resourceVersion`, duplicate creates fail, and owner
//! reference writes are rejected when based on a stale version. All state
//! is lost when the store is dropped.

use super::{ObjectKey, ObjectStore, StoreFuture, StoredObject};
use crate::error::{OperatorError, OperatorResult};
use crate::ownership;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Operations of the [`ObjectStore`] trait, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// [`ObjectStore::get`].
    Get,
    /// [`ObjectStore::create`].
    Create,
    /// [`ObjectStore::link_for_cascade_deletion`].
    Link,
}

/// Counters of calls that reached the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Reads, including misses.
    pub gets: usize,
    /// Successful creates.
    pub creates: usize,
    /// Owner reference writes that changed an object.
    pub links: usize,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<(String, ObjectKey), serde_json::Value>,
    failures: HashMap<(StoreOperation, String), OperatorError>,
    stats: StoreStats,
    next_uid: u64,
    next_version: u64,
}

impl Inner {
    fn take_failure(&mut self, op: StoreOperation, kind: &str) -> OperatorResult<()> {
        match self.failures.remove(&(op, kind.to_string())) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// [`ObjectStore`] holding objects in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn kind_of<K: StoredObject>() -> String {
    K::kind(&()).into_owned()
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `object` as-is, as if another client had created it.
    ///
    /// Missing `uid` and `resourceVersion` are filled in. Not counted in
    /// [`StoreStats`].
    pub fn insert<K: StoredObject>(&self, object: K) -> OperatorResult<K> {
        let mut inner = self.inner.lock();
        Self::put(&mut inner, object)
    }

    /// Read an object without counting the access.
    pub fn peek<K: StoredObject>(&self, key: &ObjectKey) -> OperatorResult<Option<K>> {
        let inner = self.inner.lock();
        inner
            .objects
            .get(&(kind_of::<K>(), key.clone()))
            .map(|value| serde_json::from_value(value.clone()).map_err(Into::into))
            .transpose()
    }

    /// Remove an object, returning whether it existed.
    pub fn remove<K: StoredObject>(&self, key: &ObjectKey) -> bool {
        self.inner
            .lock()
            .objects
            .remove(&(kind_of::<K>(), key.clone()))
            .is_some()
    }

    /// Make the next `op` on kind `K` fail with [`OperatorError::ApiError`].
    pub fn fail_next<K: StoredObject>(&self, op: StoreOperation, message: impl Into<String>) {
        self.fail_next_with::<K>(op, OperatorError::ApiError(message.into()));
    }

    /// Make the next `op` on kind `K` fail with `err`.
    pub fn fail_next_with<K: StoredObject>(&self, op: StoreOperation, err: OperatorError) {
        self.inner.lock().failures.insert((op, kind_of::<K>()), err);
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> StoreStats {
        self.inner.lock().stats
    }

    /// Number of stored objects of every kind.
    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put<K: StoredObject>(inner: &mut Inner, mut object: K) -> OperatorResult<K> {
        let key = ObjectKey::for_resource(&object)?;
        if object.meta().uid.is_none() {
            inner.next_uid += 1;
            object.meta_mut().uid = Some(format!("memory-uid-{}", inner.next_uid));
        }
        if object.meta().resource_version.is_none() {
            object.meta_mut().resource_version = Some(inner.bump_version());
        }
        inner
            .objects
            .insert((kind_of::<K>(), key), serde_json::to_value(&object)?);
        Ok(object)
    }

    fn load<K: StoredObject>(inner: &Inner, key: &ObjectKey) -> OperatorResult<K> {
        let value = inner
            .objects
            .get(&(kind_of::<K>(), key.clone()))
            .ok_or_else(|| OperatorError::NotFound {
                kind: kind_of::<K>(),
                name: key.name.clone(),
                namespace: key.namespace.clone(),
            })?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl ObjectStore for MemoryStore {
    fn get<K: StoredObject>(&self, key: &ObjectKey) -> StoreFuture<'_, K> {
        let key = key.clone();
        Box::pin(async move {
            let mut inner = self.inner.lock();
            inner.stats.gets += 1;
            inner.take_failure(StoreOperation::Get, &kind_of::<K>())?;
            Self::load(&inner, &key)
        })
    }

    fn create<K: StoredObject>(&self, object: &K) -> StoreFuture<'_, K> {
        let mut object = object.clone();
        Box::pin(async move {
            let key = ObjectKey::for_resource(&object)?;
            let mut inner = self.inner.lock();
            inner.take_failure(StoreOperation::Create, &kind_of::<K>())?;
            if inner.objects.contains_key(&(kind_of::<K>(), key.clone())) {
                return Err(OperatorError::AlreadyExists {
                    kind: kind_of::<K>(),
                    name: key.name,
                    namespace: key.namespace,
                });
            }

            // Server-assigned fields are never taken from the request.
            object.meta_mut().uid = None;
            object.meta_mut().resource_version = None;
            let created = Self::put(&mut inner, object)?;
            inner.stats.creates += 1;
            Ok(created)
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
            let mut inner = self.inner.lock();
            inner.take_failure(StoreOperation::Link, &kind_of::<K>())?;

            let mut stored: K = Self::load(&inner, &key)?;
            if stored.resource_version() != child.resource_version() {
                return Err(OperatorError::Conflict {
                    kind: kind_of::<K>(),
                    name: key.name,
                    namespace: key.namespace,
                });
            }
            if !ownership::attach(stored.meta_mut(), &kind_of::<K>(), &owner)? {
                return Ok(stored);
            }

            stored.meta_mut().resource_version = Some(inner.bump_version());
            let linked = Self::put(&mut inner, stored)?;
            inner.stats.links += 1;
            Ok(linked)
        })
    }
}
