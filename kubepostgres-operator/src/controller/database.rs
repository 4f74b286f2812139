//! Database controller.
//!
//! Reconciles Database resources into a PostgreSQL StatefulSet and Service,
//! each owned by the Database so they are garbage collected with it.

use super::{ControllerContext, ReconcileAction};
use crate::cancel::Cancellation;
use crate::crd::Database;
use crate::error::{OperatorError, OperatorResult};
use crate::ownership;
use crate::resources;
use crate::store::{ObjectKey, ObjectStore, StoredObject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::sync::Arc;

/// Controller for Database resources.
pub struct DatabaseController<S> {
    store: Arc<S>,
    cancellation: Cancellation,
}

impl<S: ObjectStore> DatabaseController<S> {
    /// Create a new database controller.
    pub fn new(store: Arc<S>, cancellation: Cancellation) -> Self {
        Self {
            store,
            cancellation,
        }
    }

    /// Reconcile the Database at `key`.
    ///
    /// Always re-reads the Database, then for the StatefulSet and the
    /// Service:
    /// 1. Builds the desired object from the spec
    /// 2. Creates it if absent (existing objects are never updated)
    /// 3. Links it to the Database for cascade deletion
    ///
    /// A Database that no longer exists ends the run without error; its
    /// children are left to the garbage collector. Every other failure is
    /// returned for the caller to retry.
    pub async fn reconcile(&self, key: &ObjectKey) -> OperatorResult<ReconcileAction> {
        tracing::info!(database = %key, "Reconciling Database");

        let database = match self.cancellation.guard(self.store.get::<Database>(key)).await {
            Ok(database) => database,
            Err(e) if e.is_not_found() => {
                tracing::info!(database = %key, "Database no longer exists, nothing to do");
                return Ok(ReconcileAction::Done);
            }
            Err(e) => {
                tracing::error!(database = %key, error = %e, "Unable to fetch Database");
                return Err(e);
            }
        };
        tracing::debug!(
            database = %key,
            image = %database.spec.container_image,
            "Fetched Database"
        );

        let owner = ownership::controller_reference(&database)?;

        let statefulset = resources::build_statefulset(&database)?;
        self.ensure_owned(statefulset, &owner).await?;

        let service = resources::build_service(&database)?;
        self.ensure_owned(service, &owner).await?;

        tracing::debug!(database = %key, "Database reconciled");
        Ok(ReconcileAction::Done)
    }

    /// Ensure `desired` exists and is controlled by `owner`.
    ///
    /// New objects are created with the reference already in place. Objects
    /// found in the store are left as they are apart from the reference,
    /// which is added if an earlier run stopped before linking.
    async fn ensure_owned<K: StoredObject>(
        &self,
        mut desired: K,
        owner: &OwnerReference,
    ) -> OperatorResult<K> {
        let kind = K::kind(&());
        let key = ObjectKey::for_resource(&desired)?;

        let current = match self.cancellation.guard(self.store.get::<K>(&key)).await {
            Ok(existing) => {
                tracing::debug!(kind = %kind, name = %key, "Already exists, not updating");
                existing
            }
            Err(e) if e.is_not_found() => {
                ownership::attach(desired.meta_mut(), &kind, owner)?;
                tracing::info!(kind = %kind, name = %key, "Creating");
                return match self.cancellation.guard(self.store.create(&desired)).await {
                    Err(e) if e.is_already_exists() => {
                        tracing::warn!(
                            kind = %kind,
                            name = %key,
                            "Created concurrently by another client, linking on next run"
                        );
                        Err(e)
                    }
                    result => result,
                };
            }
            Err(e) => return Err(e),
        };

        if ownership::is_owned_by(current.meta(), owner) {
            return Ok(current);
        }

        tracing::info!(
            kind = %kind,
            name = %key,
            owner = %owner.name,
            "Linking to Database for cascade deletion"
        );
        self.cancellation
            .guard(self.store.link_for_cascade_deletion(&current, owner))
            .await
    }
}

/// Reconcile entry point for [`kube::runtime::Controller::run`].
///
/// The delivered object only identifies the Database; current state is
/// always re-read from the store.
pub async fn reconcile<S: ObjectStore>(
    database: Arc<Database>,
    ctx: Arc<ControllerContext<S>>,
) -> OperatorResult<Action> {
    let key = ObjectKey::for_resource(database.as_ref())?;
    ctx.controller.reconcile(&key).await.map(Action::from)
}

/// Handle errors during reconciliation.
pub fn error_policy<S>(
    database: Arc<Database>,
    error: &OperatorError,
    ctx: Arc<ControllerContext<S>>,
) -> Action {
    tracing::error!(
        database = %database.name_any(),
        error = %error,
        "Reconciliation error"
    );
    Action::requeue(ctx.error_requeue)
}
