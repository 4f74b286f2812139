//! Owner references binding child resources to their Database.
//!
//! The garbage collector deletes children whose controller reference points
//! at a deleted Database. These helpers only build and place the reference;
//! persisting it is the job of [`crate::store::ObjectStore::link_for_cascade_deletion`].

use crate::crd::Database;
use crate::error::{OperatorError, OperatorResult};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;

/// Build the controller owner reference pointing at `database`.
///
/// The Database must have been read back from the store: a reference
/// without a `uid` would never match the owner.
pub fn controller_reference(database: &Database) -> OperatorResult<OwnerReference> {
    if database.metadata.uid.is_none() {
        return Err(OperatorError::MissingObjectKey(".metadata.uid"));
    }
    let reference = database
        .controller_owner_ref(&())
        .ok_or(OperatorError::MissingObjectKey(".metadata.name"))?;
    Ok(OwnerReference {
        block_owner_deletion: Some(true),
        ..reference
    })
}

/// Whether `meta` already carries `owner` as its controller reference.
///
/// A plain reference to the same owner does not count: the runtime only
/// maps child events back to the Database through controller references.
pub fn is_owned_by(meta: &ObjectMeta, owner: &OwnerReference) -> bool {
    meta.owner_references
        .iter()
        .flatten()
        .any(|existing| existing.uid == owner.uid && existing.controller == owner.controller)
}

/// Place `owner` on `meta`.
///
/// Returns `Ok(false)` when the reference is already present, so callers
/// can skip the write. A reference to the same owner that is not marked as
/// controller is replaced in place. Fails when a different controller owns
/// the object.
pub fn attach(meta: &mut ObjectMeta, kind: &str, owner: &OwnerReference) -> OperatorResult<bool> {
    if is_owned_by(meta, owner) {
        return Ok(false);
    }

    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    let competing = refs.iter().find(|r| {
        owner.controller == Some(true) && r.controller == Some(true) && r.uid != owner.uid
    });
    if let Some(other) = competing {
        return Err(OperatorError::AlreadyOwned {
            kind: kind.to_string(),
            name: meta.name.clone().unwrap_or_default(),
            owner_kind: other.kind.clone(),
            owner_name: other.name.clone(),
        });
    }

    match refs.iter_mut().find(|r| r.uid == owner.uid) {
        Some(existing) => *existing = owner.clone(),
        None => refs.push(owner.clone()),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::DatabaseSpec;

    fn owned_database(name: &str, uid: &str) -> Database {
        let mut db = Database::new(
            name,
            DatabaseSpec {
                container_image: "postgres".to_string(),
            },
        );
        db.metadata.namespace = Some("default".to_string());
        db.metadata.uid = Some(uid.to_string());
        db
    }

    fn child_meta() -> ObjectMeta {
        ObjectMeta {
            name: Some("db1-postgres".to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn reference_targets_database() {
        let owner = controller_reference(&owned_database("db1", "uid-1")).unwrap();
        assert_eq!(owner.kind, "Database");
        assert_eq!(owner.api_version, "db.kubepostgres.dev/v1alpha1");
        assert_eq!(owner.name, "db1");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(owner.block_owner_deletion, Some(true));
    }

    #[test]
    fn reference_requires_uid() {
        let mut db = owned_database("db1", "uid-1");
        db.metadata.uid = None;
        assert!(matches!(
            controller_reference(&db),
            Err(OperatorError::MissingObjectKey(".metadata.uid"))
        ));
    }

    #[test]
    fn attach_is_idempotent() {
        let owner = controller_reference(&owned_database("db1", "uid-1")).unwrap();
        let mut meta = child_meta();

        assert!(attach(&mut meta, "Service", &owner).unwrap());
        assert!(!attach(&mut meta, "Service", &owner).unwrap());
        assert_eq!(meta.owner_references.as_ref().map(Vec::len), Some(1));
        assert!(is_owned_by(&meta, &owner));
    }

    #[test]
    fn attach_keeps_non_controller_references() {
        let owner = controller_reference(&owned_database("db1", "uid-1")).unwrap();
        let mut meta = child_meta();
        meta.owner_references = Some(vec![OwnerReference {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            name: "extra".to_string(),
            uid: "uid-extra".to_string(),
            ..Default::default()
        }]);

        assert!(attach(&mut meta, "Service", &owner).unwrap());
        assert_eq!(meta.owner_references.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn attach_promotes_plain_reference_to_controller() {
        let owner = controller_reference(&owned_database("db1", "uid-1")).unwrap();
        let mut meta = child_meta();
        meta.owner_references = Some(vec![OwnerReference {
            controller: None,
            block_owner_deletion: None,
            ..owner.clone()
        }]);
        assert!(!is_owned_by(&meta, &owner));

        assert!(attach(&mut meta, "StatefulSet", &owner).unwrap());
        assert_eq!(meta.owner_references, Some(vec![owner.clone()]));
        assert!(!attach(&mut meta, "StatefulSet", &owner).unwrap());
    }

    #[test]
    fn attach_rejects_second_controller() {
        let first = controller_reference(&owned_database("db1", "uid-1")).unwrap();
        let second = controller_reference(&owned_database("other", "uid-2")).unwrap();
        let mut meta = child_meta();
        attach(&mut meta, "StatefulSet", &first).unwrap();

        let err = attach(&mut meta, "StatefulSet", &second).unwrap_err();
        assert!(matches!(
            err,
            OperatorError::AlreadyOwned { ref owner_name, .. } if owner_name == "db1"
        ));
        assert!(!is_owned_by(&meta, &second));
    }
}
