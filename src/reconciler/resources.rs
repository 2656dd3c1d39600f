//! # Groups and users
//!
//! Natural-key partitioning shared by the group and user reconcilers.
//!
//! Records are matched on their natural key (email), never on the system id.
//! A matched record whose fingerprint differs is an update even when only the
//! id changed, so the target keeps patching the same record instead of
//! deleting and recreating it.

use std::collections::{HashMap, HashSet};

use super::{Partition, ReconcileError};
use crate::model::{Group, GroupsResult, Resource, Results, User, UsersResult};

/// Partition groups into create, update, equal and delete
///
/// * `create` - groups only in `current`
/// * `update` - groups in both whose content differs, carrying the current copy
/// * `equal` - groups in both with identical content
/// * `delete` - groups only in `previous`
pub fn groups_differences(
    current: &GroupsResult,
    previous: &GroupsResult,
) -> Result<Partition<Group>, ReconcileError> {
    partition_by_natural_key(current, previous)
}

/// Partition users into create, update, equal and delete
///
/// Same rules as [`groups_differences`]. `active` is part of the fingerprint,
/// so a deactivated user lands in `update`, not in `delete`.
pub fn users_differences(
    current: &UsersResult,
    previous: &UsersResult,
) -> Result<Partition<User>, ReconcileError> {
    partition_by_natural_key(current, previous)
}

/// Map each natural key to its position, rejecting duplicates
pub(crate) fn index_by_key<T: Resource>(
    resources: &[T],
) -> Result<HashMap<&str, usize>, ReconcileError> {
    let mut index = HashMap::with_capacity(resources.len());
    for (pos, resource) in resources.iter().enumerate() {
        let key = resource.natural_key();
        if index.insert(key, pos).is_some() {
            return Err(ReconcileError::duplicate(key, T::KIND));
        }
    }
    Ok(index)
}

fn partition_by_natural_key<T: Resource + Clone>(
    current: &Results<T>,
    previous: &Results<T>,
) -> Result<Partition<T>, ReconcileError> {
    let index = index_by_key(previous.resources())?;
    let mut consumed = vec![false; previous.count()];
    let mut seen = HashSet::with_capacity(current.count());

    let mut create = Vec::new();
    let mut update = Vec::new();
    let mut equal = Vec::new();

    for resource in current {
        let key = resource.natural_key();
        if !seen.insert(key) {
            return Err(ReconcileError::duplicate(key, T::KIND));
        }

        match index.get(key) {
            None => create.push(resource.clone()),
            Some(&pos) => {
                consumed[pos] = true;
                let known = &previous.resources()[pos];
                if known.fingerprint() == resource.fingerprint() {
                    equal.push(known.clone());
                } else {
                    update.push(resource.clone());
                }
            }
        }
    }

    let delete = previous
        .iter()
        .zip(&consumed)
        .filter(|(_, consumed)| !**consumed)
        .map(|(resource, _)| resource.clone())
        .collect();

    Ok(Partition {
        create: Results::new(create),
        update: Results::new(update),
        equal: Results::new(equal),
        delete: Results::new(delete),
    })
}
