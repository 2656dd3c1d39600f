//! # Memberships
//!
//! Membership is a binary relation, so there is no update bucket: a changed
//! member list shows up as members joining (`create`) and members leaving
//! (`delete`). Groups are joined on their id because by the time memberships
//! are compared the group reconciler has already correlated them.
//!
//! A group only appears in a partition when its member subset for that
//! partition is non-empty, so the same group can be in `create`, `equal` and
//! `delete` at once, each entry carrying only its own members.

use std::collections::HashSet;

use super::resources::index_by_key;
use super::{MembersPartition, ReconcileError};
use crate::model::{GroupMembers, GroupsMembersResult, Resource, User};

/// Partition per-group member lists into create, equal and delete
///
/// Entries in `create` and `equal` follow the order of `current`; entries in
/// `delete` follow the order of `previous`. Matched groups carry the current
/// group value in every partition.
///
/// A group with no members has no member subset to place, so it appears in
/// no partition. Reconciling a snapshot against itself therefore returns
/// `equal == current` minus its empty groups.
pub fn members_differences(
    current: &GroupsMembersResult,
    previous: &GroupsMembersResult,
) -> Result<MembersPartition, ReconcileError> {
    let index = index_by_key(previous.resources())?;
    // previous position -> position of the matching current entry
    let mut matched: Vec<Option<usize>> = vec![None; previous.count()];
    let mut seen = HashSet::with_capacity(current.count());

    let mut create = Vec::new();
    let mut equal = Vec::new();

    for (pos, membership) in current.iter().enumerate() {
        let group_id = membership.natural_key();
        if !seen.insert(group_id) {
            return Err(ReconcileError::duplicate(group_id, GroupMembers::KIND));
        }

        let Some(&prev_pos) = index.get(group_id) else {
            if !membership.is_empty() {
                create.push(membership.clone());
            }
            continue;
        };
        matched[prev_pos] = Some(pos);
        let known = &previous.resources()[prev_pos];

        let (kept, joined): (Vec<&User>, Vec<&User>) = membership
            .members()
            .iter()
            .partition(|user| known.contains(user.id()));

        push_subset(&mut create, membership, joined);
        push_subset(&mut equal, membership, kept);
    }

    let mut delete = Vec::new();
    for (known, matched) in previous.iter().zip(&matched) {
        match matched {
            None => {
                if !known.is_empty() {
                    delete.push(known.clone());
                }
            }
            Some(pos) => {
                let membership = &current.resources()[*pos];
                let left = known
                    .members()
                    .iter()
                    .filter(|user| !membership.contains(user.id()))
                    .collect();
                push_subset(&mut delete, membership, left);
            }
        }
    }

    Ok(MembersPartition {
        create: GroupsMembersResult::new(create),
        equal: GroupsMembersResult::new(equal),
        delete: GroupsMembersResult::new(delete),
    })
}

fn push_subset(out: &mut Vec<GroupMembers>, membership: &GroupMembers, subset: Vec<&User>) {
    if subset.is_empty() {
        return;
    }
    out.push(GroupMembers::new(
        membership.group().clone(),
        subset.into_iter().cloned(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, Group, Name};

    fn user(id: &str) -> User {
        User::new(
            id,
            Name::new(id, "user"),
            format!("user {id}"),
            format!("u.{id}@mail.com"),
            true,
        )
    }

    fn group(id: &str) -> Group {
        Group::new(id, format!("group {id}"), format!("g.{id}@mail.com"))
    }

    fn members(group_id: &str, user_ids: &[&str]) -> GroupMembers {
        GroupMembers::new(group(group_id), user_ids.iter().map(|id| user(id)))
    }

    fn result(entries: Vec<GroupMembers>) -> GroupsMembersResult {
        GroupsMembersResult::new(entries)
    }

    #[test]
    fn test_members_empty() {
        let diff = members_differences(&result(vec![]), &result(vec![])).unwrap();

        assert_eq!(diff.create.count(), 0);
        assert_eq!(diff.equal.count(), 0);
        assert_eq!(diff.delete.count(), 0);
    }

    #[test]
    fn test_members_two_equals() {
        let both = result(vec![members("1", &["1", "2"]), members("2", &["1"])]);

        let diff = members_differences(&both, &both).unwrap();

        assert!(diff.create.is_empty());
        assert!(diff.delete.is_empty());
        assert_eq!(diff.equal, both);
    }

    #[test]
    fn test_members_one_joined_one_kept() {
        let current = result(vec![members("1", &["1", "2"])]);
        let previous = result(vec![members("1", &["1"])]);

        let diff = members_differences(&current, &previous).unwrap();

        assert_eq!(diff.create, result(vec![members("1", &["2"])]));
        assert_eq!(diff.equal, result(vec![members("1", &["1"])]));
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn test_members_split_across_groups() {
        let current = result(vec![members("1", &["1", "2"]), members("2", &["1"])]);
        let previous = result(vec![members("1", &["1"]), members("2", &["1", "3"])]);

        let diff = members_differences(&current, &previous).unwrap();

        assert_eq!(diff.create, result(vec![members("1", &["2"])]));
        assert_eq!(
            diff.equal,
            result(vec![members("1", &["1"]), members("2", &["1"])])
        );
        assert_eq!(diff.delete, result(vec![members("2", &["3"])]));
    }

    #[test]
    fn test_members_new_group_goes_to_create_whole() {
        let current = result(vec![members("1", &["1", "2"])]);

        let diff = members_differences(&current, &result(vec![])).unwrap();

        assert_eq!(diff.create, current);
        assert!(diff.equal.is_empty());
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn test_members_removed_group_goes_to_delete_whole() {
        let previous = result(vec![members("1", &["1"]), members("2", &["1", "3"])]);
        let current = result(vec![members("1", &["1"])]);

        let diff = members_differences(&current, &previous).unwrap();

        assert!(diff.create.is_empty());
        assert_eq!(diff.equal, result(vec![members("1", &["1"])]));
        assert_eq!(diff.delete, result(vec![members("2", &["1", "3"])]));
    }

    #[test]
    fn test_members_group_without_members_is_absent() {
        let current = result(vec![members("1", &[])]);
        let previous = result(vec![members("1", &[]), members("2", &[])]);

        let diff = members_differences(&current, &previous).unwrap();

        assert!(diff.create.is_empty());
        assert!(diff.equal.is_empty());
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn test_members_self_reconcile_drops_only_empty_groups() {
        let snapshot = result(vec![members("1", &["a"]), members("2", &[])]);

        let diff = members_differences(&snapshot, &snapshot).unwrap();

        assert_eq!(diff.equal, result(vec![members("1", &["a"])]));
        assert!(diff.create.is_empty());
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn test_members_matched_group_uses_current_group_value() {
        let renamed = Group::new("1", "group one", "g.1@mail.com");
        let current = result(vec![GroupMembers::new(renamed.clone(), vec![user("2")])]);
        let previous = result(vec![members("1", &["1"])]);

        let diff = members_differences(&current, &previous).unwrap();

        assert_eq!(diff.create.resources()[0].group(), &renamed);
        assert_eq!(diff.delete.resources()[0].group(), &renamed);
        assert_eq!(diff.delete.resources()[0].members(), &[user("1")]);
    }

    #[test]
    fn test_members_duplicate_group_id_fails() {
        let current = result(vec![members("1", &["1"]), members("1", &["2"])]);

        let err = members_differences(&current, &result(vec![])).unwrap_err();

        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                key: "1".to_string(),
                kind: EntityKind::GroupMembers,
            }
        );
    }
}
