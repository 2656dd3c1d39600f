//! # Model
//!
//! Value types shared by the reconciler, the providers and the state store.
//!
//! Every entity computes its [`Fingerprint`] at construction and never exposes
//! a way to mutate its fields, so a fingerprint always matches the content it
//! was computed from. Deserialization goes through the same constructors and
//! ignores whatever `hashCode` was stored.

mod fingerprint;
mod group;
mod members;
mod user;

pub use fingerprint::{Fingerprint, FingerprintHasher};
pub use group::Group;
pub use members::GroupMembers;
pub use user::{Name, User};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity, used in errors and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Group,
    User,
    GroupMembers,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Group => f.write_str("group"),
            EntityKind::User => f.write_str("user"),
            EntityKind::GroupMembers => f.write_str("group members"),
        }
    }
}

/// An entity the reconciler can correlate and compare
pub trait Resource {
    const KIND: EntityKind;

    /// Key used to match the same logical record across two snapshots
    fn natural_key(&self) -> &str;

    /// Content hash over every field except the hash itself
    fn fingerprint(&self) -> &Fingerprint;
}

/// A snapshot aggregate: the records of one kind plus their count and hash
///
/// `items` always equals the number of resources. The aggregate hash is
/// computed over the sorted fingerprints of the resources, so two snapshots
/// holding the same records in a different order hash the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "ResultsFields<T>",
    rename_all = "camelCase",
    bound(
        serialize = "T: Serialize",
        deserialize = "T: Deserialize<'de> + Resource"
    )
)]
pub struct Results<T> {
    items: usize,
    resources: Vec<T>,
    hash_code: Fingerprint,
}

#[derive(Deserialize)]
struct ResultsFields<T> {
    #[serde(default = "Vec::new")]
    resources: Vec<T>,
}

impl<T: Resource> From<ResultsFields<T>> for Results<T> {
    fn from(fields: ResultsFields<T>) -> Self {
        Self::new(fields.resources)
    }
}

/// Groups snapshot
pub type GroupsResult = Results<Group>;
/// Users snapshot
pub type UsersResult = Results<User>;
/// Memberships snapshot, one entry per group
pub type GroupsMembersResult = Results<GroupMembers>;

impl<T: Resource> Results<T> {
    pub fn new(resources: Vec<T>) -> Self {
        let mut fingerprints: Vec<&Fingerprint> =
            resources.iter().map(Resource::fingerprint).collect();
        fingerprints.sort();

        let hash_code = fingerprints
            .into_iter()
            .fold(FingerprintHasher::new("results"), |hasher, fp| {
                hasher.field("item", fp.as_str())
            })
            .finish();

        Self {
            items: resources.len(),
            resources,
            hash_code,
        }
    }

    /// Number of resources held
    pub fn count(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[T] {
        &self.resources
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.resources.iter()
    }

    pub fn into_resources(self) -> Vec<T> {
        self.resources
    }

    /// Aggregate hash over the contained resources
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.hash_code
    }
}

impl<T: Resource> Default for Results<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Resource> FromIterator<T> for Results<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a Results<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

impl<T> IntoIterator for Results<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_count_matches_resources() {
        let groups = GroupsResult::new(vec![
            Group::new("1", "name1", "1@mail.com"),
            Group::new("2", "name2", "2@mail.com"),
        ]);

        assert_eq!(groups.count(), 2);
        assert_eq!(groups.resources().len(), 2);
    }

    #[test]
    fn test_results_hash_ignores_order() {
        let a = GroupsResult::new(vec![
            Group::new("1", "name1", "1@mail.com"),
            Group::new("2", "name2", "2@mail.com"),
        ]);
        let b = GroupsResult::new(vec![
            Group::new("2", "name2", "2@mail.com"),
            Group::new("1", "name1", "1@mail.com"),
        ]);

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_results_hash_changes_with_content() {
        let a = GroupsResult::new(vec![Group::new("1", "name1", "1@mail.com")]);
        let b = GroupsResult::new(vec![Group::new("1", "name2", "1@mail.com")]);

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_empty_results() {
        let empty = UsersResult::default();

        assert_eq!(empty.count(), 0);
        assert!(empty.is_empty());
        assert!(!empty.fingerprint().is_empty());
    }

    #[test]
    fn test_results_deserialize_recounts() {
        let json = r#"{"items":7,"resources":[{"id":"1","name":"n","email":"e"}],"hashCode":"x"}"#;
        let groups: GroupsResult = serde_json::from_str(json).unwrap();

        assert_eq!(groups.count(), 1);
        assert_eq!(groups, GroupsResult::new(vec![Group::new("1", "n", "e")]));
    }
}
