//! Group membership entity.

use serde::{Deserialize, Serialize};

use super::{EntityKind, Fingerprint, FingerprintHasher, Group, Resource, User};

/// The full member list known for one group
///
/// Members form an ordered set keyed by user id: construction sorts them by
/// id and keeps the first occurrence of a repeated id. The fingerprint covers
/// the group and the member id set, so the order members were listed in does
/// not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GroupMembersFields", rename_all = "camelCase")]
pub struct GroupMembers {
    items: usize,
    group: Group,
    resources: Vec<User>,
    hash_code: Fingerprint,
}

#[derive(Deserialize)]
struct GroupMembersFields {
    group: Group,
    #[serde(default)]
    resources: Vec<User>,
}

impl From<GroupMembersFields> for GroupMembers {
    fn from(fields: GroupMembersFields) -> Self {
        Self::new(fields.group, fields.resources)
    }
}

impl GroupMembers {
    pub fn new(group: Group, members: impl IntoIterator<Item = User>) -> Self {
        let mut resources: Vec<User> = members.into_iter().collect();
        // stable sort keeps the first of any repeated id at the front
        resources.sort_by(|a, b| a.id().cmp(b.id()));
        resources.dedup_by(|later, earlier| later.id() == earlier.id());

        let hash_code = resources
            .iter()
            .fold(
                FingerprintHasher::new("groupMembers").field("group", group.fingerprint().as_str()),
                |hasher, user| hasher.field("member", user.id()),
            )
            .finish();

        Self {
            items: resources.len(),
            group,
            resources,
            hash_code,
        }
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Members ordered by user id
    pub fn members(&self) -> &[User] {
        &self.resources
    }

    pub fn count(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Check membership by user id
    pub fn contains(&self, user_id: &str) -> bool {
        self.resources
            .binary_search_by(|user| user.id().cmp(user_id))
            .is_ok()
    }
}

impl Resource for GroupMembers {
    const KIND: EntityKind = EntityKind::GroupMembers;

    /// Memberships are joined on the group id, not on a natural key: by the
    /// time memberships are compared, groups are already correlated.
    fn natural_key(&self) -> &str {
        self.group.id()
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.hash_code
    }
}
