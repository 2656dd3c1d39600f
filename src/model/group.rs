//! Group entity.

use serde::{Deserialize, Serialize};

use super::{EntityKind, Fingerprint, FingerprintHasher, Resource};

/// A group as seen by either side of the sync
///
/// `id` is assigned by the system that owns the record and differs between the
/// identity provider and the SCIM target. `email` is the natural key used to
/// correlate the same logical group across both systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GroupFields")]
pub struct Group {
    id: String,
    name: String,
    email: String,
    #[serde(rename = "hashCode")]
    hash_code: Fingerprint,
}

/// Persisted shape of a group; any stored hash is recomputed on load
#[derive(Deserialize)]
struct GroupFields {
    id: String,
    name: String,
    #[serde(default)]
    email: String,
}

impl From<GroupFields> for Group {
    fn from(fields: GroupFields) -> Self {
        Self::new(fields.id, fields.name, fields.email)
    }
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        let email = email.into();
        let hash_code = FingerprintHasher::new("group")
            .field("id", &id)
            .field("name", &name)
            .field("email", &email)
            .finish();

        Self {
            id,
            name,
            email,
            hash_code,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl Resource for Group {
    const KIND: EntityKind = EntityKind::Group;

    fn natural_key(&self) -> &str {
        &self.email
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.hash_code
    }
}
