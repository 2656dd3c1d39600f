//! User entity.

use serde::{Deserialize, Serialize};

use super::{EntityKind, Fingerprint, FingerprintHasher, Resource};

/// Person name parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

impl Name {
    pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            given_name: given_name.into(),
            family_name: family_name.into(),
        }
    }
}

/// A user as seen by either side of the sync
///
/// `email` is the natural key; `id` is assigned by the owning system.
/// `active` takes part in the fingerprint, so a deactivation is an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserFields", rename_all = "camelCase")]
pub struct User {
    id: String,
    name: Name,
    display_name: String,
    email: String,
    active: bool,
    hash_code: Fingerprint,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserFields {
    id: String,
    #[serde(default)]
    name: Name,
    #[serde(default)]
    display_name: String,
    email: String,
    #[serde(default)]
    active: bool,
}

impl From<UserFields> for User {
    fn from(fields: UserFields) -> Self {
        Self::new(
            fields.id,
            fields.name,
            fields.display_name,
            fields.email,
            fields.active,
        )
    }
}

impl User {
    pub fn new(
        id: impl Into<String>,
        name: Name,
        display_name: impl Into<String>,
        email: impl Into<String>,
        active: bool,
    ) -> Self {
        let id = id.into();
        let display_name = display_name.into();
        let email = email.into();
        let hash_code = FingerprintHasher::new("user")
            .field("id", &id)
            .field("givenName", &name.given_name)
            .field("familyName", &name.family_name)
            .field("displayName", &display_name)
            .field("email", &email)
            .flag("active", active)
            .finish();

        Self {
            id,
            name,
            display_name,
            email,
            active,
            hash_code,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn active(&self) -> bool {
        self.active
    }
}

impl Resource for User {
    const KIND: EntityKind = EntityKind::User;

    fn natural_key(&self) -> &str {
        &self.email
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.hash_code
    }
}
