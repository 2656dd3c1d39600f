//! # State
//!
//! The last snapshot that was successfully provisioned. It is the `previous`
//! input of the next reconciliation.
//!
//! ```json
//! {
//!   "schemaVersion": "1.0.0",
//!   "codeVersion": "0.1.0",
//!   "lastSync": "2026-10-18T10:00:00Z",
//!   "hashCode": "…",
//!   "resources": { "groups": {…}, "users": {…}, "groupsMembers": {…} }
//! }
//! ```

mod file;

pub use file::FileStateRepository;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::model::{Fingerprint, FingerprintHasher, GroupsMembersResult, GroupsResult, UsersResult};

/// The three snapshot aggregates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResources {
    #[serde(default)]
    pub groups: GroupsResult,
    #[serde(default)]
    pub users: UsersResult,
    #[serde(default)]
    pub groups_members: GroupsMembersResult,
}

impl StateResources {
    pub fn new(
        groups: GroupsResult,
        users: UsersResult,
        groups_members: GroupsMembersResult,
    ) -> Self {
        Self {
            groups,
            users,
            groups_members,
        }
    }

    /// Hash over the three aggregate fingerprints
    pub fn fingerprint(&self) -> Fingerprint {
        FingerprintHasher::new("state")
            .field("groups", self.groups.fingerprint().as_str())
            .field("users", self.users.fingerprint().as_str())
            .field("groupsMembers", self.groups_members.fingerprint().as_str())
            .finish()
    }
}

/// Persisted sync state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StateFields", rename_all = "camelCase")]
pub struct State {
    schema_version: String,
    code_version: String,
    last_sync: DateTime<Utc>,
    hash_code: Fingerprint,
    resources: StateResources,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateFields {
    #[serde(default)]
    schema_version: String,
    #[serde(default)]
    code_version: String,
    last_sync: DateTime<Utc>,
    #[serde(default)]
    resources: StateResources,
}

impl From<StateFields> for State {
    fn from(fields: StateFields) -> Self {
        let hash_code = fields.resources.fingerprint();
        Self {
            schema_version: fields.schema_version,
            code_version: fields.code_version,
            last_sync: fields.last_sync,
            hash_code,
            resources: fields.resources,
        }
    }
}

impl State {
    /// State for a snapshot that was just provisioned
    pub fn new(resources: StateResources, last_sync: DateTime<Utc>) -> Self {
        Self {
            schema_version: constants::STATE_SCHEMA_VERSION.to_string(),
            code_version: env!("CARGO_PKG_VERSION").to_string(),
            last_sync,
            hash_code: resources.fingerprint(),
            resources,
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn code_version(&self) -> &str {
        &self.code_version
    }

    pub fn last_sync(&self) -> DateTime<Utc> {
        self.last_sync
    }

    pub fn hash_code(&self) -> &Fingerprint {
        &self.hash_code
    }

    pub fn resources(&self) -> &StateResources {
        &self.resources
    }

    pub fn into_resources(self) -> StateResources {
        self.resources
    }
}

/// Where the state lives between runs
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// `None` before the first successful sync
    async fn get_state(&self) -> Result<Option<State>>;

    async fn set_state(&self, state: &State) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Group, GroupMembers, Name, User};
    use chrono::TimeZone;

    fn resources() -> StateResources {
        let group = Group::new("1", "group 1", "group.1@mail.com");
        let user = User::new("1", Name::new("user", "1"), "user 1", "user.1@mail.com", true);
        StateResources::new(
            GroupsResult::new(vec![group.clone()]),
            UsersResult::new(vec![user.clone()]),
            GroupsMembersResult::new(vec![GroupMembers::new(group, vec![user])]),
        )
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let last_sync = Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap();
        let state = State::new(resources(), last_sync);

        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["schemaVersion"], constants::STATE_SCHEMA_VERSION);
        assert_eq!(json["lastSync"], "2026-10-18T10:00:00Z");
        assert_eq!(json["hashCode"], state.hash_code().as_str());
        assert_eq!(json["resources"]["groupsMembers"]["items"], 1);
    }

    #[test]
    fn test_state_hash_is_recomputed_on_load() {
        let last_sync = Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap();
        let state = State::new(resources(), last_sync);

        let mut json = serde_json::to_value(&state).unwrap();
        json["hashCode"] = serde_json::Value::String("stale".to_string());
        let loaded: State = serde_json::from_value(json).unwrap();

        assert_eq!(loaded.hash_code(), state.hash_code());
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_state_hash_changes_with_resources() {
        let empty = StateResources::default();

        assert_ne!(empty.fingerprint(), resources().fingerprint());
    }
}
