// ============================================================================
// AWS SSO SCIM Response Structures
// ============================================================================

use serde::{Deserialize, Serialize};

use super::requests::{Email, Name};

/// Resource metadata returned with every user and group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub last_modified: String,
}

/// A user as returned by `GET`, `POST` and `PUT /Users`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub name: Name,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub emails: Vec<Email>,
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl UserResponse {
    /// The primary email, else the first one, else the user name
    pub fn email(&self) -> &str {
        self.emails
            .iter()
            .find(|email| email.primary)
            .or_else(|| self.emails.first())
            .map_or(self.user_name.as_str(), |email| email.value.as_str())
    }
}

pub type CreateUserResponse = UserResponse;
pub type PutUserResponse = UserResponse;

/// Member reference inside a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub value: String,
}

/// A group as returned by `GET` and `POST /Groups`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

pub type CreateGroupResponse = GroupResponse;

/// One page of `GET /Users`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub total_results: usize,
    #[serde(default)]
    pub items_per_page: usize,
    #[serde(default)]
    pub start_index: usize,
    #[serde(rename = "Resources", default)]
    pub resources: Vec<UserResponse>,
}

/// One page of `GET /Groups`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupsResponse {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub total_results: usize,
    #[serde(default)]
    pub items_per_page: usize,
    #[serde(default)]
    pub start_index: usize,
    #[serde(rename = "Resources", default)]
    pub resources: Vec<GroupResponse>,
}

/// SCIM `ServiceProviderConfig` (RFC 7643 section 5)
///
/// API Reference: https://docs.aws.amazon.com/singlesignon/latest/developerguide/serviceproviderconfig.html
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub documentation_uri: String,
    #[serde(default)]
    pub patch: FeatureSupport,
    #[serde(default)]
    pub bulk: BulkSupport,
    #[serde(default)]
    pub filter: FilterSupport,
    #[serde(default)]
    pub change_password: FeatureSupport,
    #[serde(default)]
    pub sort: FeatureSupport,
    #[serde(default)]
    pub etag: FeatureSupport,
    #[serde(default)]
    pub authentication_schemes: Vec<AuthenticationScheme>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSupport {
    #[serde(default)]
    pub supported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSupport {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub max_operations: i64,
    #[serde(default)]
    pub max_payload_size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSupport {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub max_results: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationScheme {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub spec_uri: String,
    #[serde(default)]
    pub documentation_uri: String,
    #[serde(default)]
    pub primary: bool,
}

/// SCIM error body
///
/// AWS sends `status` as a string; other SCIM servers send a number.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub exception_request_id: Option<String>,
    #[serde(default)]
    pub time_stamp: Option<String>,
}
