// ============================================================================
// AWS SSO SCIM Request Structures
// ============================================================================
// JSON payloads sent to the AWS SSO SCIM endpoint. Field names follow the
// SCIM 2.0 core schema as documented at:
// https://docs.aws.amazon.com/singlesignon/latest/developerguide/what-is-scim.html
// ============================================================================

use serde::{Deserialize, Serialize};

use super::ScimError;

/// SCIM message schema carried by every PATCH body
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Name sub-attribute of a SCIM user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub given_name: String,
}

/// Email sub-attribute of a SCIM user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub primary: bool,
}

impl Email {
    /// The single work email AWS SSO accepts
    pub fn work(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: "work".to_string(),
            primary: true,
        }
    }
}

/// Body of `POST /Users`
///
/// API Reference: https://docs.aws.amazon.com/singlesignon/latest/developerguide/createuser.html
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub user_name: String,
    pub name: Name,
    pub display_name: String,
    pub emails: Vec<Email>,
    pub active: bool,
}

impl CreateUserRequest {
    /// Check the AWS SSO field constraints and mark the email as primary
    pub fn validate(&mut self) -> Result<(), ScimError> {
        validate_user(&self.display_name, &self.name, &mut self.emails)
    }
}

/// Body of `PUT /Users/{id}`, a full replacement of the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutUserRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub user_name: String,
    pub name: Name,
    pub display_name: String,
    pub emails: Vec<Email>,
    pub active: bool,
}

impl PutUserRequest {
    pub fn validate(&mut self) -> Result<(), ScimError> {
        if self.id.is_empty() {
            return Err(ScimError::UserIdEmpty);
        }
        validate_user(&self.display_name, &self.name, &mut self.emails)
    }
}

fn validate_user(display_name: &str, name: &Name, emails: &mut [Email]) -> Result<(), ScimError> {
    if display_name.is_empty() {
        return Err(ScimError::DisplayNameEmpty);
    }
    if name.given_name.is_empty() {
        return Err(ScimError::GivenNameEmpty);
    }
    if name.family_name.is_empty() {
        return Err(ScimError::FamilyNameEmpty);
    }
    if emails.len() > 1 {
        return Err(ScimError::EmailsTooMany);
    }
    if let Some(email) = emails.first_mut() {
        email.primary = true;
    }
    Ok(())
}

/// Body of `POST /Groups`
///
/// API Reference: https://docs.aws.amazon.com/singlesignon/latest/developerguide/creategroup.html
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<(), ScimError> {
        if self.display_name.is_empty() {
            return Err(ScimError::DisplayNameEmpty);
        }
        Ok(())
    }
}

/// SCIM PATCH operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

/// One operation of a PATCH body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// A SCIM PATCH body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl Patch {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }

    /// Add the given user ids to a group's members
    pub fn add_members<'a>(user_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let members: Vec<serde_json::Value> = user_ids
            .into_iter()
            .map(|id| serde_json::json!({ "value": id }))
            .collect();
        Self::new(vec![PatchOperation {
            op: PatchOp::Add,
            path: Some("members".to_string()),
            value: Some(serde_json::Value::Array(members)),
        }])
    }

    /// Remove the given user ids from a group's members, one operation each
    pub fn remove_members<'a>(user_ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(
            user_ids
                .into_iter()
                .map(|id| PatchOperation {
                    op: PatchOp::Remove,
                    path: Some(format!("members[value eq \"{}\"]", escape_filter_value(id))),
                    value: None,
                })
                .collect(),
        )
    }

    /// Replace a single attribute
    pub fn replace(path: &str, value: impl Into<serde_json::Value>) -> Self {
        Self::new(vec![PatchOperation {
            op: PatchOp::Replace,
            path: Some(path.to_string()),
            value: Some(value.into()),
        }])
    }
}

/// `PATCH /Groups/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct PatchGroupRequest {
    pub group_id: String,
    pub patch: Patch,
}

impl PatchGroupRequest {
    pub fn validate(&self) -> Result<(), ScimError> {
        if self.group_id.is_empty() {
            return Err(ScimError::GroupIdEmpty);
        }
        if self.patch.operations.is_empty() {
            return Err(ScimError::PatchEmpty);
        }
        Ok(())
    }
}

/// `PATCH /Users/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct PatchUserRequest {
    pub user_id: String,
    pub patch: Patch,
}

impl PatchUserRequest {
    pub fn validate(&self) -> Result<(), ScimError> {
        if self.user_id.is_empty() {
            return Err(ScimError::UserIdEmpty);
        }
        if self.patch.operations.is_empty() {
            return Err(ScimError::PatchEmpty);
        }
        Ok(())
    }
}

/// Escape a value embedded in a quoted SCIM filter string
pub fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
