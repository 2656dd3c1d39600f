// ============================================================================
// Google Directory API Response Structures
// ============================================================================
// These structs represent the JSON payloads returned by the Admin SDK
// Directory API v1, as documented at:
// https://developers.google.com/admin-sdk/directory/reference/rest
// ============================================================================

use serde::Deserialize;

/// A page of results with an optional continuation token
pub trait Page {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

/// Group resource
///
/// API Reference: https://developers.google.com/admin-sdk/directory/reference/rest/v1/groups#Group
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryGroup {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Response of `GET /groups`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsPage {
    #[serde(default)]
    pub groups: Vec<DirectoryGroup>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl Page for GroupsPage {
    type Item = DirectoryGroup;

    fn into_parts(self) -> (Vec<DirectoryGroup>, Option<String>) {
        (self.groups, self.next_page_token)
    }
}

/// Member resource
///
/// `type` is one of `USER`, `GROUP`, `CUSTOMER` or `EXTERNAL`.
///
/// API Reference: https://developers.google.com/admin-sdk/directory/reference/rest/v1/members#Member
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMember {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
}

impl DirectoryMember {
    pub fn is_user(&self) -> bool {
        self.kind == "USER"
    }
}

/// Response of `GET /groups/{groupKey}/members`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersPage {
    #[serde(default)]
    pub members: Vec<DirectoryMember>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl Page for MembersPage {
    type Item = DirectoryMember;

    fn into_parts(self) -> (Vec<DirectoryMember>, Option<String>) {
        (self.members, self.next_page_token)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub full_name: String,
}

/// User resource
///
/// API Reference: https://developers.google.com/admin-sdk/directory/reference/rest/v1/users#User
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    #[serde(default)]
    pub primary_email: String,
    #[serde(default)]
    pub name: UserName,
    #[serde(default)]
    pub suspended: bool,
}

/// Response of `GET /users`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersPage {
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl Page for UsersPage {
    type Item = DirectoryUser;

    fn into_parts(self) -> (Vec<DirectoryUser>, Option<String>) {
        (self.users, self.next_page_token)
    }
}

/// Google API error response wrapper
///
/// API Reference: https://cloud.google.com/apis/design/errors
#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleError,
}

#[derive(Debug, Deserialize)]
pub struct GoogleError {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_page_without_groups() {
        let page: GroupsPage = serde_json::from_str(r#"{"kind":"admin#directory#groups"}"#).unwrap();
        let (groups, token) = page.into_parts();

        assert!(groups.is_empty());
        assert!(token.is_none());
    }

    #[test]
    fn test_members_page_keeps_type() {
        let page: MembersPage = serde_json::from_str(
            r#"{
                "members": [
                    {"id": "1", "email": "a@mail.com", "type": "USER", "role": "MEMBER", "status": "ACTIVE"},
                    {"id": "2", "email": "g@mail.com", "type": "GROUP", "role": "MEMBER"}
                ],
                "nextPageToken": "next"
            }"#,
        )
        .unwrap();

        assert!(page.members[0].is_user());
        assert!(!page.members[1].is_user());
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
    }

    #[test]
    fn test_user_fields() {
        let user: DirectoryUser = serde_json::from_str(
            r#"{
                "id": "1",
                "primaryEmail": "john.doe@mail.com",
                "name": {"givenName": "john", "familyName": "doe", "fullName": "john doe"},
                "suspended": true
            }"#,
        )
        .unwrap();

        assert_eq!(user.primary_email, "john.doe@mail.com");
        assert_eq!(user.name.full_name, "john doe");
        assert!(user.suspended);
    }
}
