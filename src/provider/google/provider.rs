//! [`IdentityProviderService`] over the Google Directory client.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use tracing::{debug, info_span, Instrument};

use super::responses::{DirectoryGroup, DirectoryMember, DirectoryUser};
use super::DirectoryClient;
use crate::constants::GWS_CONCURRENCY;
use crate::model::{
    Group, GroupMembers, GroupsMembersResult, GroupsResult, Name, User, UsersResult,
};
use crate::provider::IdentityProviderService;

/// Google Workspace implementation of [`IdentityProviderService`]
#[derive(Debug)]
pub struct GoogleWorkspaceProvider {
    client: DirectoryClient,
}

impl GoogleWorkspaceProvider {
    pub fn new(client: DirectoryClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DirectoryClient {
        &self.client
    }
}

#[async_trait]
impl IdentityProviderService for GoogleWorkspaceProvider {
    async fn get_groups(&self, filter: &[String]) -> Result<GroupsResult> {
        let span = info_span!("gws.groups", filter.len = filter.len());
        async move {
            let groups = if filter.is_empty() {
                self.client.list_groups(None).await?
            } else {
                let mut all = Vec::new();
                for query in filter {
                    all.extend(self.client.list_groups(Some(query)).await?);
                }
                unique_by_id(all, |g| g.id.as_str())
            };

            debug!(count = groups.len(), "Fetched Google groups");
            Ok(groups.into_iter().map(group_from_directory).collect())
        }
        .instrument(span)
        .await
    }

    async fn get_users(&self, filter: &[String]) -> Result<UsersResult> {
        let span = info_span!("gws.users", filter.len = filter.len());
        async move {
            let users = if filter.is_empty() {
                self.client.list_users(None).await?
            } else {
                let mut all = Vec::new();
                for query in filter {
                    all.extend(self.client.list_users(Some(query)).await?);
                }
                unique_by_id(all, |u| u.id.as_str())
            };

            debug!(count = users.len(), "Fetched Google users");
            Ok(users.into_iter().map(user_from_directory).collect())
        }
        .instrument(span)
        .await
    }

    async fn get_groups_members(&self, groups: &GroupsResult) -> Result<GroupsMembersResult> {
        let span = info_span!("gws.groups_members", groups = groups.count());
        async move {
            let client = &self.client;
            let result: Vec<GroupMembers> = stream::iter(groups.iter().cloned())
                .map(move |group| group_members(client, group))
                .buffered(GWS_CONCURRENCY)
                .try_collect()
                .await?;
            Ok(result.into_iter().collect())
        }
        .instrument(span)
        .await
    }

    async fn get_users_by_groups_members(
        &self,
        members: &GroupsMembersResult,
    ) -> Result<UsersResult> {
        let span = info_span!("gws.member_users", groups = members.count());
        async move {
            let ids = distinct_member_ids(members);

            let client = &self.client;
            let users: Vec<User> = stream::iter(ids)
                .map(move |id| member_details(client, id))
                .buffered(GWS_CONCURRENCY)
                .try_collect()
                .await?;

            debug!(count = users.len(), "Fetched Google member users");
            Ok(users.into_iter().collect())
        }
        .instrument(span)
        .await
    }
}

async fn group_members(client: &DirectoryClient, group: Group) -> Result<GroupMembers> {
    let members = client.list_group_members(group.id()).await?;
    let users: Vec<User> = members
        .iter()
        .filter(|m| m.is_user())
        .map(member_user)
        .collect();
    debug!(
        group.email = group.email(),
        listed = members.len(),
        users = users.len(),
        "Fetched Google group members"
    );
    Ok(GroupMembers::new(group, users))
}

async fn member_details(client: &DirectoryClient, id: String) -> Result<User> {
    let user = client.get_user(&id).await?;
    Ok(user_from_directory(user))
}

/// Member ids across all groups, first occurrence wins
fn distinct_member_ids(members: &GroupsMembersResult) -> Vec<String> {
    let mut seen = HashSet::new();
    members
        .iter()
        .flat_map(GroupMembers::members)
        .map(User::id)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Keep the first occurrence of each id, in listing order
fn unique_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect()
}

pub(crate) fn group_from_directory(group: DirectoryGroup) -> Group {
    Group::new(group.id, group.name, group.email)
}

pub(crate) fn user_from_directory(user: DirectoryUser) -> User {
    let display_name = if user.name.full_name.is_empty() {
        format!("{} {}", user.name.given_name, user.name.family_name)
            .trim()
            .to_string()
    } else {
        user.name.full_name
    };

    User::new(
        user.id,
        Name::new(user.name.given_name, user.name.family_name),
        display_name,
        user.primary_email,
        !user.suspended,
    )
}

/// Member entries carry only id and email until enriched
fn member_user(member: &DirectoryMember) -> User {
    User::new(
        member.id.clone(),
        Name::default(),
        "",
        member.email.clone(),
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::google::responses::UserName;

    fn directory_user(id: &str, full_name: &str, suspended: bool) -> DirectoryUser {
        DirectoryUser {
            id: id.to_string(),
            primary_email: format!("user.{id}@mail.com"),
            name: UserName {
                given_name: "user".to_string(),
                family_name: id.to_string(),
                full_name: full_name.to_string(),
            },
            suspended,
        }
    }

    #[test]
    fn test_user_from_directory_maps_suspended_to_inactive() {
        let user = user_from_directory(directory_user("1", "user 1", true));

        assert_eq!(user.id(), "1");
        assert_eq!(user.email(), "user.1@mail.com");
        assert_eq!(user.display_name(), "user 1");
        assert!(!user.active());
    }

    #[test]
    fn test_user_from_directory_builds_display_name_when_missing() {
        let user = user_from_directory(directory_user("2", "", false));

        assert_eq!(user.display_name(), "user 2");
        assert_eq!(user.name().given_name, "user");
        assert!(user.active());
    }

    #[test]
    fn test_group_from_directory() {
        let group = group_from_directory(DirectoryGroup {
            id: "g1".to_string(),
            email: "group.1@mail.com".to_string(),
            name: "group 1".to_string(),
            description: String::new(),
        });

        assert_eq!(group.id(), "g1");
        assert_eq!(group.name(), "group 1");
        assert_eq!(group.email(), "group.1@mail.com");
    }

    #[test]
    fn test_unique_by_id_keeps_first_occurrence() {
        let items = vec![("1", "a"), ("2", "b"), ("1", "c")];
        let unique = unique_by_id(items, |item| item.0);

        assert_eq!(unique, vec![("1", "a"), ("2", "b")]);
    }

    #[test]
    fn test_member_user_is_skeletal() {
        let member = DirectoryMember {
            id: "7".to_string(),
            email: "user.7@mail.com".to_string(),
            kind: "USER".to_string(),
            ..Default::default()
        };
        let user = member_user(&member);

        assert_eq!(user.id(), "7");
        assert_eq!(user.email(), "user.7@mail.com");
        assert!(user.display_name().is_empty());
    }

    #[test]
    fn test_distinct_member_ids_in_first_seen_order() {
        let user = |id: &str| User::new(id, Name::default(), "", format!("user.{id}@mail.com"), true);
        let group = |id: &str| Group::new(id, format!("group {id}"), format!("group.{id}@mail.com"));
        let members = GroupsMembersResult::new(vec![
            GroupMembers::new(group("a"), vec![user("2"), user("1")]),
            GroupMembers::new(group("b"), vec![user("3"), user("1")]),
        ]);

        assert_eq!(distinct_member_ids(&members), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_member_fetch_futures_are_send() {
        fn assert_send<T: Send>(_: &T) {}

        let provider = GoogleWorkspaceProvider::new(DirectoryClient::with_http_client(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            zeroize::Zeroizing::new("token".to_string()),
        ));
        let groups = GroupsResult::default();
        let members = GroupsMembersResult::default();

        let fetch_members = provider.get_groups_members(&groups);
        assert_send(&fetch_members);
        let fetch_users = provider.get_users_by_groups_members(&members);
        assert_send(&fetch_users);
    }
}
