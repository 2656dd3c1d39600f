//! [`ScimService`] over the AWS SSO SCIM client.
//!
//! Model values carry identity provider ids, so every write first resolves
//! the target record by natural key: groups by `externalId` (the group
//! email), users by `userName` (the user email).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use super::requests::{
    CreateGroupRequest, CreateUserRequest, Email, Name as ScimName, Patch, PatchGroupRequest,
    PutUserRequest,
};
use super::responses::{GroupResponse, UserResponse};
use super::{AwsScimClient, ScimError};
use crate::model::{
    Group, GroupMembers, GroupsMembersResult, GroupsResult, Name, User, UsersResult,
};
use crate::observability::metrics;
use crate::provider::ScimService;

/// AWS SSO implementation of [`ScimService`]
#[derive(Debug)]
pub struct AwsScimProvider {
    client: AwsScimClient,
}

impl AwsScimProvider {
    pub fn new(client: AwsScimClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AwsScimClient {
        &self.client
    }

    async fn find_group(&self, group: &Group) -> Result<Option<GroupResponse>> {
        self.client
            .find_group_by_external_id(group.email())
            .await
            .with_context(|| format!("Failed to look up SCIM group {}", group.email()))
    }

    async fn group_id(&self, group: &Group) -> Result<Option<String>> {
        Ok(self.find_group(group).await?.map(|g| g.id))
    }

    async fn user_id(&self, user: &User) -> Result<Option<String>> {
        let found = self
            .client
            .find_user_by_user_name(user.email())
            .await
            .with_context(|| format!("Failed to look up SCIM user {}", user.email()))?;
        Ok(found.map(|u| u.id))
    }

    async fn create_group(&self, group: &Group) -> Result<()> {
        let request = create_group_request(group);
        match self.client.create_group(&request).await {
            Ok(created) => {
                debug!(group.email = group.email(), scim.id = %created.id, "Created SCIM group");
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                info!(
                    group.email = group.email(),
                    "SCIM group already exists, updating it instead"
                );
                self.update_group(group).await
            }
            Err(e) => {
                Err(e).with_context(|| format!("Failed to create SCIM group {}", group.email()))
            }
        }
    }

    async fn update_group(&self, group: &Group) -> Result<()> {
        let Some(existing) = self.find_group(group).await? else {
            info!(
                group.email = group.email(),
                "SCIM group not found for update, creating it"
            );
            let request = create_group_request(group);
            self.client
                .create_group(&request)
                .await
                .with_context(|| format!("Failed to create SCIM group {}", group.email()))?;
            return Ok(());
        };

        // displayName is the only attribute the target stores besides the
        // natural key, so an identity provider id change has nothing to send
        if existing.display_name == group.name() {
            debug!(group.email = group.email(), "SCIM group already up to date");
            return Ok(());
        }

        let request = PatchGroupRequest {
            group_id: existing.id,
            patch: Patch::replace("displayName", group.name()),
        };
        self.client
            .patch_group(&request)
            .await
            .with_context(|| format!("Failed to update SCIM group {}", group.email()))
    }

    async fn delete_group(&self, group: &Group) -> Result<()> {
        let Some(id) = self.group_id(group).await? else {
            debug!(group.email = group.email(), "SCIM group already gone");
            return Ok(());
        };
        ignore_not_found(self.client.delete_group(&id).await)
            .with_context(|| format!("Failed to delete SCIM group {}", group.email()))
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        match self.client.create_user(create_user_request(user)).await {
            Ok(created) => {
                debug!(user.email = user.email(), scim.id = %created.id, "Created SCIM user");
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                info!(
                    user.email = user.email(),
                    "SCIM user already exists, updating it instead"
                );
                self.update_user(user).await
            }
            Err(e) => Err(e).with_context(|| format!("Failed to create SCIM user {}", user.email())),
        }
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let Some(id) = self.user_id(user).await? else {
            info!(user.email = user.email(), "SCIM user not found for update, creating it");
            self.client
                .create_user(create_user_request(user))
                .await
                .with_context(|| format!("Failed to create SCIM user {}", user.email()))?;
            return Ok(());
        };

        self.client
            .put_user(put_user_request(id, user))
            .await
            .with_context(|| format!("Failed to update SCIM user {}", user.email()))?;
        Ok(())
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        let Some(id) = self.user_id(user).await? else {
            debug!(user.email = user.email(), "SCIM user already gone");
            return Ok(());
        };
        ignore_not_found(self.client.delete_user(&id).await)
            .with_context(|| format!("Failed to delete SCIM user {}", user.email()))
    }

    async fn add_members(&self, membership: &GroupMembers) -> Result<()> {
        let group = membership.group();
        let group_id = self.group_id(group).await?.ok_or_else(|| {
            anyhow!(
                "SCIM group {} not found while adding members",
                group.email()
            )
        })?;

        let mut user_ids = Vec::with_capacity(membership.count());
        for user in membership.members() {
            let id = self.user_id(user).await?.ok_or_else(|| {
                anyhow!(
                    "SCIM user {} not found while adding it to group {}",
                    user.email(),
                    group.email()
                )
            })?;
            user_ids.push(id);
        }

        let request = PatchGroupRequest {
            group_id,
            patch: Patch::add_members(user_ids.iter().map(String::as_str)),
        };
        self.client
            .patch_group(&request)
            .await
            .with_context(|| format!("Failed to add members to SCIM group {}", group.email()))
    }

    async fn remove_members(&self, membership: &GroupMembers) -> Result<()> {
        let group = membership.group();
        let Some(group_id) = self.group_id(group).await? else {
            debug!(group.email = group.email(), "SCIM group gone, nothing to remove");
            return Ok(());
        };

        let mut user_ids = Vec::with_capacity(membership.count());
        for user in membership.members() {
            match self.user_id(user).await? {
                Some(id) => user_ids.push(id),
                None => debug!(user.email = user.email(), "SCIM user gone, skipping removal"),
            }
        }
        if user_ids.is_empty() {
            return Ok(());
        }

        let request = PatchGroupRequest {
            group_id,
            patch: Patch::remove_members(user_ids.iter().map(String::as_str)),
        };
        self.client
            .patch_group(&request)
            .await
            .with_context(|| format!("Failed to remove members from SCIM group {}", group.email()))
    }
}

/// Run `op` for each item, recording operation metrics
async fn for_each<'a, T, F, Fut>(
    resource: &'static str,
    operation: &'static str,
    items: impl IntoIterator<Item = &'a T>,
    mut op: F,
) -> Result<()>
where
    T: 'a,
    F: FnMut(&'a T) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let span = info_span!("scim.apply", resource, operation);
    async move {
        let start = Instant::now();
        let mut done = 0usize;
        for item in items {
            if let Err(e) = op(item).await {
                metrics::increment_scim_operation_errors(resource, operation);
                metrics::record_scim_operations(resource, operation, done);
                return Err(e);
            }
            done += 1;
        }
        metrics::record_scim_operations(resource, operation, done);
        debug!(
            count = done,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "SCIM operations applied"
        );
        Ok(())
    }
    .instrument(span)
    .await
}

fn ignore_not_found(result: Result<(), ScimError>) -> Result<(), ScimError> {
    match result {
        Err(e) if e.is_not_found() => {
            warn!("SCIM resource disappeared before delete");
            Ok(())
        }
        other => other,
    }
}

fn create_group_request(group: &Group) -> CreateGroupRequest {
    CreateGroupRequest {
        display_name: group.name().to_string(),
        external_id: Some(group.email().to_string()),
    }
}

fn scim_name(user: &User) -> ScimName {
    ScimName {
        formatted: None,
        family_name: user.name().family_name.clone(),
        given_name: user.name().given_name.clone(),
    }
}

fn create_user_request(user: &User) -> CreateUserRequest {
    CreateUserRequest {
        external_id: Some(user.id().to_string()),
        user_name: user.email().to_string(),
        name: scim_name(user),
        display_name: user.display_name().to_string(),
        emails: vec![Email::work(user.email())],
        active: user.active(),
    }
}

fn put_user_request(id: String, user: &User) -> PutUserRequest {
    PutUserRequest {
        id,
        external_id: Some(user.id().to_string()),
        user_name: user.email().to_string(),
        name: scim_name(user),
        display_name: user.display_name().to_string(),
        emails: vec![Email::work(user.email())],
        active: user.active(),
    }
}

fn group_from_response(group: GroupResponse) -> Group {
    Group::new(
        group.id,
        group.display_name,
        group.external_id.unwrap_or_default(),
    )
}

fn user_from_response(user: UserResponse) -> User {
    let email = user.email().to_string();
    User::new(
        user.id,
        Name::new(user.name.given_name, user.name.family_name),
        user.display_name,
        email,
        user.active,
    )
}

#[async_trait]
impl ScimService for AwsScimProvider {
    async fn get_groups(&self) -> Result<GroupsResult> {
        let groups = self
            .client
            .list_all_groups(None)
            .await
            .context("Failed to list SCIM groups")?;
        Ok(groups.into_iter().map(group_from_response).collect())
    }

    async fn get_users(&self) -> Result<UsersResult> {
        let users = self
            .client
            .list_all_users(None)
            .await
            .context("Failed to list SCIM users")?;
        Ok(users.into_iter().map(user_from_response).collect())
    }

    async fn get_users_and_groups_members(
        &self,
        groups: &GroupsResult,
    ) -> Result<(UsersResult, GroupsMembersResult)> {
        let span = info_span!("scim.users_and_members", groups = groups.count());
        async move {
            let users: Vec<User> = self
                .client
                .list_all_users(None)
                .await
                .context("Failed to list SCIM users")?
                .into_iter()
                .map(user_from_response)
                .collect();

            // the SCIM API has no member listing, so ask per user
            let mut entries: Vec<(Group, Vec<User>)> =
                groups.iter().map(|g| (g.clone(), Vec::new())).collect();
            let mut index: HashMap<String, usize> = groups
                .iter()
                .enumerate()
                .map(|(pos, g)| (g.id().to_string(), pos))
                .collect();

            for user in &users {
                let found = self
                    .client
                    .list_groups_with_member(user.id())
                    .await
                    .with_context(|| format!("Failed to list SCIM groups of {}", user.email()))?;
                for group in found {
                    let pos = match index.get(&group.id) {
                        Some(&pos) => pos,
                        None => {
                            index.insert(group.id.clone(), entries.len());
                            entries.push((group_from_response(group), Vec::new()));
                            entries.len() - 1
                        }
                    };
                    entries[pos].1.push(user.clone());
                }
            }

            let members: GroupsMembersResult = entries
                .into_iter()
                .filter(|(_, users)| !users.is_empty())
                .map(|(group, users)| GroupMembers::new(group, users))
                .collect();
            debug!(
                users = users.len(),
                groups = members.count(),
                "Fetched SCIM users and group members"
            );
            Ok((users.into_iter().collect(), members))
        }
        .instrument(span)
        .await
    }

    async fn create_groups(&self, groups: &GroupsResult) -> Result<()> {
        for_each("group", "create", groups, |g| self.create_group(g)).await
    }

    async fn update_groups(&self, groups: &GroupsResult) -> Result<()> {
        for_each("group", "update", groups, |g| self.update_group(g)).await
    }

    async fn delete_groups(&self, groups: &GroupsResult) -> Result<()> {
        for_each("group", "delete", groups, |g| self.delete_group(g)).await
    }

    async fn create_users(&self, users: &UsersResult) -> Result<()> {
        for_each("user", "create", users, |u| self.create_user(u)).await
    }

    async fn update_users(&self, users: &UsersResult) -> Result<()> {
        for_each("user", "update", users, |u| self.update_user(u)).await
    }

    async fn delete_users(&self, users: &UsersResult) -> Result<()> {
        for_each("user", "delete", users, |u| self.delete_user(u)).await
    }

    async fn create_groups_members(&self, members: &GroupsMembersResult) -> Result<()> {
        for_each("member", "create", members, |m| self.add_members(m)).await
    }

    async fn delete_groups_members(&self, members: &GroupsMembersResult) -> Result<()> {
        for_each("member", "delete", members, |m| self.remove_members(m)).await
    }
}
