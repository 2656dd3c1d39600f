//! # Provider Modules
//!
//! The two collaborators the sync service talks to.
//!
//! - [`IdentityProviderService`]: source of truth (Google Workspace Directory)
//! - [`ScimService`]: provisioning target (AWS SSO SCIM endpoint)
//!
//! Both speak in model aggregates; wire formats stay inside the
//! implementations.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{GroupsMembersResult, GroupsResult, UsersResult};

/// Read side: the identity provider the groups are mirrored from
#[async_trait]
pub trait IdentityProviderService: Send + Sync {
    /// Groups matching any of the filter expressions, or every group when the
    /// filter is empty. Groups matched by several expressions appear once.
    async fn get_groups(&self, filter: &[String]) -> Result<GroupsResult>;

    /// Users matching any of the filter expressions, or every user when the
    /// filter is empty
    async fn get_users(&self, filter: &[String]) -> Result<UsersResult>;

    /// Member list of each group. Members carry their id and email only.
    async fn get_groups_members(&self, groups: &GroupsResult) -> Result<GroupsMembersResult>;

    /// Full user records for the distinct members of the given groups
    async fn get_users_by_groups_members(
        &self,
        members: &GroupsMembersResult,
    ) -> Result<UsersResult>;
}

/// Write side: the SCIM target the partitions are materialized into
///
/// Records are located on the target by natural key, so the ids carried by
/// the model values are the identity provider's ids, not the target's.
#[async_trait]
pub trait ScimService: Send + Sync {
    async fn get_groups(&self) -> Result<GroupsResult>;

    async fn get_users(&self) -> Result<UsersResult>;

    /// Every user on the target, and the member list of each group that has
    /// members. Groups found through a membership but missing from `groups`
    /// are included as well.
    async fn get_users_and_groups_members(
        &self,
        groups: &GroupsResult,
    ) -> Result<(UsersResult, GroupsMembersResult)>;

    async fn create_groups(&self, groups: &GroupsResult) -> Result<()>;

    async fn update_groups(&self, groups: &GroupsResult) -> Result<()>;

    /// Missing groups are skipped
    async fn delete_groups(&self, groups: &GroupsResult) -> Result<()>;

    async fn create_users(&self, users: &UsersResult) -> Result<()>;

    async fn update_users(&self, users: &UsersResult) -> Result<()>;

    /// Missing users are skipped
    async fn delete_users(&self, users: &UsersResult) -> Result<()>;

    /// Add each listed member to its group
    async fn create_groups_members(&self, members: &GroupsMembersResult) -> Result<()>;

    /// Remove each listed member from its group
    async fn delete_groups_members(&self, members: &GroupsMembersResult) -> Result<()>;
}

pub mod aws;
pub mod google;
