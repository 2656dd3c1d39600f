//! Sync service: the only place where providers, reconcilers and the state
//! store meet.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

use super::{SyncOutcome, SyncReport};
use crate::model::{Group, GroupMembers, GroupsMembersResult, GroupsResult, User, UsersResult};
use crate::observability::metrics;
use crate::provider::{IdentityProviderService, ScimService};
use crate::reconciler::{
    groups_differences, members_differences, users_differences, MembersPartition, Partition,
    PartitionSummary,
};
use crate::state::{State, StateRepository, StateResources};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Directory queries selecting the groups to sync; empty means all groups
    pub groups_filter: Vec<String>,
    /// Log the plan without touching the target or the state
    pub dry_run: bool,
}

pub struct SyncService {
    idp: Arc<dyn IdentityProviderService>,
    scim: Arc<dyn ScimService>,
    state: Arc<dyn StateRepository>,
    options: SyncOptions,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SyncService {
    pub fn new(
        idp: Arc<dyn IdentityProviderService>,
        scim: Arc<dyn ScimService>,
        state: Arc<dyn StateRepository>,
        options: SyncOptions,
    ) -> Self {
        Self {
            idp,
            scim,
            state,
            options,
        }
    }

    /// Run one sync cycle and record its metrics
    pub async fn sync_groups_and_users(&self) -> Result<SyncOutcome> {
        let span = info_span!(
            "sync",
            dry_run = self.options.dry_run,
            filters = self.options.groups_filter.len()
        );
        metrics::increment_sync_runs();
        let start = Instant::now();

        let result = self.run().instrument(span).await;
        metrics::observe_sync_duration(start.elapsed().as_secs_f64());

        match &result {
            Ok(SyncOutcome::Unchanged) => metrics::increment_sync_skipped(),
            Ok(_) => metrics::set_last_success_timestamp(Utc::now().timestamp()),
            Err(e) => {
                metrics::increment_sync_errors();
                error!("Sync cycle failed: {e:#}");
            }
        }
        result
    }

    async fn run(&self) -> Result<SyncOutcome> {
        let current = self.fetch_snapshot().await?;

        let stored = self
            .state
            .get_state()
            .await
            .context("Failed to load sync state")?;

        let previous = match stored {
            Some(state) if state.hash_code() == &current.fingerprint() => {
                info!(
                    last_sync = %state.last_sync(),
                    "Identity provider unchanged since last sync, nothing to do"
                );
                return Ok(SyncOutcome::Unchanged);
            }
            Some(state) => {
                debug!(last_sync = %state.last_sync(), "Loaded previous state");
                state.into_resources()
            }
            None => {
                info!("No previous state, using the SCIM target as the baseline");
                self.target_snapshot(&current).await?
            }
        };

        let groups = groups_differences(&current.groups, &previous.groups)
            .context("Failed to reconcile groups")?;
        let users = users_differences(&current.users, &previous.users)
            .context("Failed to reconcile users")?;
        let members = members_differences(&current.groups_members, &previous.groups_members)
            .context("Failed to reconcile memberships")?;
        let members = readd_recreated_members(members, &groups, &users);

        let report = SyncReport {
            groups: groups.summary(),
            users: users.summary(),
            members: members.summary(),
        };
        log_plan(&report);
        metrics::set_partition_sizes("group", &report.groups);
        metrics::set_partition_sizes("user", &report.users);
        metrics::set_partition_sizes("member", &report.members);

        if self.options.dry_run {
            info!("Dry run, nothing was provisioned");
            return Ok(SyncOutcome::Planned(report));
        }

        self.apply(&groups, &users, &members).await?;

        self.state
            .set_state(&State::new(current, Utc::now()))
            .await
            .context("Failed to store sync state")?;
        info!("Sync cycle completed");

        Ok(SyncOutcome::Applied(report))
    }

    /// Read the identity provider and build the current snapshot
    async fn fetch_snapshot(&self) -> Result<StateResources> {
        let groups = self
            .idp
            .get_groups(&self.options.groups_filter)
            .await
            .context("Failed to get groups from the identity provider")?;
        let members = self
            .idp
            .get_groups_members(&groups)
            .await
            .context("Failed to get group members from the identity provider")?;
        let users = self
            .idp
            .get_users_by_groups_members(&members)
            .await
            .context("Failed to get member users from the identity provider")?;

        info!(
            groups = groups.count(),
            users = users.count(),
            "Fetched identity provider snapshot"
        );

        let members = with_full_users(&members, &users);
        Ok(StateResources::new(groups, users, members))
    }

    /// Read what the target holds, renamed to the identity provider ids of
    /// the natural-key matches in `current`
    ///
    /// Groups without an `externalId` were not provisioned by this sync and
    /// cannot be correlated, so they are left out.
    async fn target_snapshot(&self, current: &StateResources) -> Result<StateResources> {
        let groups: GroupsResult = self
            .scim
            .get_groups()
            .await
            .context("Failed to get groups from the SCIM target")?
            .into_resources()
            .into_iter()
            .filter(|g| !g.email().is_empty())
            .collect();
        let (users, members) = self
            .scim
            .get_users_and_groups_members(&groups)
            .await
            .context("Failed to get users and group members from the SCIM target")?;
        let members: GroupsMembersResult = members
            .into_resources()
            .into_iter()
            .filter(|entry| !entry.group().email().is_empty())
            .collect();

        info!(
            groups = groups.count(),
            users = users.count(),
            "Fetched SCIM target snapshot"
        );
        Ok(adopt_idp_ids(
            &StateResources::new(groups, users, members),
            current,
        ))
    }

    /// Provision in dependency order: records before the memberships that
    /// reference them, membership removals before the records they point to
    async fn apply(
        &self,
        groups: &Partition<Group>,
        users: &Partition<User>,
        members: &MembersPartition,
    ) -> Result<()> {
        let scim = &self.scim;

        scim.create_groups(&groups.create)
            .await
            .context("Failed to create groups")?;
        scim.update_groups(&groups.update)
            .await
            .context("Failed to update groups")?;
        scim.create_users(&users.create)
            .await
            .context("Failed to create users")?;
        scim.update_users(&users.update)
            .await
            .context("Failed to update users")?;
        scim.delete_groups_members(&members.delete)
            .await
            .context("Failed to remove group members")?;
        scim.create_groups_members(&members.create)
            .await
            .context("Failed to add group members")?;
        scim.delete_groups(&groups.delete)
            .await
            .context("Failed to delete groups")?;
        scim.delete_users(&users.delete)
            .await
            .context("Failed to delete users")?;

        Ok(())
    }
}

fn log_plan(report: &SyncReport) {
    let log = |resource: &str, summary: &PartitionSummary| {
        info!(
            resource,
            create = summary.create,
            update = summary.update,
            equal = summary.equal,
            delete = summary.delete,
            "Reconciled"
        );
    };
    log("group", &report.groups);
    log("user", &report.users);
    log("member", &report.members);
}

/// Move unchanged memberships of users and groups that are about to be
/// created into the create set
///
/// A changed email recreates the record on the target under its new natural
/// key, and the recreated record starts without memberships.
fn readd_recreated_members(
    members: MembersPartition,
    groups: &Partition<Group>,
    users: &Partition<User>,
) -> MembersPartition {
    let new_groups: HashSet<&str> = groups.create.iter().map(Group::email).collect();
    let new_users: HashSet<&str> = users.create.iter().map(User::email).collect();
    if new_groups.is_empty() && new_users.is_empty() {
        return members;
    }

    let mut create = members.create.into_resources();
    let mut equal = Vec::new();
    for entry in &members.equal {
        let (moved, kept): (Vec<&User>, Vec<&User>) =
            if new_groups.contains(entry.group().email()) {
                (entry.members().iter().collect(), Vec::new())
            } else {
                entry
                    .members()
                    .iter()
                    .partition(|user| new_users.contains(user.email()))
            };

        if !kept.is_empty() {
            equal.push(GroupMembers::new(
                entry.group().clone(),
                kept.into_iter().cloned(),
            ));
        }
        if moved.is_empty() {
            continue;
        }
        match create
            .iter_mut()
            .find(|joined| joined.group().id() == entry.group().id())
        {
            Some(joined) => {
                *joined = GroupMembers::new(
                    joined.group().clone(),
                    joined.members().iter().chain(moved).cloned(),
                );
            }
            None => create.push(GroupMembers::new(
                entry.group().clone(),
                moved.into_iter().cloned(),
            )),
        }
    }

    MembersPartition {
        create: GroupsMembersResult::new(create),
        equal: GroupsMembersResult::new(equal),
        delete: members.delete,
    }
}

/// Rename target records to the id of the identity provider record with the
/// same natural key, so they compare on content only
fn adopt_idp_ids(target: &StateResources, current: &StateResources) -> StateResources {
    let group_ids: HashMap<&str, &str> = current
        .groups
        .iter()
        .map(|g| (g.email(), g.id()))
        .collect();
    let user_ids: HashMap<&str, &str> = current
        .users
        .iter()
        .map(|u| (u.email(), u.id()))
        .collect();

    let group = |g: &Group| match group_ids.get(g.email()) {
        Some(id) => Group::new(*id, g.name(), g.email()),
        None => g.clone(),
    };
    let user = |u: &User| match user_ids.get(u.email()) {
        Some(id) => User::new(
            *id,
            u.name().clone(),
            u.display_name(),
            u.email(),
            u.active(),
        ),
        None => u.clone(),
    };

    StateResources::new(
        target.groups.iter().map(group).collect(),
        target.users.iter().map(user).collect(),
        target
            .groups_members
            .iter()
            .map(|entry| GroupMembers::new(group(entry.group()), entry.members().iter().map(user)))
            .collect(),
    )
}

/// Replace the id and email stubs in member lists with the full user records
fn with_full_users(members: &GroupsMembersResult, users: &UsersResult) -> GroupsMembersResult {
    let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id(), u)).collect();

    members
        .iter()
        .map(|entry| {
            let full = entry.members().iter().map(|member| {
                by_id
                    .get(member.id())
                    .map_or_else(|| member.clone(), |user| (*user).clone())
            });
            GroupMembers::new(entry.group().clone(), full)
        })
        .collect()
}
