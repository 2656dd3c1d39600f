//! Sync service tests against in-memory providers and state

mod common;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use idp_scim_sync::model::{
    Group, GroupMembers, GroupsMembersResult, GroupsResult, Name, User, UsersResult,
};
use idp_scim_sync::provider::{IdentityProviderService, ScimService};
use idp_scim_sync::reconciler::{PartitionSummary, ReconcileError};
use idp_scim_sync::state::{State, StateRepository, StateResources};
use idp_scim_sync::sync::{SyncOptions, SyncOutcome, SyncService};

use common::{group, members, user};

#[derive(Default)]
struct FakeDirectory {
    groups: Mutex<Vec<Group>>,
    members: Mutex<Vec<GroupMembers>>,
    users: Mutex<Vec<User>>,
}

impl FakeDirectory {
    fn set(&self, groups: Vec<Group>, members: Vec<GroupMembers>, users: Vec<User>) {
        *self.groups.lock().unwrap() = groups;
        *self.members.lock().unwrap() = members;
        *self.users.lock().unwrap() = users;
    }
}

#[async_trait]
impl IdentityProviderService for FakeDirectory {
    async fn get_groups(&self, _filter: &[String]) -> Result<GroupsResult> {
        Ok(GroupsResult::new(self.groups.lock().unwrap().clone()))
    }

    async fn get_users(&self, _filter: &[String]) -> Result<UsersResult> {
        Ok(UsersResult::new(self.users.lock().unwrap().clone()))
    }

    async fn get_groups_members(&self, _groups: &GroupsResult) -> Result<GroupsMembersResult> {
        Ok(GroupsMembersResult::new(self.members.lock().unwrap().clone()))
    }

    async fn get_users_by_groups_members(
        &self,
        _members: &GroupsMembersResult,
    ) -> Result<UsersResult> {
        Ok(UsersResult::new(self.users.lock().unwrap().clone()))
    }
}

/// Records every call as `operation:count`
#[derive(Default)]
struct FakeScim {
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<&'static str>>,
    target: Mutex<StateResources>,
}

impl FakeScim {
    fn record(&self, operation: &'static str, count: usize) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{count}"));
        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(anyhow!("{operation} failed"));
        }
        Ok(())
    }

    fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

fn member_count(members: &GroupsMembersResult) -> usize {
    members.iter().map(GroupMembers::count).sum()
}

#[async_trait]
impl ScimService for FakeScim {
    async fn get_groups(&self) -> Result<GroupsResult> {
        Ok(self.target.lock().unwrap().groups.clone())
    }

    async fn get_users(&self) -> Result<UsersResult> {
        Ok(self.target.lock().unwrap().users.clone())
    }

    async fn get_users_and_groups_members(
        &self,
        _groups: &GroupsResult,
    ) -> Result<(UsersResult, GroupsMembersResult)> {
        let target = self.target.lock().unwrap();
        Ok((target.users.clone(), target.groups_members.clone()))
    }

    async fn create_groups(&self, groups: &GroupsResult) -> Result<()> {
        self.record("create_groups", groups.count())
    }

    async fn update_groups(&self, groups: &GroupsResult) -> Result<()> {
        self.record("update_groups", groups.count())
    }

    async fn delete_groups(&self, groups: &GroupsResult) -> Result<()> {
        self.record("delete_groups", groups.count())
    }

    async fn create_users(&self, users: &UsersResult) -> Result<()> {
        self.record("create_users", users.count())
    }

    async fn update_users(&self, users: &UsersResult) -> Result<()> {
        self.record("update_users", users.count())
    }

    async fn delete_users(&self, users: &UsersResult) -> Result<()> {
        self.record("delete_users", users.count())
    }

    async fn create_groups_members(&self, members: &GroupsMembersResult) -> Result<()> {
        self.record("create_groups_members", member_count(members))
    }

    async fn delete_groups_members(&self, members: &GroupsMembersResult) -> Result<()> {
        self.record("delete_groups_members", member_count(members))
    }
}

#[derive(Default)]
struct MemoryState {
    state: Mutex<Option<State>>,
}

#[async_trait]
impl StateRepository for MemoryState {
    async fn get_state(&self) -> Result<Option<State>> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn set_state(&self, state: &State) -> Result<()> {
        *self.state.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

struct Harness {
    directory: Arc<FakeDirectory>,
    scim: Arc<FakeScim>,
    state: Arc<MemoryState>,
    service: SyncService,
}

fn harness(dry_run: bool) -> Harness {
    let directory = Arc::new(FakeDirectory::default());
    let scim = Arc::new(FakeScim::default());
    let state = Arc::new(MemoryState::default());
    let service = SyncService::new(
        Arc::clone(&directory) as Arc<dyn IdentityProviderService>,
        Arc::clone(&scim) as Arc<dyn ScimService>,
        Arc::clone(&state) as Arc<dyn StateRepository>,
        SyncOptions {
            groups_filter: vec!["name:AWS*".to_string()],
            dry_run,
        },
    );
    Harness {
        directory,
        scim,
        state,
        service,
    }
}

fn initial_directory(h: &Harness) {
    h.directory.set(
        vec![group("1"), group("2")],
        vec![members("1", &["1", "2"]), members("2", &["2"])],
        vec![user("1"), user("2")],
    );
}

#[tokio::test]
async fn test_first_sync_creates_everything_in_order() {
    let h = harness(false);
    initial_directory(&h);

    let outcome = h.service.sync_groups_and_users().await.unwrap();

    let SyncOutcome::Applied(report) = outcome else {
        panic!("expected an applied sync, got {outcome:?}");
    };
    assert_eq!(
        report.groups,
        PartitionSummary {
            create: 2,
            ..Default::default()
        }
    );
    assert_eq!(report.users.create, 2);
    assert_eq!(report.members.create, 3);
    assert_eq!(
        h.scim.take_calls(),
        vec![
            "create_groups:2",
            "update_groups:0",
            "create_users:2",
            "update_users:0",
            "delete_groups_members:0",
            "create_groups_members:3",
            "delete_groups:0",
            "delete_users:0",
        ]
    );

    let stored = h.state.state.lock().unwrap().clone().unwrap();
    assert_eq!(stored.resources().groups.count(), 2);
    assert_eq!(stored.resources().users.count(), 2);
}

#[tokio::test]
async fn test_unchanged_directory_skips_provisioning() {
    let h = harness(false);
    initial_directory(&h);
    h.service.sync_groups_and_users().await.unwrap();
    h.scim.take_calls();

    let outcome = h.service.sync_groups_and_users().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert!(h.scim.take_calls().is_empty());
}

#[tokio::test]
async fn test_changes_are_applied_as_deltas() {
    let h = harness(false);
    initial_directory(&h);
    h.service.sync_groups_and_users().await.unwrap();
    h.scim.take_calls();

    // group 1 renamed, user 1 leaves group 1, group 2 removed, user 3 joins group 1
    let renamed = Group::new("1", "group one", "group.1@mail.com");
    let user3 = User::new("3", Name::new("user", "3"), "user 3", "user.3@mail.com", true);
    h.directory.set(
        vec![renamed.clone()],
        vec![GroupMembers::new(renamed, vec![user("2"), user3.clone()])],
        vec![user("2"), user3],
    );

    let outcome = h.service.sync_groups_and_users().await.unwrap();

    let SyncOutcome::Applied(report) = outcome else {
        panic!("expected an applied sync, got {outcome:?}");
    };
    assert_eq!(report.groups.update, 1);
    assert_eq!(report.groups.delete, 1);
    assert_eq!(report.users.create, 1);
    assert_eq!(report.users.delete, 1);
    assert_eq!(
        h.scim.take_calls(),
        vec![
            "create_groups:0",
            "update_groups:1",
            "create_users:1",
            "update_users:0",
            "delete_groups_members:2",
            "create_groups_members:1",
            "delete_groups:1",
            "delete_users:1",
        ]
    );
}

#[tokio::test]
async fn test_failure_keeps_previous_state() {
    let h = harness(false);
    initial_directory(&h);
    *h.scim.fail_on.lock().unwrap() = Some("create_users");

    let error = h.service.sync_groups_and_users().await.unwrap_err();

    assert!(format!("{error:#}").contains("create_users failed"));
    assert_eq!(
        h.scim.take_calls(),
        vec!["create_groups:2", "update_groups:0", "create_users:2"]
    );
    assert!(h.state.state.lock().unwrap().is_none());

    // the next cycle recomputes the same plan
    *h.scim.fail_on.lock().unwrap() = None;
    let outcome = h.service.sync_groups_and_users().await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Applied(report) if report.groups.create == 2));
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let h = harness(true);
    initial_directory(&h);

    let outcome = h.service.sync_groups_and_users().await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Planned(report) if report.users.create == 2));
    assert!(h.scim.take_calls().is_empty());
    assert!(h.state.state.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_emails_abort_the_cycle() {
    let h = harness(false);
    let twin = Group::new("9", "twin", "group.1@mail.com");
    h.directory.set(vec![group("1"), twin], Vec::new(), Vec::new());

    let error = h.service.sync_groups_and_users().await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<ReconcileError>(),
        Some(ReconcileError::DuplicateKey { key, .. }) if key == "group.1@mail.com"
    ));
    assert!(h.scim.take_calls().is_empty());
    assert!(h.state.state.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_changed_user_email_readds_memberships() {
    let h = harness(false);
    h.directory
        .set(vec![group("1")], vec![members("1", &["1"])], vec![user("1")]);
    h.service.sync_groups_and_users().await.unwrap();
    h.scim.take_calls();

    let renamed = User::new("1", Name::new("user", "1"), "user 1", "new.1@mail.com", true);
    h.directory.set(
        vec![group("1")],
        vec![GroupMembers::new(group("1"), vec![renamed.clone()])],
        vec![renamed],
    );

    let outcome = h.service.sync_groups_and_users().await.unwrap();

    let SyncOutcome::Applied(report) = outcome else {
        panic!("expected an applied sync, got {outcome:?}");
    };
    assert_eq!(report.users.create, 1);
    assert_eq!(report.users.delete, 1);
    assert_eq!(report.members.create, 1);
    assert_eq!(report.members.equal, 0);
    assert_eq!(
        h.scim.take_calls(),
        vec![
            "create_groups:0",
            "update_groups:0",
            "create_users:1",
            "update_users:0",
            "delete_groups_members:0",
            "create_groups_members:1",
            "delete_groups:0",
            "delete_users:1",
        ]
    );
}

#[tokio::test]
async fn test_changed_group_email_readds_memberships() {
    let h = harness(false);
    initial_directory(&h);
    h.service.sync_groups_and_users().await.unwrap();
    h.scim.take_calls();

    // group 2 keeps its id and members under a new email
    let moved = Group::new("2", "group 2", "moved.2@mail.com");
    h.directory.set(
        vec![group("1"), moved.clone()],
        vec![members("1", &["1", "2"]), GroupMembers::new(moved, vec![user("2")])],
        vec![user("1"), user("2")],
    );

    let outcome = h.service.sync_groups_and_users().await.unwrap();

    let SyncOutcome::Applied(report) = outcome else {
        panic!("expected an applied sync, got {outcome:?}");
    };
    assert_eq!(report.groups.create, 1);
    assert_eq!(report.groups.delete, 1);
    assert_eq!(report.members.create, 1);
    assert_eq!(report.members.equal, 2);
    assert_eq!(
        h.scim.take_calls(),
        vec![
            "create_groups:1",
            "update_groups:0",
            "create_users:0",
            "update_users:0",
            "delete_groups_members:0",
            "create_groups_members:1",
            "delete_groups:1",
            "delete_users:0",
        ]
    );
}

#[tokio::test]
async fn test_first_sync_uses_target_as_baseline() {
    let h = harness(false);
    initial_directory(&h);

    // the target already holds group 1 with user 1, plus records this sync
    // no longer manages; its ids are its own
    let target_group = Group::new("scim-g1", "group 1", "group.1@mail.com");
    let stale_group = Group::new("scim-g9", "group 9", "group.9@mail.com");
    let unmanaged = Group::new("scim-g8", "console group", "");
    let target_user = User::new("scim-u1", Name::new("user", "1"), "user 1", "user.1@mail.com", true);
    let stale_user = User::new("scim-u9", Name::new("user", "9"), "user 9", "user.9@mail.com", true);
    *h.scim.target.lock().unwrap() = StateResources::new(
        GroupsResult::new(vec![target_group.clone(), stale_group, unmanaged]),
        UsersResult::new(vec![target_user.clone(), stale_user.clone()]),
        GroupsMembersResult::new(vec![GroupMembers::new(
            target_group,
            vec![target_user, stale_user],
        )]),
    );

    let outcome = h.service.sync_groups_and_users().await.unwrap();

    let SyncOutcome::Applied(report) = outcome else {
        panic!("expected an applied sync, got {outcome:?}");
    };
    assert_eq!(
        report.groups,
        PartitionSummary {
            create: 1,
            update: 0,
            equal: 1,
            delete: 1,
        }
    );
    assert_eq!(
        report.users,
        PartitionSummary {
            create: 1,
            update: 0,
            equal: 1,
            delete: 1,
        }
    );
    assert_eq!(
        report.members,
        PartitionSummary {
            create: 2,
            update: 0,
            equal: 1,
            delete: 1,
        }
    );
    assert_eq!(
        h.scim.take_calls(),
        vec![
            "create_groups:1",
            "update_groups:0",
            "create_users:1",
            "update_users:0",
            "delete_groups_members:1",
            "create_groups_members:2",
            "delete_groups:1",
            "delete_users:1",
        ]
    );
    assert!(h.state.state.lock().unwrap().is_some());
}
