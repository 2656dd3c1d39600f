//! Common test utilities for the contract and sync tests
//!
//! Provides rustls setup, mock server URL handling and small model builders.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Once;

use idp_scim_sync::model::{Group, GroupMembers, Name, User};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` so it runs a single time across all tests of a binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Mock server URL without the trailing slash
pub fn base_url(url: impl std::fmt::Display) -> String {
    url.to_string().trim_end_matches('/').to_string()
}

pub fn group(id: &str) -> Group {
    Group::new(id, format!("group {id}"), format!("group.{id}@mail.com"))
}

pub fn user(id: &str) -> User {
    User::new(
        id,
        Name::new("user", id),
        format!("user {id}"),
        format!("user.{id}@mail.com"),
        true,
    )
}

pub fn members(group_id: &str, user_ids: &[&str]) -> GroupMembers {
    GroupMembers::new(group(group_id), user_ids.iter().map(|id| user(id)))
}
