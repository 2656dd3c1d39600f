//! # IdP SCIM Sync
//!
//! Keeps the groups, users and group memberships of an AWS SSO (IAM Identity
//! Center) SCIM endpoint in line with a Google Workspace directory.
//!
//! ## Overview
//!
//! Each sync cycle:
//!
//! 1. **Reads the identity provider** - groups matching the configured filters,
//!    their members and the member users
//! 2. **Reconciles** - compares the fresh snapshot with the last synced state
//!    and splits every record into create, update, equal and delete partitions
//! 3. **Provisions** - applies the partitions to the SCIM endpoint in
//!    dependency order
//! 4. **Stores the state** - the snapshot becomes the baseline of the next cycle
//!
//! The reconciliation core ([`reconciler`]) is pure; all I/O lives in
//! [`provider`], [`state`] and [`sync`].

pub mod backoff;
pub mod config;
pub mod constants;
pub mod model;
pub mod observability;
pub mod provider;
pub mod reconciler;
pub mod server;
pub mod state;
pub mod sync;
