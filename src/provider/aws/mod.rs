//! # AWS SSO SCIM
//!
//! Provisioning target: the SCIM endpoint of AWS IAM Identity Center (SSO).
//!
//! This module provides:
//! - [`AwsScimClient`]: typed SCIM requests with field constraint checks and retries
//! - [`AwsScimProvider`]: the [`crate::provider::ScimService`] the sync service drives

mod client;
mod error;
mod provider;
pub mod requests;
pub mod responses;

pub use client::{AwsScimClient, RetryPolicy};
pub use error::ScimError;
pub use provider::AwsScimProvider;
