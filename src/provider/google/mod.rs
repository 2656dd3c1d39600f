//! # Google Workspace
//!
//! Identity provider side: the Admin SDK Directory API.
//!
//! - [`DirectoryClient`]: paginated REST reads with a bearer access token
//! - [`GoogleWorkspaceProvider`]: the [`crate::provider::IdentityProviderService`]
//!   the sync service reads from

mod client;
mod provider;
pub mod responses;

pub use client::{DirectoryClient, MY_CUSTOMER};
pub use provider::GoogleWorkspaceProvider;
