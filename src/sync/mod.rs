//! # Sync
//!
//! Drives one sync cycle end to end:
//!
//! 1. Read groups, memberships and member users from the identity provider
//! 2. Load the last synced state
//! 3. Reconcile the fresh snapshot against it
//! 4. Apply the partitions to the SCIM target in dependency order
//! 5. Store the fresh snapshot as the new state
//!
//! A cycle that fails at any point leaves the stored state untouched, so the
//! next cycle recomputes the same plan.

mod service;

pub use service::{SyncOptions, SyncService};

use crate::reconciler::PartitionSummary;

/// Partition counts of one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub groups: PartitionSummary,
    pub users: PartitionSummary,
    pub members: PartitionSummary,
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing changed at the identity provider since the last sync
    Unchanged,
    /// Dry run: the plan was computed and logged only
    Planned(SyncReport),
    /// The plan was applied and the state stored
    Applied(SyncReport),
}
