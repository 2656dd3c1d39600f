//! # Reconciler
//!
//! Pure comparison of a fresh identity provider snapshot against the last
//! synced state.
//!
//! Each reconciler takes two snapshots of the same kind and classifies every
//! record into partitions. None of them perform I/O or hold state; the sync
//! service decides what to do with the partitions.

mod error;
mod members;
mod resources;

pub use error::ReconcileError;
pub use members::members_differences;
pub use resources::{groups_differences, users_differences};

use crate::model::{GroupMembers, GroupsMembersResult, Resource, Results};

/// Outcome of reconciling groups or users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<T> {
    pub create: Results<T>,
    pub update: Results<T>,
    pub equal: Results<T>,
    pub delete: Results<T>,
}

impl<T: Resource> Partition<T> {
    /// True when nothing needs to be sent to the target
    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    pub fn summary(&self) -> PartitionSummary {
        PartitionSummary {
            create: self.create.count(),
            update: self.update.count(),
            equal: self.equal.count(),
            delete: self.delete.count(),
        }
    }
}

/// Outcome of reconciling memberships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembersPartition {
    pub create: GroupsMembersResult,
    pub equal: GroupsMembersResult,
    pub delete: GroupsMembersResult,
}

impl MembersPartition {
    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty()
    }

    /// Counts members, not groups
    pub fn summary(&self) -> PartitionSummary {
        let members = |result: &GroupsMembersResult| -> usize {
            result.iter().map(GroupMembers::count).sum()
        };
        PartitionSummary {
            create: members(&self.create),
            update: 0,
            equal: members(&self.equal),
            delete: members(&self.delete),
        }
    }
}

/// Record counts per partition, for logging and metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionSummary {
    pub create: usize,
    pub update: usize,
    pub equal: usize,
    pub delete: usize,
}
