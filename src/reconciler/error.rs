//! Reconciler errors.

use thiserror::Error;

use crate::model::EntityKind;

/// Precondition violations detected while indexing a snapshot
///
/// The reconciler is total over well-formed snapshots. The only input it
/// rejects is one where the correlation key is not unique, because matching
/// against such a snapshot would silently drop records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("duplicate {kind} key {key:?} within one snapshot")]
    DuplicateKey { key: String, kind: EntityKind },
}

impl ReconcileError {
    pub(crate) fn duplicate(key: &str, kind: EntityKind) -> Self {
        Self::DuplicateKey {
            key: key.to_string(),
            kind,
        }
    }
}
