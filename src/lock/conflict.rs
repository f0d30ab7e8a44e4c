//! Lock conflict matrix
//!
//! Mirrors the database's lock compatibility table. For every mode it lists the
//! modes that block a request for it. The order of each list is the order in
//! which the graph builder emits edges, so keep it stable.

use super::types::LockMode;
use super::types::LockMode::*;
use crate::error::{Error, Result};
use ahash::AHashMap;

lazy_static::lazy_static! {
    static ref CONFLICT_TABLE: AHashMap<LockMode, Vec<LockMode>> = {
        let mut table = AHashMap::new();
        table.insert(AccessShareLock, vec![AccessExclusiveLock]);
        table.insert(RowShareLock, vec![ExclusiveLock, AccessExclusiveLock]);
        table.insert(
            RowExclusiveLock,
            vec![ShareLock, ShareRowExclusiveLock, ExclusiveLock, AccessExclusiveLock],
        );
        table.insert(
            ShareUpdateExclusiveLock,
            vec![
                ShareUpdateExclusiveLock,
                ShareLock,
                ShareRowExclusiveLock,
                ExclusiveLock,
                AccessExclusiveLock,
            ],
        );
        table.insert(
            ShareLock,
            vec![
                RowExclusiveLock,
                ShareUpdateExclusiveLock,
                ShareRowExclusiveLock,
                ExclusiveLock,
                AccessExclusiveLock,
            ],
        );
        table.insert(
            ShareRowExclusiveLock,
            vec![
                ShareLock,
                RowExclusiveLock,
                ShareUpdateExclusiveLock,
                ShareRowExclusiveLock,
                ExclusiveLock,
                AccessExclusiveLock,
            ],
        );
        table.insert(
            ExclusiveLock,
            vec![
                RowShareLock,
                ShareLock,
                RowExclusiveLock,
                ShareUpdateExclusiveLock,
                ShareRowExclusiveLock,
                ExclusiveLock,
                AccessExclusiveLock,
            ],
        );
        table.insert(
            AccessExclusiveLock,
            vec![
                AccessShareLock,
                RowShareLock,
                ShareLock,
                RowExclusiveLock,
                ShareUpdateExclusiveLock,
                ShareRowExclusiveLock,
                ExclusiveLock,
                AccessExclusiveLock,
            ],
        );
        table
    };
}

/// Read-only handle on the process-wide conflict table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictMatrix;

impl ConflictMatrix {
    /// Modes already granted to another session that block a request for `mode`.
    pub fn conflicts_of(mode: LockMode) -> Result<&'static [LockMode]> {
        CONFLICT_TABLE
            .get(&mode)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownLockMode(mode.to_string()))
    }

    /// Whether a request for `requested` is blocked by a grant of `held`.
    pub fn conflicts(requested: LockMode, held: LockMode) -> Result<bool> {
        Ok(Self::conflicts_of(requested)?.contains(&held))
    }
}
