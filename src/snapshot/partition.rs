//! Snapshot partitioner
//!
//! Splits the raw lock rows into what is held (indexed by object and mode) and
//! what is being waited for (indexed by the requesting session).

use crate::error::Result;
use crate::lock::{LockMode, LockRow, LockableObject, SessionId};
use ahash::AHashMap;
use std::collections::BTreeSet;
use tracing::debug;

/// A lock some session is blocked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingLock {
    pub object: LockableObject,
    pub mode: LockMode,
}

/// Partitioned view of one lock snapshot.
#[derive(Debug, Default)]
pub struct LockTable {
    granted: AHashMap<LockableObject, AHashMap<LockMode, BTreeSet<SessionId>>>,
    waiting: AHashMap<SessionId, Vec<WaitingLock>>,
    granted_rows: usize,
    waiting_rows: usize,
}

impl LockTable {
    /// Validates and partitions `rows`. The first malformed row or unknown mode
    /// aborts the whole snapshot.
    pub fn partition<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = LockRow>,
    {
        let mut table = LockTable::default();

        for row in rows {
            let req = row.into_request()?;
            if req.granted {
                table
                    .granted
                    .entry(req.object)
                    .or_default()
                    .entry(req.mode)
                    .or_default()
                    .insert(req.session);
                table.granted_rows += 1;
            } else {
                table.waiting.entry(req.session).or_default().push(WaitingLock {
                    object: req.object,
                    mode: req.mode,
                });
                table.waiting_rows += 1;
            }
        }

        debug!(
            granted_rows = table.granted_rows,
            waiting_rows = table.waiting_rows,
            objects = table.granted.len(),
            waiting_sessions = table.waiting.len(),
            "Partitioned lock snapshot"
        );

        Ok(table)
    }

    /// Sessions holding `mode` on `object`, in ascending id order.
    pub fn holders(&self, object: &LockableObject, mode: LockMode) -> impl Iterator<Item = SessionId> + '_ {
        self.granted
            .get(object)
            .and_then(|modes| modes.get(&mode))
            .into_iter()
            .flat_map(|sessions| sessions.iter().copied())
    }

    /// Locks `session` is waiting for, in snapshot order.
    pub fn waiting_for(&self, session: SessionId) -> &[WaitingLock] {
        self.waiting.get(&session).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Waiting sessions in ascending id order.
    pub fn waiting_sessions(&self) -> Vec<SessionId> {
        let mut sessions: Vec<SessionId> = self.waiting.keys().copied().collect();
        sessions.sort_unstable();
        sessions
    }

    pub fn granted_rows(&self) -> usize {
        self.granted_rows
    }

    pub fn waiting_rows(&self) -> usize {
        self.waiting_rows
    }

    pub fn is_empty(&self) -> bool {
        self.granted_rows == 0 && self.waiting_rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::lock::LockMode::*;

    fn rel(id: i64) -> LockableObject {
        LockableObject::relation(1, id)
    }

    #[test]
    fn test_partition_granted_and_waiting() {
        let table = LockTable::partition(vec![
            LockRow::granted(rel(500), ShareLock, 10),
            LockRow::granted(rel(500), ShareLock, 30),
            LockRow::granted(rel(500), RowExclusiveLock, 40),
            LockRow::waiting(rel(500), ExclusiveLock, 20),
            LockRow::waiting(rel(600), AccessShareLock, 20),
        ])
        .unwrap();

        assert_eq!(table.granted_rows(), 3);
        assert_eq!(table.waiting_rows(), 2);
        assert_eq!(
            table.holders(&rel(500), ShareLock).collect::<Vec<_>>(),
            vec![SessionId(10), SessionId(30)]
        );
        assert_eq!(table.holders(&rel(500), ExclusiveLock).count(), 0);
        assert_eq!(table.holders(&rel(700), ShareLock).count(), 0);

        let waits = table.waiting_for(SessionId(20));
        assert_eq!(waits.len(), 2);
        assert_eq!(waits[0].object, rel(500));
        assert_eq!(waits[1].mode, AccessShareLock);
        assert_eq!(table.waiting_sessions(), vec![SessionId(20)]);
    }

    #[test]
    fn test_duplicate_grants_collapse() {
        let table = LockTable::partition(vec![
            LockRow::granted(rel(500), ShareLock, 10),
            LockRow::granted(rel(500), ShareLock, 10),
        ])
        .unwrap();
        assert_eq!(table.holders(&rel(500), ShareLock).count(), 1);
    }

    #[test]
    fn test_empty_snapshot() {
        let table = LockTable::partition(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert!(table.waiting_sessions().is_empty());
        assert!(table.waiting_for(SessionId(1)).is_empty());
    }

    #[test]
    fn test_malformed_row_aborts() {
        let mut bad = LockRow::granted(rel(500), ShareLock, 10);
        bad.session = None;
        let err = LockTable::partition(vec![LockRow::granted(rel(1), ShareLock, 1), bad]).unwrap_err();
        assert!(matches!(err, Error::MalformedRow("session")));
    }
}
