// Lock Snapshot Types
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a database session as reported by the lock snapshot
/// (`mppsessionid` on Greenplum, the backend `pid` on PostgreSQL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl SessionId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for SessionId {
    fn from(id: i64) -> Self {
        SessionId(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock modes reported in `pg_locks.mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LockMode {
    AccessShareLock,
    RowShareLock,
    RowExclusiveLock,
    ShareUpdateExclusiveLock,
    ShareLock,
    ShareRowExclusiveLock,
    ExclusiveLock,
    AccessExclusiveLock,
    /// Predicate lock taken by serializable transactions. Always granted,
    /// never blocks, so it has no conflict entry.
    SIReadLock,
}

impl LockMode {
    pub const ALL: [LockMode; 9] = [
        LockMode::AccessShareLock,
        LockMode::RowShareLock,
        LockMode::RowExclusiveLock,
        LockMode::ShareUpdateExclusiveLock,
        LockMode::ShareLock,
        LockMode::ShareRowExclusiveLock,
        LockMode::ExclusiveLock,
        LockMode::AccessExclusiveLock,
        LockMode::SIReadLock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::AccessShareLock => "AccessShareLock",
            LockMode::RowShareLock => "RowShareLock",
            LockMode::RowExclusiveLock => "RowExclusiveLock",
            LockMode::ShareUpdateExclusiveLock => "ShareUpdateExclusiveLock",
            LockMode::ShareLock => "ShareLock",
            LockMode::ShareRowExclusiveLock => "ShareRowExclusiveLock",
            LockMode::ExclusiveLock => "ExclusiveLock",
            LockMode::AccessExclusiveLock => "AccessExclusiveLock",
            LockMode::SIReadLock => "SIReadLock",
        }
    }
}

impl FromStr for LockMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LockMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| Error::UnknownLockMode(s.to_string()))
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_mode() {
        for mode in LockMode::ALL {
            assert_eq!(mode.as_str().parse::<LockMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_parse_unknown_mode() {
        let err = "HyperExclusiveLock".parse::<LockMode>().unwrap_err();
        assert!(matches!(err, Error::UnknownLockMode(ref m) if m == "HyperExclusiveLock"));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("sharelock".parse::<LockMode>().is_err());
    }

    #[test]
    fn test_session_display_is_bare_number() {
        assert_eq!(SessionId(42).to_string(), "42");
        assert_eq!(SessionId(-7).to_string(), "-7");
    }
}
