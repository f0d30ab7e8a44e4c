//! lockwait
//!
//! Inspects a snapshot of the PostgreSQL / Greenplum lock table, builds the
//! wait-for graph between sessions, reduces it to its cycles and proposes the
//! sessions to cancel so that every deadlock is broken.

pub mod config;
pub mod detector;
pub mod error;
pub mod graph;
pub mod lock;
pub mod report;
pub mod snapshot;

pub use config::{ConfigBuilder, DetectorConfig, Flavor, ReportFormat};
pub use detector::{Analysis, DeadlockDetector, DeadlockReport, WaitEdge};
pub use error::{Error, Result};
pub use graph::WaitForGraph;
pub use lock::{ConflictMatrix, LockMode, LockRow, LockableObject, SessionId};
pub use snapshot::{FileLockSource, LockTable, PgLockSource, SnapshotSource, StaticLockSource};
