// Deadlock Detection
//
// Runs one analysis: snapshot rows -> partition -> wait-for graph -> reduced
// graph -> victims.
use crate::error::Result;
use crate::graph::{EdgePair, WaitForGraph};
use crate::lock::{LockMode, LockRow, LockableObject, SessionId};
use crate::report;
use crate::snapshot::{LockTable, SnapshotSource};
use serde::Serialize;
use tracing::{info, warn};

/// One wait-for edge that survived reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitEdge {
    pub waiter: SessionId,
    pub holder: SessionId,
    pub requested: LockMode,
    pub held: LockMode,
    pub object: LockableObject,
    /// The human report line for this edge.
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadlockReport {
    /// Edges of the reduced graph, i.e. the deadlocked part only.
    pub edges: Vec<WaitEdge>,
    /// Same edges as directed pairs with presentation labels.
    #[serde(skip)]
    pub pairs: Vec<EdgePair>,
    /// Graphviz rendering of the reduced graph.
    #[serde(skip)]
    pub dot: String,
    /// Sessions to cancel, in selection order.
    pub kill_list: Vec<SessionId>,
}

#[derive(Debug, Clone)]
pub enum Analysis {
    NoDeadlock,
    Deadlock(DeadlockReport),
}

impl Analysis {
    pub fn is_deadlock(&self) -> bool {
        matches!(self, Analysis::Deadlock(_))
    }

    pub fn report(&self) -> Option<&DeadlockReport> {
        match self {
            Analysis::Deadlock(report) => Some(report),
            Analysis::NoDeadlock => None,
        }
    }
}

pub struct DeadlockDetector;

impl DeadlockDetector {
    /// Analyzes a complete snapshot.
    pub fn analyze<I>(rows: I) -> Result<Analysis>
    where
        I: IntoIterator<Item = LockRow>,
    {
        let table = LockTable::partition(rows)?;
        let mut graph = WaitForGraph::build(&table)?;
        graph.reduce();

        if graph.is_empty() {
            info!("No deadlock");
            return Ok(Analysis::NoDeadlock);
        }

        let edges: Vec<WaitEdge> = graph
            .sorted_edges()
            .into_iter()
            .map(|(_, edge)| WaitEdge {
                waiter: edge.waiter,
                holder: edge.holder,
                requested: edge.requested,
                held: edge.held,
                object: edge.object.clone(),
                description: edge.to_string(),
            })
            .collect();
        let pairs = graph.edge_pairs();
        let dot = report::render_dot(&graph);
        let deadlocked = graph.vertex_count();

        let kill_list = graph.select_kill_set();
        warn!(
            sessions = deadlocked,
            edges = edges.len(),
            victims = kill_list.len(),
            "Deadlock is found"
        );

        Ok(Analysis::Deadlock(DeadlockReport {
            edges,
            pairs,
            dot,
            kill_list,
        }))
    }

    /// Fetches the snapshot from `source`, then analyzes it.
    pub async fn run(source: &dyn SnapshotSource) -> Result<Analysis> {
        info!(source = %source.describe(), "Reading lock snapshot");
        let rows = source.fetch().await?;
        Self::analyze(rows)
    }
}
