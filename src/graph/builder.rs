// Wait-for graph construction from a partitioned lock snapshot
use super::wait_for::{Edge, WaitForGraph};
use crate::error::Result;
use crate::lock::ConflictMatrix;
use crate::snapshot::LockTable;
use tracing::debug;

impl WaitForGraph {
    /// Adds an edge `S -> T` for every waiting request of `S` and every session
    /// `T != S` holding a conflicting mode on the same object.
    pub fn build(table: &LockTable) -> Result<Self> {
        let mut graph = WaitForGraph::new();

        for waiter in table.waiting_sessions() {
            for lock in table.waiting_for(waiter) {
                let conflicts = ConflictMatrix::conflicts_of(lock.mode)?;
                for &held in conflicts {
                    for holder in table.holders(&lock.object, held) {
                        // A session upgrading its own lock is not blocked by itself.
                        if holder == waiter {
                            continue;
                        }
                        graph.add_edge(Edge {
                            waiter,
                            holder,
                            requested: lock.mode,
                            held,
                            object: lock.object.clone(),
                        });
                    }
                }
            }
        }

        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "Built wait-for graph"
        );
        Ok(graph)
    }
}
