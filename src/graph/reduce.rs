// Graph Reducer
//
// Repeatedly strips vertices with no incoming or no outgoing edges. What is
// left is exactly the union of the directed cycles in the graph.
use super::wait_for::WaitForGraph;
use tracing::{debug, trace};

impl WaitForGraph {
    /// Reduces the graph to its cyclic part and returns how many vertices were
    /// removed. An empty graph afterwards means there is no deadlock.
    pub fn reduce(&mut self) -> usize {
        let mut removed = 0;
        let mut passes = 0;

        loop {
            passes += 1;
            let mut changed = false;
            for session in self.sessions() {
                let prunable = self
                    .vertex(session)
                    .map_or(false, |vertex| !vertex.may_be_in_cycle());
                if prunable {
                    trace!(%session, "Pruned vertex outside any cycle");
                    self.remove_vertex(session);
                    removed += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        debug!(removed, passes, remaining = self.vertex_count(), "Reduced wait-for graph");
        removed
    }

    /// Whether every vertex has at least one incoming and one outgoing edge.
    pub fn is_reduced(&self) -> bool {
        self.vertices().all(|vertex| vertex.may_be_in_cycle())
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{Edge, WaitForGraph};
    use crate::lock::{LockMode, LockableObject, SessionId};

    fn graph_of(pairs: &[(i64, i64)]) -> WaitForGraph {
        let mut graph = WaitForGraph::new();
        for &(waiter, holder) in pairs {
            graph.add_edge(Edge {
                waiter: SessionId(waiter),
                holder: SessionId(holder),
                requested: LockMode::ExclusiveLock,
                held: LockMode::ExclusiveLock,
                object: LockableObject::transaction(waiter * 1000 + holder),
            });
        }
        graph
    }

    #[test]
    fn test_chain_reduces_to_empty() {
        let mut graph = graph_of(&[(1, 2), (2, 3), (3, 4)]);
        assert_eq!(graph.reduce(), 4);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_cycle_survives_with_tails_removed() {
        // 1 -> 2 -> 3 -> 1 with a waiter 4 -> 1 and a blocker 3 -> 5.
        let mut graph = graph_of(&[(1, 2), (2, 3), (3, 1), (4, 1), (3, 5)]);
        assert_eq!(graph.reduce(), 2);
        assert_eq!(graph.sessions(), vec![SessionId(1), SessionId(2), SessionId(3)]);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.is_reduced());
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_two_disjoint_cycles() {
        let mut graph = graph_of(&[(1, 2), (2, 1), (10, 11), (11, 12), (12, 10), (12, 13)]);
        graph.reduce();
        assert_eq!(graph.vertex_count(), 5);
        assert!(!graph.contains(SessionId(13)));
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let mut graph = graph_of(&[(1, 2), (2, 1), (3, 1)]);
        graph.reduce();
        let sessions = graph.sessions();
        let edges = graph.edge_count();
        assert_eq!(graph.reduce(), 0);
        assert_eq!(graph.sessions(), sessions);
        assert_eq!(graph.edge_count(), edges);
    }

    #[test]
    fn test_empty_graph() {
        let mut graph = WaitForGraph::new();
        assert_eq!(graph.reduce(), 0);
        assert!(graph.is_reduced());
    }
}
