// Kill-Set Selection
use super::wait_for::WaitForGraph;
use crate::lock::SessionId;
use tracing::debug;

impl WaitForGraph {
    /// Session with the largest id.
    pub fn max_session(&self) -> Option<SessionId> {
        self.vertices().map(|vertex| vertex.session()).max()
    }

    /// Picks sessions to cancel until no cycle is left.
    ///
    /// Greedy: remove the largest session id, re-reduce, repeat. The result is
    /// sufficient to break every cycle but not necessarily minimal. Expects a
    /// reduced graph; an acyclic one yields an empty list.
    pub fn select_kill_set(mut self) -> Vec<SessionId> {
        let mut victims = Vec::new();
        self.reduce();

        while let Some(victim) = self.max_session() {
            self.remove_vertex(victim);
            let collapsed = self.reduce();
            debug!(%victim, collapsed, remaining = self.vertex_count(), "Selected deadlock victim");
            victims.push(victim);
        }

        victims
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
                requested: LockMode::ShareLock,
                held: LockMode::ExclusiveLock,
                object: LockableObject::relation(1, waiter),
            });
        }
        graph
    }

    fn ids(v: &[i64]) -> Vec<SessionId> {
        v.iter().copied().map(SessionId).collect()
    }

    #[test]
    fn test_largest_id_goes_first() {
        let kill = graph_of(&[(100, 200), (200, 300), (300, 100)]).select_kill_set();
        assert_eq!(kill, ids(&[300]));
    }

    #[test]
    fn test_one_victim_per_disjoint_cycle() {
        let kill = graph_of(&[(1, 2), (2, 1), (10, 11), (11, 10)]).select_kill_set();
        assert_eq!(kill, ids(&[11, 2]));
    }

    #[test]
    fn test_shared_vertex_breaks_both_cycles() {
        // Two cycles through 9: 9 <-> 1 and 9 <-> 2.
        let kill = graph_of(&[(9, 1), (1, 9), (9, 2), (2, 9)]).select_kill_set();
        assert_eq!(kill, ids(&[9]));
    }

    #[test]
    fn test_greedy_is_not_minimal() {
        // Removing 1 alone would break both cycles; the largest-first rule
        // picks 5 and then 1.
        let kill = graph_of(&[(1, 5), (5, 1), (1, 2), (2, 1)]).select_kill_set();
        assert_eq!(kill, ids(&[5, 2]));
    }

    #[test]
    fn test_negative_session_ids() {
        let kill = graph_of(&[(-3, -1), (-1, -3)]).select_kill_set();
        assert_eq!(kill, ids(&[-1]));
    }

    #[test]
    fn test_acyclic_graph_needs_no_victims() {
        assert!(graph_of(&[(1, 2), (2, 3)]).select_kill_set().is_empty());
    }
}
