//! Wait-for graph of database sessions
//!
//! Vertices are keyed by session id. Edges live in an arena keyed by [`EdgeId`]
//! and each vertex keeps the ids of its incoming and outgoing edges, so removal
//! never has to chase references between vertices.

use crate::lock::{LockMode, LockableObject, SessionId};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// One session in the graph.
#[derive(Debug, Clone)]
pub struct Vertex {
    session: SessionId,
    seq: usize,
    incoming: AHashSet<EdgeId>,
    outgoing: AHashSet<EdgeId>,
}

impl Vertex {
    fn new(session: SessionId, seq: usize) -> Self {
        Self {
            session,
            seq,
            incoming: AHashSet::new(),
            outgoing: AHashSet::new(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Creation order, used only to name nodes in exported graphs.
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn incoming(&self) -> &AHashSet<EdgeId> {
        &self.incoming
    }

    pub fn outgoing(&self) -> &AHashSet<EdgeId> {
        &self.outgoing
    }

    pub fn in_degree(&self) -> usize {
        self.incoming.len()
    }

    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }

    /// A vertex can only sit on a cycle if something waits for it and it
    /// waits for something.
    pub fn may_be_in_cycle(&self) -> bool {
        !self.incoming.is_empty() && !self.outgoing.is_empty()
    }
}

/// `waiter` is blocked requesting `requested` on `object` because `holder`
/// was granted the conflicting `held`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub waiter: SessionId,
    pub holder: SessionId,
    pub requested: LockMode,
    pub held: LockMode,
    pub object: LockableObject,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session {} waits for {} on {}; blocked by Session {}(granted {});",
            self.waiter, self.requested, self.object, self.holder, self.held
        )
    }
}

/// A directed (waiter, holder) pair with presentation labels, for graph
/// renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgePair {
    pub waiter: SessionId,
    pub holder: SessionId,
    pub waiter_seq: usize,
    pub holder_seq: usize,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct WaitForGraph {
    vertices: AHashMap<SessionId, Vertex>,
    edges: AHashMap<EdgeId, Edge>,
    next_edge: u64,
    next_seq: usize,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vertex for `session`, creating it on first reference.
    pub fn get_or_insert_vertex(&mut self, session: SessionId) -> &mut Vertex {
        let next_seq = &mut self.next_seq;
        self.vertices.entry(session).or_insert_with(|| {
            let vertex = Vertex::new(session, *next_seq);
            *next_seq += 1;
            vertex
        })
    }

    /// Adds a new edge; parallel edges between the same sessions are kept.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;

        self.get_or_insert_vertex(edge.waiter).outgoing.insert(id);
        self.get_or_insert_vertex(edge.holder).incoming.insert(id);
        self.edges.insert(id, edge);
        id
    }

    /// Removes `session` and every edge touching it, detaching those edges
    /// from the neighbours' adjacency sets.
    pub fn remove_vertex(&mut self, session: SessionId) -> Option<Vertex> {
        let vertex = self.vertices.remove(&session)?;

        for id in &vertex.incoming {
            if let Some(edge) = self.edges.remove(id) {
                if let Some(waiter) = self.vertices.get_mut(&edge.waiter) {
                    waiter.outgoing.remove(id);
                }
            }
        }
        for id in &vertex.outgoing {
            if let Some(edge) = self.edges.remove(id) {
                if let Some(holder) = self.vertices.get_mut(&edge.holder) {
                    holder.incoming.remove(id);
                }
            }
        }

        Some(vertex)
    }

    pub fn vertex(&self, session: SessionId) -> Option<&Vertex> {
        self.vertices.get(&session)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.vertices.contains_key(&session)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    /// Session ids in ascending order.
    pub fn sessions(&self) -> Vec<SessionId> {
        let mut sessions: Vec<SessionId> = self.vertices.keys().copied().collect();
        sessions.sort_unstable();
        sessions
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edges ordered by waiter creation order, then holder creation order,
    /// then insertion order.
    pub fn sorted_edges(&self) -> Vec<(EdgeId, &Edge)> {
        let mut edges: Vec<(EdgeId, &Edge)> = self.edges.iter().map(|(id, e)| (*id, e)).collect();
        edges.sort_by_key(|(id, e)| (self.seq_of(e.waiter), self.seq_of(e.holder), *id));
        edges
    }

    /// Directed session pairs for every edge, in [`Self::sorted_edges`] order.
    pub fn edge_pairs(&self) -> Vec<EdgePair> {
        self.sorted_edges()
            .into_iter()
            .map(|(_, e)| EdgePair {
                waiter: e.waiter,
                holder: e.holder,
                waiter_seq: self.seq_of(e.waiter),
                holder_seq: self.seq_of(e.holder),
                label: format!("{} / {} on {}", e.requested, e.held, e.object),
            })
            .collect()
    }

    fn seq_of(&self, session: SessionId) -> usize {
        self.vertices.get(&session).map(|v| v.seq).unwrap_or(usize::MAX)
    }

    /// Checks that both adjacency views and the edge arena agree.
    pub fn is_consistent(&self) -> bool {
        let mut referenced = 0;
        for vertex in self.vertices.values() {
            for id in &vertex.outgoing {
                let Some(edge) = self.edges.get(id) else { return false };
                let holder_has = self
                    .vertices
                    .get(&edge.holder)
                    .map_or(false, |h| h.incoming.contains(id));
                if edge.waiter != vertex.session || !holder_has {
                    return false;
                }
                referenced += 1;
            }
            for id in &vertex.incoming {
                let Some(edge) = self.edges.get(id) else { return false };
                let waiter_has = self
                    .vertices
                    .get(&edge.waiter)
                    .map_or(false, |w| w.outgoing.contains(id));
                if edge.holder != vertex.session || !waiter_has {
                    return false;
                }
            }
        }
        referenced == self.edges.len()
    }
}
