//! Report rendering
//!
//! Human report lines for diagnostic output, the remediation statement, a JSON
//! document for tooling and a Graphviz view of the deadlocked sessions.

use crate::config::Flavor;
use crate::detector::{Analysis, DeadlockReport, WaitEdge};
use crate::error::Result;
use crate::graph::WaitForGraph;
use crate::lock::SessionId;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// Comma-joined session ids in kill order.
pub fn session_list(sessions: &[SessionId]) -> String {
    sessions
        .iter()
        .map(SessionId::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Statement cancelling the backends of `sessions`.
pub fn cancel_statement(flavor: Flavor, sessions: &[SessionId]) -> String {
    let ids = session_list(sessions);
    match flavor {
        Flavor::Greenplum => format!(
            "SELECT pg_cancel_backend(procpid) FROM pg_stat_activity WHERE sess_id IN ({});",
            ids
        ),
        Flavor::Postgres => format!(
            "SELECT pg_cancel_backend(pid) FROM pg_stat_activity WHERE pid IN ({});",
            ids
        ),
    }
}

/// Graphviz digraph with one node per session, labelled by session id, and
/// one edge per wait-for edge, labelled `requested/held`.
pub fn render_dot(graph: &WaitForGraph) -> String {
    let mut dot: DiGraph<String, String> = DiGraph::new();

    let mut vertices: Vec<(usize, SessionId)> = graph
        .vertices()
        .map(|vertex| (vertex.seq(), vertex.session()))
        .collect();
    vertices.sort_unstable();

    let mut nodes: BTreeMap<SessionId, NodeIndex> = BTreeMap::new();
    for (_, session) in vertices {
        nodes.insert(session, dot.add_node(session.to_string()));
    }

    for (_, edge) in graph.sorted_edges() {
        if let (Some(&from), Some(&to)) = (nodes.get(&edge.waiter), nodes.get(&edge.holder)) {
            dot.add_edge(from, to, format!("{}/{}", edge.requested, edge.held));
        }
    }

    format!("{}", Dot::new(&dot))
}

/// Writes the diagnostic report.
pub fn write_human<W: Write>(out: &mut W, analysis: &Analysis) -> Result<()> {
    match analysis {
        Analysis::NoDeadlock => writeln!(out, "No deadlock")?,
        Analysis::Deadlock(report) => {
            writeln!(out, "Deadlock is found: ")?;
            for edge in &report.edges {
                writeln!(out, "{}", edge.description)?;
            }
            writeln!(
                out,
                "You can kill these session to break deadlock. sessions: {}",
                session_list(&report.kill_list)
            )?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub deadlock: bool,
    pub edges: &'a [WaitEdge],
    pub kill_list: &'a [SessionId],
    pub statement: Option<String>,
}

impl<'a> JsonReport<'a> {
    pub fn new(analysis: &'a Analysis, flavor: Flavor) -> Self {
        match analysis {
            Analysis::NoDeadlock => JsonReport {
                deadlock: false,
                edges: &[],
                kill_list: &[],
                statement: None,
            },
            Analysis::Deadlock(report) => JsonReport {
                deadlock: true,
                edges: &report.edges,
                kill_list: &report.kill_list,
                statement: Some(cancel_statement(flavor, &report.kill_list)),
            },
        }
    }
}

impl DeadlockReport {
    pub fn cancel_statement(&self, flavor: Flavor) -> String {
        cancel_statement(flavor, &self.kill_list)
    }
}
