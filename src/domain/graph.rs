use crate::domain::edge::DependencyEdge;
use crate::domain::point::ProgramPoint;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};

/// Per-edge annotation payload.
#[derive(Debug, Clone, Default)]
pub struct EdgeLabel {
    /// Order-sensitive justification chain, when recorded by the annotators.
    pub chain: Option<Vec<ProgramPoint>>,
    /// Marks an explicitly-annotated trivial self-dependency.
    pub trivial: bool,
}

/// Dependency graph for one (program, kind): directed edges between program
/// points, with a point-to-node map for lookups.
#[derive(Debug)]
pub struct DependencyGraph {
    pub graph: DiGraph<ProgramPoint, EdgeLabel>,
    pub point_to_node: HashMap<ProgramPoint, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            point_to_node: HashMap::new(),
        }
    }

    fn intern(&mut self, point: &ProgramPoint) -> NodeIndex {
        if let Some(&idx) = self.point_to_node.get(point) {
            return idx;
        }
        let idx = self.graph.add_node(point.clone());
        self.point_to_node.insert(point.clone(), idx);
        idx
    }

    /// Insert an edge, deduplicating: returns false if the (source, target)
    /// pair was already present. The first recorded annotation wins.
    pub fn insert(&mut self, edge: DependencyEdge) -> bool {
        let s = self.intern(&edge.source);
        let t = self.intern(&edge.target);
        if self.graph.find_edge(s, t).is_some() {
            return false;
        }
        self.graph.add_edge(
            s,
            t,
            EdgeLabel {
                chain: edge.chain,
                trivial: edge.trivial,
            },
        );
        true
    }

    pub fn contains_edge(&self, source: &ProgramPoint, target: &ProgramPoint) -> bool {
        self.edge(source, target).is_some()
    }

    pub fn edge(&self, source: &ProgramPoint, target: &ProgramPoint) -> Option<&EdgeLabel> {
        let s = *self.point_to_node.get(source)?;
        let t = *self.point_to_node.get(target)?;
        let e = self.graph.find_edge(s, t)?;
        self.graph.edge_weight(e)
    }

    /// All sources with an edge into `target`, as a sorted set.
    pub fn sources_of(&self, target: &ProgramPoint) -> BTreeSet<ProgramPoint> {
        let Some(&t) = self.point_to_node.get(target) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(t, Direction::Incoming)
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// All points that are the target of at least one edge, as a sorted set.
    pub fn targets(&self) -> BTreeSet<ProgramPoint> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(_, t)| self.graph[t].clone())
            .collect()
    }

    /// Every annotated edge, reassembled from the graph.
    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        self.graph.edge_indices().filter_map(|e| {
            let (s, t) = self.graph.edge_endpoints(e)?;
            let label = self.graph.edge_weight(e)?;
            Some(DependencyEdge {
                source: self.graph[s].clone(),
                target: self.graph[t].clone(),
                chain: label.chain.clone(),
                trivial: label.trivial,
            })
        })
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(line: u32) -> ProgramPoint {
        ProgramPoint::new("main.c", line)
    }

    #[test]
    fn test_dedup_and_sources() {
        let mut g = DependencyGraph::new();
        assert!(g.insert(DependencyEdge::new(p(3), p(10))));
        assert!(!g.insert(DependencyEdge::new(p(3), p(10))));
        assert!(g.insert(DependencyEdge::new(p(7), p(10))));

        assert_eq!(g.edge_count(), 2);
        let sources = g.sources_of(&p(10));
        assert_eq!(sources, [p(3), p(7)].into_iter().collect());
        assert!(g.sources_of(&p(99)).is_empty());
    }

    #[test]
    fn test_targets_sorted() {
        let mut g = DependencyGraph::new();
        g.insert(DependencyEdge::new(p(1), p(20)));
        g.insert(DependencyEdge::new(p(1), p(5)));

        let targets: Vec<_> = g.targets().into_iter().collect();
        assert_eq!(targets, vec![p(5), p(20)]);
    }

    #[test]
    fn test_edges_round_trip() {
        let mut g = DependencyGraph::new();
        let edge = DependencyEdge {
            source: p(2),
            target: p(9),
            chain: Some(vec![p(2), p(5), p(9)]),
            trivial: false,
        };
        g.insert(edge.clone());

        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges, vec![edge]);
        assert_eq!(
            g.edge(&p(2), &p(9)).and_then(|label| label.chain.clone()),
            Some(vec![p(2), p(5), p(9)])
        );
    }
}
