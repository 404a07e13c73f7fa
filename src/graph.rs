use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};

use crate::query::QueryExpr;

/// A parsed pattern: an undirected graph whose atoms and bonds carry boolean
/// query trees, plus the component bookkeeping produced by the parser.
///
/// Components are the dot-separated fragments of the pattern, numbered left to
/// right. Each component's anchor is its first atom; connectivity groups are
/// recorded as ordered lists of component anchors.
#[derive(Debug, Clone, Default)]
pub struct PatternGraph {
    graph: UnGraph<QueryExpr, QueryExpr>,
    component_of: Vec<usize>,
    anchors: Vec<NodeIndex>,
    groups: Vec<Vec<NodeIndex>>,
}

impl PatternGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an atom to the given component, registering it as the component's
    /// anchor if it is the first.
    pub fn add_atom(&mut self, expr: QueryExpr, component: usize) -> NodeIndex {
        let idx = self.graph.add_node(expr);
        self.component_of.push(component);
        if self.anchors.len() == component {
            self.anchors.push(idx);
        }
        idx
    }

    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: QueryExpr) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    pub fn atom(&self, idx: NodeIndex) -> &QueryExpr {
        &self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &QueryExpr {
        &self.graph[idx]
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// The first atom of the whole pattern, used to anchor recursive
    /// sub-pattern expansion.
    pub fn anchor(&self) -> Option<NodeIndex> {
        self.anchors.first().copied()
    }

    pub fn component_of(&self, idx: NodeIndex) -> usize {
        self.component_of[idx.index()]
    }

    pub fn component_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn component_anchors(&self) -> &[NodeIndex] {
        &self.anchors
    }

    /// Top-level connectivity groups, each an ordered list of component
    /// anchors. Empty when the pattern has no outer grouping parentheses.
    pub fn groups(&self) -> &[Vec<NodeIndex>] {
        &self.groups
    }

    pub(crate) fn set_groups(&mut self, groups: Vec<Vec<NodeIndex>>) {
        self.groups = groups;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryExpr;

    #[test]
    fn anchors_track_first_atom_per_component() {
        let mut g = PatternGraph::new();
        let a = g.add_atom(QueryExpr::Any, 0);
        let b = g.add_atom(QueryExpr::Any, 0);
        let c = g.add_atom(QueryExpr::Any, 1);
        g.add_bond(a, b, QueryExpr::Any);

        assert_eq!(g.component_count(), 2);
        assert_eq!(g.component_anchors(), &[a, c]);
        assert_eq!(g.component_of(b), 0);
        assert_eq!(g.component_of(c), 1);
        assert_eq!(g.anchor(), Some(a));
    }
}
